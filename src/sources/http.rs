//! Shared HTTP client for live fetches.

use crate::config::SourcesConfig;
use crate::error::SourceError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Build the client every source shares: browser-like headers, the
/// configured user agent and a per-request timeout.
pub fn build_client(settings: &SourcesConfig) -> Result<Client, SourceError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

    let client = Client::builder()
        .user_agent(settings.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()?;

    Ok(client)
}

/// GET a page and return its body.
///
/// Non-success statuses become `SourceError::Status`; callers decide
/// whether a 404 means "not found" for their site.
pub async fn get_page(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, SourceError> {
    debug!("GET {} {:?}", url, query);

    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }

    Ok(response.text().await?)
}

/// Map a 404 to `NotFound` for `player`, leaving other errors alone.
pub fn not_found_on_404(err: SourceError, player: &str) -> SourceError {
    match err {
        SourceError::Status(StatusCode::NOT_FOUND) => SourceError::NotFound(player.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client(&SourcesConfig::default()).is_ok());
    }

    #[test]
    fn test_not_found_on_404() {
        let err = not_found_on_404(SourceError::Status(StatusCode::NOT_FOUND), "Nobody");
        assert!(matches!(err, SourceError::NotFound(ref name) if name == "Nobody"));

        let err = not_found_on_404(SourceError::Status(StatusCode::BAD_GATEWAY), "Nobody");
        assert!(matches!(err, SourceError::Status(StatusCode::BAD_GATEWAY)));
    }
}
