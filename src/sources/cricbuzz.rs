//! Cricbuzz player profiles.

use super::html;
use super::http::get_page;
use super::StatSource;
use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::models::{Format, Payload, SourceId};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::debug;

static PROFILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/profiles/(\d+)/([a-z0-9-]+)").unwrap());

pub struct Cricbuzz {
    client: Client,
    base_url: String,
}

impl Cricbuzz {
    pub fn new(client: Client, settings: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: settings.cricbuzz_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Path of the first player profile linked from a search page.
pub fn first_profile_path(search_page: &str) -> Option<String> {
    PROFILE_RE
        .captures(search_page)
        .map(|caps| format!("/profiles/{}/{}", &caps[1], &caps[2]))
}

/// Parse the batting and bowling career summaries of a profile page.
///
/// Profiles have used both one-row-per-format and one-column-per-format
/// layouts; the first that yields statistics wins.
pub fn parse_profile(page: &str, format: Format) -> Payload {
    let by_rows = html::parse_career_rows(html::tables(page), format);
    if !by_rows.is_empty() {
        return by_rows;
    }
    html::parse_career_columns(html::tables(page), format)
}

#[async_trait]
impl StatSource for Cricbuzz {
    fn id(&self) -> SourceId {
        SourceId::Cricbuzz
    }

    async fn fetch_live(&self, player: &str, format: Format) -> Result<Payload, SourceError> {
        let search_url = format!("{}/search", self.base_url);
        let search_page = get_page(&self.client, &search_url, &[("q", player)]).await?;

        let path = first_profile_path(&search_page)
            .ok_or_else(|| SourceError::NotFound(player.to_string()))?;
        debug!("Cricbuzz profile for {}: {}", player, path);

        let profile_url = format!("{}{}", self.base_url, path);
        let profile = get_page(&self.client, &profile_url, &[]).await?;
        Ok(parse_profile(&profile, format))
    }
}
