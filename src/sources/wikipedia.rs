//! Wikipedia player articles.

use super::html;
use super::http::{get_page, not_found_on_404};
use super::StatSource;
use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::models::{Format, Payload, SourceId};
use async_trait::async_trait;
use reqwest::Client;

pub struct Wikipedia {
    client: Client,
    base_url: String,
}

impl Wikipedia {
    pub fn new(client: Client, settings: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: settings.wikipedia_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Article title for a player name ("Virat Kohli" -> "Virat_Kohli").
pub fn article_title(player: &str) -> String {
    player.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Parse the infobox career table of an article.
///
/// An article that never mentions cricket is some other person.
pub fn parse_article(page: &str, player: &str, format: Format) -> Result<Payload, SourceError> {
    if !page.to_lowercase().contains("cricket") {
        return Err(SourceError::NotFound(player.to_string()));
    }

    let infobox: Vec<_> = html::tables(page)
        .into_iter()
        .filter(|t| t.has_class("infobox"))
        .collect();
    if infobox.is_empty() {
        return Err(SourceError::Parse("Wikipedia infobox".to_string()));
    }
    Ok(html::parse_career_columns(infobox, format))
}

#[async_trait]
impl StatSource for Wikipedia {
    fn id(&self) -> SourceId {
        SourceId::Wikipedia
    }

    async fn fetch_live(&self, player: &str, format: Format) -> Result<Payload, SourceError> {
        let url = format!("{}/wiki/{}", self.base_url, article_title(player));
        let page = get_page(&self.client, &url, &[])
            .await
            .map_err(|e| not_found_on_404(e, player))?;
        parse_article(&page, player, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_PAGE: &str = include_str!("../../fixtures/wikipedia_player.html");
    const OTHER_PAGE: &str = include_str!("../../fixtures/wikipedia_not_cricket.html");

    #[test]
    fn test_article_title() {
        assert_eq!(article_title("Virat  Kohli"), "Virat_Kohli");
        assert_eq!(article_title("AB de Villiers"), "AB_de_Villiers");
    }

    #[test]
    fn test_parse_article_test_format() {
        let payload = parse_article(PLAYER_PAGE, "Virat Kohli", Format::Test).unwrap();
        assert_eq!(payload.get("matches").map(String::as_str), Some("113"));
        assert_eq!(payload.get("runs").map(String::as_str), Some("8,848"));
        assert_eq!(payload.get("average").map(String::as_str), Some("49.15"));
        assert_eq!(payload.get("centuries").map(String::as_str), Some("29"));
        assert_eq!(payload.get("fifties").map(String::as_str), Some("30"));
        assert_eq!(payload.get("highest").map(String::as_str), Some("254*"));
        assert_eq!(payload.get("balls_bowled").map(String::as_str), Some("175"));
        assert_eq!(payload.get("catches").map(String::as_str), Some("121"));
        assert!(!payload.contains_key("bowling_average"));
        assert!(!payload.contains_key("stumpings"));
    }

    #[test]
    fn test_parse_article_all_formats() {
        let payload = parse_article(PLAYER_PAGE, "Virat Kohli", Format::All).unwrap();
        assert_eq!(payload.get("T20I matches").map(String::as_str), Some("125"));
        assert_eq!(payload.get("ODI bowling_average").map(String::as_str), Some("136.00"));
        assert_eq!(payload.get("ODI best_innings").map(String::as_str), Some("1/15"));
        assert_eq!(payload.get("ODI fifties").map(String::as_str), Some("72"));
        assert!(!payload.values().any(|v| v == "11,120"));
    }

    #[test]
    fn test_article_without_infobox() {
        let page = "<html><body><p>A cricket ground in Kent.</p></body></html>";
        let err = parse_article(page, "Canterbury", Format::Test).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_non_cricket_article_is_not_found() {
        let err = parse_article(OTHER_PAGE, "John Smith", Format::Test).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
