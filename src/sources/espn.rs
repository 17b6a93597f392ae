//! ESPN Cricinfo: direct site search plus the stats engine page.

use super::html::{self, Table};
use super::http::get_page;
use super::{PlayerDirectory, StatSource};
use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::models::{Format, Payload, PlayerInfo, SourceId};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::debug;

static PROFILE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/cricketers/([a-z0-9-]+?)-(\d+)\b").unwrap());

static PROFILE_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:h1|p)\b[^>]*class="ciPlayer(name|role|team)"[^>]*>(.*?)</(?:h1|p)>"#)
        .unwrap()
});

/// A player profile reference: URL slug and numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLink {
    pub slug: String,
    pub id: String,
}

impl ProfileLink {
    /// Display name recovered from the slug ("virat-kohli" -> "Virat Kohli").
    pub fn display_name(&self) -> String {
        self.slug
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Distinct profile links in page order, using `re` with slug and id groups.
pub fn profile_links(page: &str, re: &Regex) -> Vec<ProfileLink> {
    let mut links: Vec<ProfileLink> = Vec::new();
    for caps in re.captures_iter(page) {
        let link = ProfileLink {
            slug: caps[1].to_lowercase(),
            id: caps[2].to_string(),
        };
        if !links.iter().any(|l| l.id == link.id) {
            links.push(link);
        }
    }
    links
}

/// Parse the career summary tables of a stats engine player page.
pub fn parse_stats_page(page: &str, format: Format) -> Payload {
    let tables = html::tables(page)
        .into_iter()
        .filter(|t: &Table| t.has_class("engineTable"));
    html::parse_career_rows(tables, format)
}

/// Read name, role and team from a player profile page.
///
/// The first occurrence of each field wins; blank fields stay `None`.
pub fn parse_basic_info(page: &str) -> PlayerInfo {
    let mut info = PlayerInfo::default();
    for caps in PROFILE_FIELD_RE.captures_iter(page) {
        let text = html::text_of(&caps[2]);
        if text.is_empty() {
            continue;
        }
        let slot = match caps[1].to_lowercase().as_str() {
            "name" => &mut info.name,
            "role" => &mut info.role,
            _ => &mut info.team,
        };
        slot.get_or_insert(text);
    }
    info
}

/// Fetch and parse the stats engine page for a player id.
pub async fn fetch_stats(
    client: &Client,
    stats_url: &str,
    player_id: &str,
    format: Format,
) -> Result<Payload, SourceError> {
    let url = format!(
        "{}/ci/engine/player/{}.html",
        stats_url.trim_end_matches('/'),
        player_id
    );
    let page = get_page(client, &url, &[]).await?;
    if !html::tables(&page).iter().any(|t| t.has_class("engineTable")) {
        return Err(SourceError::Parse("ESPN stats page".to_string()));
    }
    Ok(parse_stats_page(&page, format))
}

/// ESPN Cricinfo searched directly.
pub struct EspnDirect {
    client: Client,
    base_url: String,
    stats_url: String,
}

impl EspnDirect {
    pub fn new(client: Client, settings: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: settings.espn_base_url.trim_end_matches('/').to_string(),
            stats_url: settings.espn_stats_url.clone(),
        }
    }

    async fn search_page(&self, query: &str) -> Result<Vec<ProfileLink>, SourceError> {
        let url = format!("{}/search", self.base_url);
        let page = get_page(&self.client, &url, &[("q", query)]).await?;
        Ok(profile_links(&page, &PROFILE_LINK_RE))
    }
}

#[async_trait]
impl StatSource for EspnDirect {
    fn id(&self) -> SourceId {
        SourceId::EspnDirect
    }

    async fn fetch_live(&self, player: &str, format: Format) -> Result<Payload, SourceError> {
        let link = self
            .search_page(player)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(player.to_string()))?;
        debug!("ESPN profile for {}: {}-{}", player, link.slug, link.id);

        fetch_stats(&self.client, &self.stats_url, &link.id, format).await
    }
}

#[async_trait]
impl PlayerDirectory for EspnDirect {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let names = self
            .search_page(query)
            .await?
            .iter()
            .map(ProfileLink::display_name)
            .take(limit)
            .collect();
        Ok(names)
    }

    async fn basic_info(&self, player: &str) -> Result<PlayerInfo, SourceError> {
        let link = self
            .search_page(player)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(player.to_string()))?;

        let url = format!("{}/cricketers/{}-{}", self.base_url, link.slug, link.id);
        let page = get_page(&self.client, &url, &[]).await?;
        let info = parse_basic_info(&page);
        if info.is_empty() {
            return Err(SourceError::Parse("ESPN profile page".to_string()));
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = include_str!("../../fixtures/espn_search.html");
    const STATS_PAGE: &str = include_str!("../../fixtures/espn_player_stats.html");
    const PROFILE_PAGE: &str = include_str!("../../fixtures/espn_player_profile.html");

    #[test]
    fn test_profile_links_are_distinct_and_ordered() {
        let links = profile_links(SEARCH_PAGE, &PROFILE_LINK_RE);
        assert_eq!(links.len(), 3);
        assert_eq!(
            links[0],
            ProfileLink {
                slug: "virat-kohli".to_string(),
                id: "253802".to_string()
            }
        );
        assert_eq!(links[1].display_name(), "Virat Singh");
        assert_eq!(links[2].display_name(), "Sidhant Kohli");
    }

    #[test]
    fn test_parse_stats_page_test_format() {
        let payload = parse_stats_page(STATS_PAGE, Format::Test);
        assert_eq!(payload.get("matches").map(String::as_str), Some("113"));
        assert_eq!(payload.get("runs").map(String::as_str), Some("8848"));
        assert_eq!(payload.get("highest").map(String::as_str), Some("254*"));
        assert_eq!(payload.get("centuries").map(String::as_str), Some("29"));
        assert_eq!(payload.get("catches").map(String::as_str), Some("121"));
        assert_eq!(payload.get("balls_bowled").map(String::as_str), Some("175"));
        assert_eq!(payload.get("bowling_runs").map(String::as_str), Some("84"));
        assert_eq!(payload.get("economy").map(String::as_str), Some("2.88"));
        assert!(!payload.contains_key("best_innings"));
        assert!(!payload.contains_key("ODI runs"));
    }

    #[test]
    fn test_parse_stats_page_all_formats() {
        let payload = parse_stats_page(STATS_PAGE, Format::All);
        assert_eq!(payload.get("Test runs").map(String::as_str), Some("8848"));
        assert_eq!(payload.get("ODI runs").map(String::as_str), Some("13848"));
        assert_eq!(payload.get("T20I highest").map(String::as_str), Some("122*"));
        assert_eq!(payload.get("ODI wickets").map(String::as_str), Some("5"));
        assert_eq!(payload.get("ODI best_innings").map(String::as_str), Some("1/13"));
        assert!(!payload.values().any(|v| v == "11120"));
    }

    #[test]
    fn test_parse_page_without_tables() {
        assert!(parse_stats_page("<html><body>blocked</body></html>", Format::Odi).is_empty());
    }

    #[test]
    fn test_parse_basic_info() {
        let info = parse_basic_info(PROFILE_PAGE);
        assert_eq!(info.name.as_deref(), Some("Virat Kohli"));
        assert_eq!(info.role.as_deref(), Some("Top-order Batter"));
        assert_eq!(info.team.as_deref(), Some("India"));
    }

    #[test]
    fn test_parse_basic_info_missing_fields() {
        let page = r#"<h1 class="ciPlayername">Joe Root</h1><p class="ciPlayerrole"> </p>"#;
        let info = parse_basic_info(page);
        assert_eq!(info.name.as_deref(), Some("Joe Root"));
        assert_eq!(info.role, None);
        assert_eq!(info.team, None);
        assert!(parse_basic_info(STATS_PAGE).is_empty());
    }
}
