//! ESPN Cricinfo reached through a search engine.
//!
//! Used when the site's own search is blocked: the player's profile id
//! is taken from a `site:espncricinfo.com` results page, then the same
//! stats engine page as the direct source is parsed.

use super::espn::{fetch_stats, profile_links};
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

// Result links may be percent-encoded redirect targets.
static RESULT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)espncricinfo\.com(?:/|%2F)(?:[a-z]{2}(?:/|%2F))?cricketers(?:/|%2F)([a-z0-9-]+?)-(\d+)\b")
        .unwrap()
});

pub struct EspnSearch {
    client: Client,
    search_url: String,
    stats_url: String,
}

impl EspnSearch {
    pub fn new(client: Client, settings: &SourcesConfig) -> Self {
        Self {
            client,
            search_url: settings.search_url.clone(),
            stats_url: settings.espn_stats_url.clone(),
        }
    }
}

/// First ESPN profile id in a search results page.
pub fn first_profile_id(results_page: &str) -> Option<String> {
    profile_links(results_page, &RESULT_LINK_RE)
        .into_iter()
        .next()
        .map(|link| link.id)
}

#[async_trait]
impl StatSource for EspnSearch {
    fn id(&self) -> SourceId {
        SourceId::EspnSearch
    }

    async fn fetch_live(&self, player: &str, format: Format) -> Result<Payload, SourceError> {
        let query = format!("site:espncricinfo.com {} cricketer", player);
        let page = get_page(&self.client, &self.search_url, &[("q", query.as_str())]).await?;

        let id = first_profile_id(&page).ok_or_else(|| SourceError::NotFound(player.to_string()))?;
        debug!("search engine resolved {} to ESPN id {}", player, id);

        fetch_stats(&self.client, &self.stats_url, &id, format).await
    }
}
