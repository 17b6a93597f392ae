//! Data models for cricket statistics lookups.
//!
//! This module contains the core data structures shared by the source
//! agents, the coordinator, the analyzer and the presentation layer.

use crate::error::CricketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Statistics from one source: stat name to value.
pub type Payload = BTreeMap<String, String>;

/// Cricket format of a query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Test matches
    Test,
    /// One Day Internationals
    Odi,
    /// Twenty20 Internationals
    #[serde(alias = "t20i")]
    #[value(alias = "t20i")]
    T20,
    /// All international formats
    #[default]
    All,
}

impl Format {
    /// The concrete formats covered by this one.
    pub fn concrete(self) -> &'static [Format] {
        match self {
            Format::Test => &[Format::Test],
            Format::Odi => &[Format::Odi],
            Format::T20 => &[Format::T20],
            Format::All => &[Format::Test, Format::Odi, Format::T20],
        }
    }

    /// Label used in stat tables and qualified stat names.
    pub fn label(self) -> &'static str {
        match self {
            Format::Test => "Test",
            Format::Odi => "ODI",
            Format::T20 => "T20I",
            Format::All => "All",
        }
    }

    /// Recognize a row or column label such as "Tests", "ODIs" or "T20Is".
    pub fn from_row_label(label: &str) -> Option<Format> {
        match label.trim().to_lowercase().as_str() {
            "test" | "tests" => Some(Format::Test),
            "odi" | "odis" => Some(Format::Odi),
            "t20i" | "t20is" | "t20" | "t20s" => Some(Format::T20),
            _ => None,
        }
    }

    /// Name a stat for a query in `query_format`.
    ///
    /// Single-format queries keep plain names; `All` prefixes the
    /// concrete format label ("ODI runs").
    pub fn qualify(self, query_format: Format, stat: &str) -> String {
        if query_format == Format::All {
            format!("{} {}", self.label(), stat)
        } else {
            stat.to_string()
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Format {
    type Err = CricketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" | "tests" => Ok(Format::Test),
            "odi" | "odis" => Ok(Format::Odi),
            "t20" | "t20i" | "t20is" => Ok(Format::T20),
            "all" | "" => Ok(Format::All),
            other => Err(CricketError::InvalidFormat(other.to_string())),
        }
    }
}

/// Aspect of a player's record an analysis concentrates on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    #[default]
    Overall,
    Batting,
    Bowling,
    Fielding,
}

const BOWLING_STATS: &[&str] = &[
    "wickets",
    "economy",
    "balls_bowled",
    "best_innings",
    "best_match",
    "four_wickets",
    "five_wickets",
    "ten_wickets",
    "maidens",
];

impl Focus {
    /// Human description of what the focus covers.
    pub fn description(self) -> &'static str {
        match self {
            Focus::Overall => "overall performance",
            Focus::Batting => {
                "batting performance, runs, averages, strike rates, centuries, and batting records"
            }
            Focus::Bowling => {
                "bowling performance, wickets, bowling averages, economy rates, strike rates, and bowling records"
            }
            Focus::Fielding => {
                "fielding performance, catches, stumpings, dismissals, and fielding records"
            }
        }
    }

    /// Whether a stat name belongs to this focus.
    ///
    /// Qualified names ("Test runs") are matched on their last word.
    /// Matches played is relevant to every focus.
    pub fn matches_stat(self, stat: &str) -> bool {
        let name = stat.rsplit(' ').next().unwrap_or(stat).to_lowercase();
        if name == "matches" {
            return true;
        }

        let bowling = BOWLING_STATS.contains(&name.as_str())
            || name.starts_with("bowling_")
            || name.contains("wicket");
        let fielding = name == "catches" || name == "stumpings";

        match self {
            Focus::Overall => true,
            Focus::Batting => !bowling && !fielding,
            Focus::Bowling => bowling,
            Focus::Fielding => fielding,
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Focus::Overall => write!(f, "Overall"),
            Focus::Batting => write!(f, "Batting"),
            Focus::Bowling => write!(f, "Bowling"),
            Focus::Fielding => write!(f, "Fielding"),
        }
    }
}

/// One lookup: a player in a format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub player: String,
    pub format: Format,
}

impl Query {
    /// Create a query, normalizing whitespace in the player name.
    pub fn new(player: &str, format: Format) -> Result<Self, CricketError> {
        let player = player.split_whitespace().collect::<Vec<_>>().join(" ");
        if player.is_empty() {
            return Err(CricketError::Configuration(
                "player name must not be empty".to_string(),
            ));
        }
        Ok(Self { player, format })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.player, self.format)
    }
}

/// Identity of a data source. Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    EspnDirect,
    EspnSearch,
    Cricbuzz,
    Wikipedia,
}

impl SourceId {
    /// Every source, in report order.
    #[cfg(test)]
    pub const ALL: [SourceId; 4] = [
        SourceId::EspnDirect,
        SourceId::EspnSearch,
        SourceId::Cricbuzz,
        SourceId::Wikipedia,
    ];

    /// Name shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            SourceId::EspnDirect => "ESPN Cricinfo Direct",
            SourceId::EspnSearch => "ESPN via Search",
            SourceId::Cricbuzz => "Cricbuzz",
            SourceId::Wikipedia => "Wikipedia",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Outcome of one source fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Real data from the source.
    Live,
    /// Substituted from the fallback table.
    Fallback,
    /// No data at all.
    Failed,
}

impl SourceStatus {
    /// Live and Fallback both carry usable data.
    pub fn is_success(self) -> bool {
        !matches!(self, SourceStatus::Failed)
    }

    /// Returns an emoji representation of the status.
    pub fn emoji(self) -> &'static str {
        match self {
            SourceStatus::Live => "🟢",
            SourceStatus::Fallback => "⚠️",
            SourceStatus::Failed => "🔴",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Live => write!(f, "Live Data"),
            SourceStatus::Fallback => write!(f, "Fallback Data"),
            SourceStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Result of one source agent invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    source: SourceId,
    status: SourceStatus,
    payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl SourceResult {
    /// Live data. Callers must not pass an empty payload.
    pub fn live(source: SourceId, payload: Payload) -> Self {
        debug_assert!(!payload.is_empty(), "live result without statistics");
        Self {
            source,
            status: SourceStatus::Live,
            payload,
            note: None,
        }
    }

    /// Fallback-table data substituted after a live failure.
    pub fn fallback(source: SourceId, payload: Payload, reason: String) -> Self {
        Self {
            source,
            status: SourceStatus::Fallback,
            payload,
            note: Some(reason),
        }
    }

    /// No data.
    pub fn failed(source: SourceId, reason: String) -> Self {
        Self {
            source,
            status: SourceStatus::Failed,
            payload: Payload::new(),
            note: Some(reason),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn status(&self) -> SourceStatus {
        self.status
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Why the live fetch did not produce data, if it didn't.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// Natural-language analysis of one or two aggregate reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub text: String,
    pub sources_used: BTreeSet<SourceId>,
    /// True when no usable data existed and the model was not consulted.
    pub insufficient_data: bool,
}

impl AnalysisResult {
    /// A model-produced analysis.
    pub fn completed(text: String, sources_used: BTreeSet<SourceId>) -> Self {
        Self {
            text,
            sources_used,
            insufficient_data: false,
        }
    }

    /// The explicit no-data result.
    pub fn insufficient(text: String) -> Self {
        Self {
            text,
            sources_used: BTreeSet::new(),
            insufficient_data: true,
        }
    }
}

/// Metadata attached to rendered reports.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Date and time the request completed.
    pub generated_at: DateTime<Utc>,
    /// Name of the LLM model used, if one was consulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Basic profile details read from a player's profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    pub name: Option<String>,
    pub role: Option<String>,
    pub team: Option<String>,
}

impl PlayerInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.team.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("Test".parse::<Format>().unwrap(), Format::Test);
        assert_eq!("odi".parse::<Format>().unwrap(), Format::Odi);
        assert_eq!("T20I".parse::<Format>().unwrap(), Format::T20);
        assert_eq!("all".parse::<Format>().unwrap(), Format::All);
        assert!(matches!(
            "hundred".parse::<Format>(),
            Err(CricketError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_row_labels() {
        assert_eq!(Format::from_row_label("Tests"), Some(Format::Test));
        assert_eq!(Format::from_row_label(" ODIs "), Some(Format::Odi));
        assert_eq!(Format::from_row_label("T20Is"), Some(Format::T20));
        assert_eq!(Format::from_row_label("IPL"), None);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(Format::Odi.qualify(Format::Odi, "runs"), "runs");
        assert_eq!(Format::Odi.qualify(Format::All, "runs"), "ODI runs");
        assert_eq!(Format::T20.qualify(Format::All, "average"), "T20I average");
    }

    #[test]
    fn test_focus_matches_stat() {
        assert!(Focus::Batting.matches_stat("runs"));
        assert!(Focus::Batting.matches_stat("Test average"));
        assert!(!Focus::Batting.matches_stat("bowling_average"));
        assert!(Focus::Bowling.matches_stat("ODI wickets"));
        assert!(Focus::Bowling.matches_stat("economy"));
        assert!(!Focus::Bowling.matches_stat("centuries"));
        assert!(Focus::Fielding.matches_stat("catches"));
        assert!(!Focus::Fielding.matches_stat("runs"));
        assert!(Focus::Fielding.matches_stat("matches"));
        assert!(Focus::Overall.matches_stat("anything"));
    }

    #[test]
    fn test_query_normalizes_name() {
        let query = Query::new("  Virat   Kohli ", Format::Test).unwrap();
        assert_eq!(query.player, "Virat Kohli");
        assert!(Query::new("   ", Format::Test).is_err());
    }

    #[test]
    fn test_source_order() {
        let mut ids = vec![SourceId::Wikipedia, SourceId::EspnDirect, SourceId::Cricbuzz];
        ids.sort();
        assert_eq!(
            ids,
            vec![SourceId::EspnDirect, SourceId::Cricbuzz, SourceId::Wikipedia]
        );
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = SourceResult::failed(SourceId::Cricbuzz, "timeout".to_string());
        assert_eq!(result.status(), SourceStatus::Failed);
        assert!(result.payload().is_empty());
        assert!(!result.status().is_success());
        assert_eq!(result.note(), Some("timeout"));
    }

    #[test]
    fn test_status_emoji() {
        assert_eq!(SourceStatus::Live.emoji(), "🟢");
        assert_eq!(SourceStatus::Failed.emoji(), "🔴");
    }
}
