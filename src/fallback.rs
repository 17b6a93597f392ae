//! Fallback data table.
//!
//! Backup statistics keyed by player and format, substituted when a
//! live source fails. The table is built once (built-in entries plus an
//! optional TOML file) and then shared read-only behind an `Arc`.

use crate::models::{Format, Payload};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Immutable lookup table of backup statistics.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    players: HashMap<String, PlayerEntry>,
}

#[derive(Debug, Clone)]
struct PlayerEntry {
    name: String,
    formats: BTreeMap<Format, Payload>,
}

/// On-disk layout of a fallback file.
///
/// ```toml
/// [[players]]
/// name = "Virat Kohli"
/// [players.test]
/// matches = "113"
/// runs = "8848"
/// ```
#[derive(Debug, Deserialize)]
struct FallbackFile {
    #[serde(default)]
    players: Vec<FallbackPlayer>,
}

#[derive(Debug, Deserialize)]
struct FallbackPlayer {
    name: String,
    #[serde(default)]
    test: Payload,
    #[serde(default)]
    odi: Payload,
    #[serde(default, alias = "t20i")]
    t20: Payload,
}

/// Lookup key: case-insensitive, whitespace-collapsed name.
fn normalize(player: &str) -> String {
    player
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl FallbackTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, format, rows) in BUILTIN {
            let stats = rows
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            table.insert(name, *format, stats);
        }
        table
    }

    /// Load entries from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fallback file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse fallback file: {}", path.display()))
    }

    /// Parse entries from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FallbackFile = toml::from_str(content)?;
        let mut table = Self::empty();
        for player in file.players {
            table.insert(&player.name, Format::Test, player.test);
            table.insert(&player.name, Format::Odi, player.odi);
            table.insert(&player.name, Format::T20, player.t20);
        }
        Ok(table)
    }

    /// Add or replace the stats for one player and concrete format.
    ///
    /// Empty stat sets and `Format::All` are ignored: `All` entries are
    /// derived from the concrete formats at lookup time.
    pub fn insert(&mut self, player: &str, format: Format, stats: Payload) {
        if stats.is_empty() || format == Format::All {
            return;
        }
        let key = normalize(player);
        if key.is_empty() {
            return;
        }
        self.players
            .entry(key)
            .or_insert_with(|| PlayerEntry {
                name: player.split_whitespace().collect::<Vec<_>>().join(" "),
                formats: BTreeMap::new(),
            })
            .formats
            .insert(format, stats);
    }

    /// Merge another table into this one; entries from `other` win.
    pub fn merge(&mut self, other: FallbackTable) {
        for (_, entry) in other.players {
            for (format, stats) in entry.formats {
                self.insert(&entry.name, format, stats);
            }
        }
    }

    /// Backup stats for (player, format).
    ///
    /// For `Format::All` the concrete entries that exist are combined
    /// with format-qualified stat names.
    pub fn lookup(&self, player: &str, format: Format) -> Option<Payload> {
        let entry = self.players.get(&normalize(player))?;

        let mut payload = Payload::new();
        for concrete in format.concrete() {
            if let Some(stats) = entry.formats.get(concrete) {
                for (stat, value) in stats {
                    payload.insert(concrete.qualify(format, stat), value.clone());
                }
            }
        }

        if payload.is_empty() {
            None
        } else {
            Some(payload)
        }
    }

    /// Player names containing `query` (case-insensitive), sorted.
    pub fn search(&self, query: &str) -> Vec<String> {
        let needle = normalize(query);
        let mut names: Vec<String> = self
            .players
            .iter()
            .filter(|(key, _)| key.contains(&needle))
            .map(|(_, entry)| entry.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of players in the table.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

type BuiltinRows = &'static [(&'static str, &'static str)];

const BUILTIN: &[(&str, Format, BuiltinRows)] = &[
    (
        "Virat Kohli",
        Format::Test,
        &[
            ("matches", "113"),
            ("innings", "191"),
            ("runs", "8848"),
            ("highest", "254*"),
            ("average", "49.15"),
            ("strike_rate", "55.23"),
            ("centuries", "29"),
            ("fifties", "30"),
        ],
    ),
    (
        "Virat Kohli",
        Format::Odi,
        &[
            ("matches", "292"),
            ("innings", "280"),
            ("runs", "13848"),
            ("highest", "183"),
            ("average", "58.67"),
            ("strike_rate", "93.17"),
            ("centuries", "50"),
            ("fifties", "72"),
        ],
    ),
    (
        "Virat Kohli",
        Format::T20,
        &[
            ("matches", "115"),
            ("innings", "109"),
            ("runs", "4008"),
            ("highest", "122*"),
            ("average", "52.73"),
            ("strike_rate", "137.96"),
            ("centuries", "1"),
            ("fifties", "37"),
        ],
    ),
    (
        "Sachin Tendulkar",
        Format::Test,
        &[
            ("matches", "200"),
            ("innings", "329"),
            ("runs", "15921"),
            ("highest", "248*"),
            ("average", "53.78"),
            ("strike_rate", "54.08"),
            ("centuries", "51"),
            ("fifties", "68"),
            ("wickets", "46"),
        ],
    ),
    (
        "Sachin Tendulkar",
        Format::Odi,
        &[
            ("matches", "463"),
            ("innings", "452"),
            ("runs", "18426"),
            ("highest", "200*"),
            ("average", "44.83"),
            ("strike_rate", "86.23"),
            ("centuries", "49"),
            ("fifties", "96"),
            ("wickets", "154"),
        ],
    ),
    (
        "Sachin Tendulkar",
        Format::T20,
        &[
            ("matches", "1"),
            ("innings", "1"),
            ("runs", "10"),
            ("highest", "10"),
            ("average", "10.00"),
            ("strike_rate", "83.33"),
            ("centuries", "0"),
            ("fifties", "0"),
        ],
    ),
    (
        "Ricky Ponting",
        Format::Test,
        &[
            ("matches", "168"),
            ("innings", "287"),
            ("runs", "13378"),
            ("highest", "257"),
            ("average", "51.85"),
            ("strike_rate", "58.72"),
            ("centuries", "41"),
            ("fifties", "62"),
        ],
    ),
    (
        "Ricky Ponting",
        Format::Odi,
        &[
            ("matches", "375"),
            ("innings", "365"),
            ("runs", "13704"),
            ("highest", "164"),
            ("average", "42.03"),
            ("strike_rate", "80.39"),
            ("centuries", "30"),
            ("fifties", "82"),
        ],
    ),
    (
        "Ricky Ponting",
        Format::T20,
        &[
            ("matches", "17"),
            ("innings", "16"),
            ("runs", "401"),
            ("highest", "98*"),
            ("average", "28.64"),
            ("strike_rate", "132.34"),
            ("centuries", "0"),
            ("fifties", "2"),
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_lookup_single_format() {
        let table = FallbackTable::builtin();
        let stats = table.lookup("Virat Kohli", Format::Test).unwrap();
        assert_eq!(stats.get("runs").map(String::as_str), Some("8848"));
        assert_eq!(stats.get("highest").map(String::as_str), Some("254*"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = FallbackTable::builtin();
        assert_eq!(
            table.lookup("  virat   KOHLI", Format::Odi),
            table.lookup("Virat Kohli", Format::Odi)
        );
    }

    #[test]
    fn test_all_format_is_qualified() {
        let table = FallbackTable::builtin();
        let stats = table.lookup("Ricky Ponting", Format::All).unwrap();
        assert_eq!(stats.get("Test runs").map(String::as_str), Some("13378"));
        assert_eq!(stats.get("ODI runs").map(String::as_str), Some("13704"));
        assert_eq!(stats.get("T20I runs").map(String::as_str), Some("401"));
        assert!(!stats.contains_key("runs"));
    }

    #[test]
    fn test_unknown_player() {
        let table = FallbackTable::builtin();
        assert!(table.lookup("Unknown Player X", Format::Odi).is_none());
        assert!(table.lookup("Unknown Player X", Format::All).is_none());
    }

    #[test]
    fn test_missing_format_entry() {
        let mut table = FallbackTable::empty();
        let stats: Payload = [("runs".to_string(), "100".to_string())].into();
        table.insert("Test Only", Format::Test, stats);

        assert!(table.lookup("Test Only", Format::Odi).is_none());
        assert_eq!(
            table
                .lookup("Test Only", Format::All)
                .unwrap()
                .get("Test runs")
                .map(String::as_str),
            Some("100")
        );
    }

    #[test]
    fn test_empty_and_all_inserts_ignored() {
        let mut table = FallbackTable::empty();
        table.insert("Nobody", Format::Test, Payload::new());
        table.insert(
            "Nobody",
            Format::All,
            [("runs".to_string(), "1".to_string())].into(),
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_from_file_and_merge() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[players]]
name = "Joe Root"

[players.test]
matches = "150"
runs = "13000"

[players.t20i]
matches = "32"
"#
        )
        .unwrap();

        let loaded = FallbackTable::load(file.path()).unwrap();
        assert_eq!(loaded.len(), 1);

        let mut table = FallbackTable::builtin();
        table.merge(loaded);
        assert_eq!(table.len(), 4);
        assert_eq!(
            table
                .lookup("joe root", Format::T20)
                .unwrap()
                .get("matches")
                .map(String::as_str),
            Some("32")
        );
        assert!(table.lookup("Joe Root", Format::Odi).is_none());
    }

    #[test]
    fn test_search() {
        let table = FallbackTable::builtin();
        assert_eq!(table.search("kohli"), vec!["Virat Kohli".to_string()]);
        assert_eq!(table.search("i").len(), 3);
        assert!(table.search("zzz").is_empty());
    }
}
