//! Free-text requests.
//!
//! Turns questions such as "compare Virat Kohli vs Joe Root in ODI bowling"
//! into an analysis or comparison request. Questions about cricket in
//! general ("who has the highest Test average?") name no player and become
//! insight requests.

use crate::error::CricketError;
use crate::models::{Focus, Format, Query};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static VERSUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:vs\.?|v\.?|versus)\s+").unwrap());

static COMPARE_AND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:and|with|against|to)\s+").unwrap());

const FILLER_WORDS: &[&str] = &[
    "a", "about", "analyse", "analysis", "analyze", "and", "career", "compare", "comparison",
    "cricket", "did", "do", "does", "format", "formats", "for", "give", "good", "how", "in",
    "is", "me", "of", "on", "overall", "performance", "player", "players", "please", "record",
    "records", "show", "stat", "statistics", "stats", "tell", "the", "what", "who", "better",
    "all", "international", "internationals", "cricketer", "between", "vs", "versus",
];

// Words that never occur in a player name but do in general questions.
const INSIGHT_WORDS: &[&str] = &[
    "has", "have", "had", "which", "when", "where", "why", "are", "was", "were", "will", "would",
    "should", "could", "can", "highest", "lowest", "most", "least", "best", "worst", "greatest",
    "top", "fastest", "average", "averages", "runs", "wickets", "centuries", "hundreds",
    "all-rounder", "all-rounders", "allrounder", "allrounders", "batsmen", "batters", "bowlers",
    "spinners", "captain", "captains", "ever", "history", "team", "teams", "world", "cup",
    "ranking", "rankings", "trends", "prediction", "predictions", "era", "current", "today",
];

/// A parsed free-text request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Request {
    Analyze { query: Query, focus: Focus },
    Compare { first: Query, second: Query, focus: Focus },
    /// A general cricket question, answered without collecting statistics.
    Insight { question: String },
}

/// Parse free text. Unspecified formats use `default_format`.
pub fn parse(text: &str, default_format: Format) -> Result<Request, CricketError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CricketError::Configuration("query must not be empty".to_string()));
    }

    let words = words(text);
    let format = words
        .iter()
        .find_map(|w| format_keyword(w))
        .unwrap_or(default_format);
    let focus = words
        .iter()
        .find_map(|w| focus_keyword(w))
        .unwrap_or_default();

    let starts_with_compare = words
        .first()
        .is_some_and(|w| w == "compare" || w == "comparison");
    let parts: Vec<&str> = if VERSUS_RE.is_match(text) {
        VERSUS_RE.splitn(text, 2).collect()
    } else if starts_with_compare {
        COMPARE_AND_RE.splitn(text, 2).collect()
    } else {
        vec![text]
    };

    if parts.len() == 1 && is_general_question(text) {
        return Ok(Request::Insight {
            question: text.to_string(),
        });
    }

    let names: Vec<String> = parts.iter().map(|part| player_name(part)).collect();
    match names.as_slice() {
        [player] => Ok(Request::Analyze {
            query: Query::new(player, format).map_err(|_| no_player(text))?,
            focus,
        }),
        [first, second] => Ok(Request::Compare {
            first: Query::new(first, format).map_err(|_| no_player(text))?,
            second: Query::new(second, format).map_err(|_| no_player(text))?,
            focus,
        }),
        _ => Err(no_player(text)),
    }
}

/// Whether the text uses words that belong to a question rather than a name.
fn is_general_question(text: &str) -> bool {
    words(text)
        .iter()
        .any(|word| INSIGHT_WORDS.contains(&word.as_str()))
}

fn no_player(text: &str) -> CricketError {
    CricketError::Configuration(format!("no player name found in '{}'", text))
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(normalize_word).collect()
}

fn normalize_word(word: &str) -> String {
    let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-');
    let word = word
        .strip_suffix("'s")
        .or_else(|| word.strip_suffix('\''))
        .unwrap_or(word);
    word.to_lowercase()
}

fn format_keyword(word: &str) -> Option<Format> {
    match word {
        "" | "all" => None,
        other => other.parse().ok(),
    }
}

fn focus_keyword(word: &str) -> Option<Focus> {
    match word {
        "batting" | "batsman" | "batter" => Some(Focus::Batting),
        "bowling" | "bowler" => Some(Focus::Bowling),
        "fielding" | "fielder" | "catches" => Some(Focus::Fielding),
        _ => None,
    }
}

/// The words of a fragment that are neither keywords nor filler, in their
/// original spelling.
fn player_name(fragment: &str) -> String {
    fragment
        .split_whitespace()
        .filter(|raw| {
            let word = normalize_word(raw);
            !word.is_empty()
                && !FILLER_WORDS.contains(&word.as_str())
                && format_keyword(&word).is_none()
                && focus_keyword(&word).is_none()
        })
        .map(|raw| {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-');
            let word = word
                .strip_suffix("'s")
                .or_else(|| word.strip_suffix('\''))
                .unwrap_or(word);
            capitalize(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalize all-lowercase words; keep deliberate casing such as "AB".
fn capitalize(word: &str) -> String {
    if word.chars().any(|c| c.is_uppercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_player() {
        let request = parse("Virat Kohli test batting stats", Format::All).unwrap();
        assert_eq!(
            request,
            Request::Analyze {
                query: Query::new("Virat Kohli", Format::Test).unwrap(),
                focus: Focus::Batting,
            }
        );
    }

    #[test]
    fn test_parse_question_with_default_format() {
        let request = parse("How good is sachin tendulkar's record?", Format::Odi).unwrap();
        assert_eq!(
            request,
            Request::Analyze {
                query: Query::new("Sachin Tendulkar", Format::Odi).unwrap(),
                focus: Focus::Overall,
            }
        );
    }

    #[test]
    fn test_parse_versus() {
        let request =
            parse("compare Virat Kohli vs Joe Root in ODI bowling", Format::All).unwrap();
        assert_eq!(
            request,
            Request::Compare {
                first: Query::new("Virat Kohli", Format::Odi).unwrap(),
                second: Query::new("Joe Root", Format::Odi).unwrap(),
                focus: Focus::Bowling,
            }
        );
    }

    #[test]
    fn test_parse_compare_and() {
        let request = parse("Compare Ricky Ponting and AB de Villiers in T20Is", Format::All)
            .unwrap();
        match request {
            Request::Compare { first, second, focus } => {
                assert_eq!(first.player, "Ricky Ponting");
                assert_eq!(second.player, "AB De Villiers");
                assert_eq!(first.format, Format::T20);
                assert_eq!(focus, Focus::Overall);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_general_questions_are_insights() {
        assert_eq!(
            parse("Who has the highest Test average?", Format::All).unwrap(),
            Request::Insight {
                question: "Who has the highest Test average?".to_string()
            }
        );
        assert!(matches!(
            parse("Tell me about the best all-rounders in cricket", Format::All).unwrap(),
            Request::Insight { .. }
        ));
        assert!(matches!(
            parse("Which team won the most World Cups", Format::All).unwrap(),
            Request::Insight { .. }
        ));
    }

    #[test]
    fn test_comparisons_are_never_insights() {
        assert!(matches!(
            parse("who is better, Kohli vs Root?", Format::All).unwrap(),
            Request::Compare { .. }
        ));
    }

    #[test]
    fn test_no_player_name() {
        assert!(parse("show me test batting stats", Format::All).is_err());
        assert!(parse("   ", Format::All).is_err());
        assert!(parse("Kohli vs", Format::All).is_ok());
        assert!(parse("compare Kohli vs test", Format::All).is_err());
    }
}
