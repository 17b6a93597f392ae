//! Regex-based HTML helpers shared by the scraping sources.
//!
//! The target pages are versionless external data, so these helpers only
//! look for table structure and links, never for exact class layouts.

use crate::models::{Format, Payload};
use regex::Regex;
use std::sync::LazyLock;

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t([hd])\b[^>]*>(.*?)</t[hd]>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap()
});
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

/// A `<table>` element: its attribute text and inner HTML.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    pub attrs: &'a str,
    pub body: &'a str,
}

impl<'a> Table<'a> {
    /// Whether the table's class attribute mentions `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attrs.contains(class)
    }

    /// Rows as lists of cell text.
    pub fn rows(&self) -> Vec<Row> {
        ROW_RE
            .captures_iter(self.body)
            .map(|row| {
                let cells = CELL_RE
                    .captures_iter(&row[1])
                    .map(|cell| Cell {
                        header: cell[1].eq_ignore_ascii_case("h"),
                        text: text_of(&cell[2]),
                    })
                    .collect();
                Row { cells }
            })
            .filter(|row: &Row| !row.cells.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn texts(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.text.as_str()).collect()
    }

    fn is_header(&self) -> bool {
        self.cells.iter().all(|c| c.header)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub header: bool,
    pub text: String,
}

/// All tables in a page in document order.
///
/// Each table's body runs to the first closing tag after it, so for nested
/// tables the inner one comes out intact and the outer one truncated.
pub fn tables(html: &str) -> Vec<Table<'_>> {
    let lower = html.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(offset) = lower[from..].find("<table") {
        from += offset + "<table".len();
        if !lower[from..].starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
            continue;
        }
        let Some(open_end) = lower[from..].find('>').map(|i| from + i) else {
            break;
        };
        let Some(close) = lower[open_end..].find("</table>").map(|i| open_end + i) else {
            break;
        };
        found.push(Table {
            attrs: &html[from..open_end],
            body: &html[open_end + 1..close],
        });
    }

    found
}

/// Visible text of an HTML fragment: tags removed, entities decoded,
/// whitespace collapsed.
pub fn text_of(fragment: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(fragment, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    decode_entities(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the handful of entities that show up in stat tables.
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        match value.and_then(char::from_u32) {
            Some('\u{a0}') => " ".to_string(),
            Some(c) => c.to_string(),
            None => String::new(),
        }
    });

    // last, so "&amp;nbsp;" stays literal
    numeric.replace("&amp;", "&")
}

/// Map a stat-table header or row label to a payload stat name.
///
/// Returns `None` for labels that carry no statistic (blank, "Span").
pub fn stat_name(label: &str) -> Option<String> {
    let name = match label.trim().to_lowercase().as_str() {
        "" | "span" | "format" | "competition" => return None,
        "mat" | "m" | "matches" => "matches",
        "inns" | "inn" | "innings" => "innings",
        "no" | "not out" | "not outs" => "not_outs",
        "runs" | "r" | "runs scored" => "runs",
        "hs" | "highest" | "top score" => "highest",
        "ave" | "avg" | "average" | "batting average" => "average",
        "bf" | "balls faced" => "balls_faced",
        "sr" | "s/r" | "strike rate" => "strike_rate",
        "100" | "100s" => "centuries",
        "200" | "200s" => "double_centuries",
        "50" | "50s" => "fifties",
        "0" | "ducks" => "ducks",
        "4s" | "fours" => "fours",
        "6s" | "sixes" => "sixes",
        "ct" | "catches" => "catches",
        "st" | "stumpings" => "stumpings",
        "wkts" | "w" | "wickets" => "wickets",
        "balls" | "b" | "balls bowled" => "balls_bowled",
        "bbi" | "best bowling" => "best_innings",
        "bbm" => "best_match",
        "econ" | "eco" | "economy" => "economy",
        "4w" => "four_wickets",
        "5w" | "5 wickets in innings" => "five_wickets",
        "10w" | "10" | "10 wickets in match" => "ten_wickets",
        "maid" | "mdns" | "maidens" => "maidens",
        "bowling average" => "bowling_average",
        other => {
            let slug = other
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>();
            let slug = slug.trim_matches('_').to_string();
            if slug.is_empty() {
                return None;
            }
            return Some(slug);
        }
    };
    Some(name.to_string())
}

/// Stats whose name is shared by batting and bowling tables.
const SHARED_STATS: &[&str] = &["innings", "runs", "average", "strike_rate"];

/// Whether a stat value is a placeholder for "no data".
pub fn is_blank_value(value: &str) -> bool {
    matches!(value.trim(), "" | "-" | "--" | "-/-" | "–" | "—" | "N/A")
}

/// A bowling-only table has wickets but no top score.
fn is_bowling_table(names: &[Option<String>]) -> bool {
    let has = |stat: &str| names.iter().flatten().any(|n| n == stat);
    has("wickets") && !has("highest")
}

/// Bowling tables prefix the stats they share with batting tables; a
/// batting table's bare "Balls" is balls faced.
fn disambiguate(name: String, label: &str, bowling: bool) -> String {
    let bare = label.trim().to_lowercase();
    if bowling && SHARED_STATS.contains(&name.as_str()) {
        format!("bowling_{}", name)
    } else if !bowling && name == "balls_bowled" && (bare == "balls" || bare == "b") {
        "balls_faced".to_string()
    } else {
        name
    }
}

fn table_stat_names(labels: &[&str]) -> Vec<Option<String>> {
    let names: Vec<Option<String>> = labels.iter().map(|l| stat_name(l)).collect();
    let bowling = is_bowling_table(&names);
    names
        .into_iter()
        .zip(labels)
        .map(|(name, label)| name.map(|n| disambiguate(n, label, bowling)))
        .collect()
}

/// Split a combined label/value pair such as "100s/50s" = "29/30".
fn split_pairs<'v>(label: &str, value: &'v str) -> Vec<(String, &'v str)> {
    let labels: Vec<&str> = label.split('/').collect();
    let values: Vec<&str> = value.split('/').collect();
    let combined = labels.len() == 2
        && values.len() == 2
        && labels.iter().all(|l| !l.trim().is_empty());
    if combined {
        labels
            .into_iter()
            .map(str::to_string)
            .zip(values.into_iter().map(str::trim))
            .collect()
    } else {
        vec![(label.to_string(), value)]
    }
}

fn put(
    payload: &mut Payload,
    row_format: Format,
    query_format: Format,
    name: &str,
    value: &str,
) {
    if is_blank_value(value) {
        return;
    }
    payload
        .entry(row_format.qualify(query_format, name))
        .or_insert_with(|| value.trim().to_string());
}

/// Parse career-summary tables laid out one row per format.
///
/// The header row names the stats; each following row starts with a
/// format label ("Tests", "ODI", "T20Is"). Rows for formats outside
/// `format` are skipped.
pub fn parse_career_rows<'a>(
    tables: impl IntoIterator<Item = Table<'a>>,
    format: Format,
) -> Payload {
    let mut payload = Payload::new();

    for table in tables {
        let rows = table.rows();
        let Some(header_index) = rows.iter().position(Row::is_header) else {
            continue;
        };
        let headers = table_stat_names(&rows[header_index].texts());

        for row in &rows[header_index + 1..] {
            let Some(label) = row.cells.first() else {
                continue;
            };
            let Some(row_format) = Format::from_row_label(&label.text) else {
                continue;
            };
            if !format.concrete().contains(&row_format) {
                continue;
            }

            for (header, cell) in headers.iter().zip(&row.cells).skip(1) {
                if let Some(name) = header {
                    put(&mut payload, row_format, format, name, &cell.text);
                }
            }
        }
    }

    payload
}

/// Parse career-summary tables laid out one column per format.
///
/// The header row carries the format labels ("Test", "ODI", "T20I");
/// each following row is one statistic. Combined rows such as
/// "100s/50s" or "Catches/stumpings" are split into two stats.
pub fn parse_career_columns<'a>(
    tables: impl IntoIterator<Item = Table<'a>>,
    format: Format,
) -> Payload {
    let mut payload = Payload::new();

    for table in tables {
        let rows = table.rows();
        let Some(header_index) = rows.iter().position(|row| {
            row.cells
                .iter()
                .skip(1)
                .any(|c| Format::from_row_label(&c.text).is_some())
        }) else {
            continue;
        };
        let columns: Vec<Option<Format>> = rows[header_index]
            .cells
            .iter()
            .map(|c| Format::from_row_label(&c.text))
            .collect();

        let body = &rows[header_index + 1..];
        let names: Vec<Option<String>> = body
            .iter()
            .filter_map(|row| row.cells.first())
            .flat_map(|c| c.text.split('/'))
            .map(stat_name)
            .collect();
        let bowling = is_bowling_table(&names);

        for row in body {
            let Some(label) = row.cells.first() else {
                continue;
            };
            for (column, cell) in columns.iter().zip(&row.cells).skip(1) {
                let Some(row_format) = column else { continue };
                if !format.concrete().contains(row_format) {
                    continue;
                }
                for (part, value) in split_pairs(&label.text, &cell.text) {
                    let Some(name) = stat_name(&part) else {
                        continue;
                    };
                    let name = disambiguate(name, &part, bowling);
                    put(&mut payload, *row_format, format, &name, value);
                }
            }
        }
    }

    payload
}
