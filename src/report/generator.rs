//! Markdown report generation.
//!
//! This module renders analyses, comparisons and plain stat collections
//! as Markdown. Every analysis or comparison report carries the
//! per-source status section, also when the analysis itself failed.

use crate::coordinator::AggregateReport;
use crate::models::{Focus, ReportMetadata, SourceStatus};
use crate::service::{AnalysisOutcome, Answer, CricketInsight, PlayerAnalysis, PlayerComparison};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Generate the Markdown report for a single-player analysis.
pub fn generate_markdown_analysis(analysis: &PlayerAnalysis) -> String {
    let query = analysis.report.query();
    let mut output = String::new();

    output.push_str("# 🏏 Cricket Player Analysis\n\n");
    output.push_str(&format!("- **Player:** {}\n", query.player));
    output.push_str(&format!("- **Format:** {}\n", query.format));
    output.push_str(&focus_line(analysis.focus));
    output.push_str(&generate_metadata_section(&analysis.metadata));

    output.push_str(&status_section(&analysis.report));
    output.push_str(&generate_outcome_section(&analysis.outcome));
    output.push_str(&generate_footer(&format!(
        "Analysis completed using {} data source(s)",
        analysis.report.successful()
    )));

    output
}

/// Generate the Markdown report for a comparison.
pub fn generate_markdown_comparison(comparison: &PlayerComparison) -> String {
    let first = comparison.first.query();
    let second = comparison.second.query();
    let mut output = String::new();

    output.push_str("# ⚖️ Player Comparison\n\n");
    output.push_str(&format!("- **Player 1:** {}\n", first.player));
    output.push_str(&format!("- **Player 2:** {}\n", second.player));
    output.push_str(&format!("- **Format:** {}\n", first.format));
    output.push_str(&focus_line(comparison.focus));
    output.push_str(&generate_metadata_section(&comparison.metadata));

    for report in [&comparison.first, &comparison.second] {
        output.push_str(&format!("### {}\n\n", report.query().player));
        output.push_str(&status_section(report));
    }

    output.push_str(&generate_outcome_section(&comparison.outcome));
    output.push_str(&generate_footer(&format!(
        "Comparison completed using {} sources for {} and {} sources for {}",
        comparison.first.successful(),
        first.player,
        comparison.second.successful(),
        second.player
    )));

    output
}

/// Generate the Markdown answer to a general question.
pub fn generate_markdown_insight(insight: &CricketInsight) -> String {
    let mut output = String::new();

    output.push_str("# 💡 Cricket Insights

");
    output.push_str(&format!("- **Question:** {}
", insight.question));
    output.push_str(&generate_metadata_section(&insight.metadata));
    output.push_str(&generate_outcome_section(&insight.outcome));
    output.push_str(&generate_footer(
        "Answered from the model's knowledge; no data sources were queried",
    ));

    output
}

/// Generate the Markdown report for any free-text answer.
pub fn generate_markdown_answer(answer: &Answer) -> String {
    match answer {
        Answer::Analysis(analysis) => generate_markdown_analysis(analysis),
        Answer::Comparison(comparison) => generate_markdown_comparison(comparison),
        Answer::Insight(insight) => generate_markdown_insight(insight),
    }
}

/// Generate the Markdown report for a collection without analysis.
pub fn generate_stats_report(report: &AggregateReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# 📊 Statistics: {}\n\n", report.query()));
    output.push_str(&status_section(report));
    output.push_str(&format!(
        "Live: {} | Fallback: {} | Failed: {}\n\n",
        report.count_by_status(SourceStatus::Live),
        report.count_by_status(SourceStatus::Fallback),
        report.count_by_status(SourceStatus::Failed)
    ));
    output.push_str(&generate_stats_table(report));

    for result in report.failed_results() {
        if let Some(note) = result.note() {
            output.push_str(&format!("- {} {}: {}\n", result.status().emoji(), result.source(), note));
        }
    }

    output
}

/// The per-source status list with the overall fraction.
pub fn status_section(report: &AggregateReport) -> String {
    let mut section = String::new();

    section.push_str("**📊 Data Source Status:**\n\n");
    for result in report.results() {
        section.push_str(&format!(
            "- {} **{}**: {}\n",
            result.status().emoji(),
            result.source(),
            result.status()
        ));
    }
    section.push_str(&format!("\n**Summary:** {}\n\n", report.summary_line()));

    section
}

fn focus_line(focus: Focus) -> String {
    if focus == Focus::Overall {
        String::new()
    } else {
        format!("- **Focus:** {}\n", focus)
    }
}

/// Generate the metadata lines.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(model) = &metadata.model_used {
        section.push_str(&format!("- **Model Used:** `{}`\n", model));
    }
    section.push_str(&format!(
        "- **Analysis Time:** {:.2} seconds\n\n",
        metadata.duration_seconds
    ));

    section
}

/// One row per stat, one column per source with data.
fn generate_stats_table(report: &AggregateReport) -> String {
    let sources: Vec<_> = report.successful_results().collect();
    if sources.is_empty() {
        return "No source returned statistics.\n\n".to_string();
    }

    let stats: BTreeSet<&String> = sources.iter().flat_map(|r| r.payload().keys()).collect();
    let mut table = String::new();

    table.push_str("| Stat |");
    for result in &sources {
        let marker = if result.status() == SourceStatus::Fallback {
            " (fallback)"
        } else {
            ""
        };
        table.push_str(&format!(" {}{} |", result.source(), marker));
    }
    table.push('\n');
    table.push_str("|:---|");
    table.push_str(&":---:|".repeat(sources.len()));
    table.push('\n');

    for stat in stats {
        table.push_str(&format!("| {} |", stat));
        for result in &sources {
            let value = result.payload().get(stat).map(String::as_str).unwrap_or("-");
            table.push_str(&format!(" {} |", value));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

fn generate_outcome_section(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Completed(analysis) => format!("{}\n\n", analysis.text.trim_end()),
        AnalysisOutcome::InsufficientData(analysis) => format!("❌ {}\n\n", analysis.text),
        AnalysisOutcome::Failed { error } => format!("❌ **Analysis failed:** {}\n\n", error),
    }
}

/// Generate the report footer.
fn generate_footer(summary: &str) -> String {
    format!("---\n\n*{}*\n", summary)
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Format, Query, SourceId, SourceResult};
    use crate::testing::payload;
    use chrono::Utc;

    fn create_test_report(player: &str) -> AggregateReport {
        AggregateReport::from_results(
            Query::new(player, Format::Test).unwrap(),
            vec![
                SourceResult::live(SourceId::EspnDirect, payload(&[("runs", "9230"), ("matches", "123")])),
                SourceResult::failed(SourceId::EspnSearch, "blocked".to_string()),
                SourceResult::fallback(
                    SourceId::Cricbuzz,
                    payload(&[("runs", "8848")]),
                    "timeout".to_string(),
                ),
                SourceResult::failed(SourceId::Wikipedia, "player not found".to_string()),
            ],
        )
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            generated_at: Utc::now(),
            model_used: Some("test-model".to_string()),
            duration_seconds: 3.5,
        }
    }

    #[test]
    fn test_status_section() {
        let section = status_section(&create_test_report("Virat Kohli"));

        assert!(section.contains("🟢 **ESPN Cricinfo Direct**: Live Data"));
        assert!(section.contains("⚠️ **Cricbuzz**: Fallback Data"));
        assert!(section.contains("🔴 **Wikipedia**: Failed"));
        assert!(section.contains("**Summary:** 2/4 sources succeeded"));
    }

    #[test]
    fn test_generate_markdown_analysis() {
        let analysis = PlayerAnalysis {
            report: create_test_report("Virat Kohli"),
            focus: Focus::Batting,
            outcome: AnalysisOutcome::Completed(AnalysisResult::completed(
                "## Overview\nA great batter.".to_string(),
                BTreeSet::new(),
            )),
            metadata: metadata(),
        };
        let markdown = generate_markdown_analysis(&analysis);

        assert!(markdown.contains("**Player:** Virat Kohli"));
        assert!(markdown.contains("**Focus:** Batting"));
        assert!(markdown.contains("`test-model`"));
        assert!(markdown.contains("Data Source Status"));
        assert!(markdown.contains("A great batter."));
        assert!(markdown.contains("using 2 data source(s)"));
    }

    #[test]
    fn test_generate_markdown_insight() {
        let answer = Answer::Insight(CricketInsight {
            question: "Who has the most Test wickets?".to_string(),
            outcome: AnalysisOutcome::Completed(AnalysisResult::completed(
                "Muttiah Muralitharan, 800.".to_string(),
                BTreeSet::new(),
            )),
            metadata: metadata(),
        });
        let markdown = generate_markdown_answer(&answer);

        assert!(markdown.starts_with("# 💡 Cricket Insights"));
        assert!(markdown.contains("**Question:** Who has the most Test wickets?"));
        assert!(markdown.contains("Muttiah Muralitharan, 800."));
        assert!(!markdown.contains("Data Source Status"));
    }

    #[test]
    fn test_failed_analysis_keeps_status() {
        let analysis = PlayerAnalysis {
            report: create_test_report("Virat Kohli"),
            focus: Focus::Overall,
            outcome: AnalysisOutcome::Failed {
                error: "API error 500".to_string(),
            },
            metadata: metadata(),
        };
        let markdown = generate_markdown_analysis(&analysis);

        assert!(markdown.contains("2/4 sources succeeded"));
        assert!(markdown.contains("**Analysis failed:** API error 500"));
        assert!(!markdown.contains("**Focus:**"));
    }

    #[test]
    fn test_generate_markdown_comparison() {
        let comparison = PlayerComparison {
            first: create_test_report("Virat Kohli"),
            second: create_test_report("Joe Root"),
            focus: Focus::Overall,
            outcome: AnalysisOutcome::Completed(AnalysisResult::completed(
                "Both are great.".to_string(),
                BTreeSet::new(),
            )),
            metadata: metadata(),
        };
        let markdown = generate_markdown_comparison(&comparison);

        assert!(markdown.contains("### Virat Kohli"));
        assert!(markdown.contains("### Joe Root"));
        assert_eq!(markdown.matches("Data Source Status").count(), 2);
        assert!(markdown.contains("2 sources for Virat Kohli and 2 sources for Joe Root"));
    }

    #[test]
    fn test_generate_stats_report() {
        let markdown = generate_stats_report(&create_test_report("Virat Kohli"));

        assert!(markdown.contains("| Stat | ESPN Cricinfo Direct | Cricbuzz (fallback) |"));
        assert!(markdown.contains("| runs | 9230 | 8848 |"));
        assert!(markdown.contains("| matches | 123 | - |"));
        assert!(markdown.contains("Wikipedia: player not found"));
        assert!(markdown.contains("Live: 1 | Fallback: 1 | Failed: 2"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report("Virat Kohli")).unwrap();

        assert!(json.contains("\"successful\": 2"));
        assert!(json.contains("\"status\": \"fallback\""));
        assert!(json.contains("\"source\": \"espn_direct\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report("# Report\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report\n");
    }
}
