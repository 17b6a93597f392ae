//! Prompt construction.

use crate::coordinator::AggregateReport;
use crate::models::{Focus, Query};
use std::fmt::Write;

const CLOSING: &str =
    "Format your response in a clear, structured manner with proper headings and bullet points.";

/// Prompt for a single-player analysis.
pub fn analysis_prompt(query: &Query, report: &AggregateReport, focus: Focus) -> String {
    let mut prompt = format!(
        "Analyze the following data for {} in {} format, focusing specifically on {}.\n\n",
        query.player,
        query.format,
        focus.description()
    );
    let _ = writeln!(prompt, "Sources: {}\n", report.summary_line());
    push_report_data(&mut prompt, report, None);
    prompt.push_str(&analysis_instructions(&query.player, &query.format.to_string(), focus));
    prompt.push('\n');
    prompt.push_str(CLOSING);
    prompt
}

/// Prompt for a two-player comparison.
pub fn comparison_prompt(
    first: &AggregateReport,
    second: &AggregateReport,
    focus: Focus,
) -> String {
    let player1 = &first.query().player;
    let player2 = &second.query().player;
    let format = first.query().format.to_string();

    let mut prompt = format!(
        "Compare the following two players focusing specifically on {}.\n\n\
         Player 1: {}\nPlayer 2: {}\nFormat: {}\n\n",
        focus.description(),
        player1,
        player2,
        format
    );

    for report in [first, second] {
        let player = &report.query().player;
        let _ = writeln!(prompt, "Data for {} ({}):", player, report.summary_line());
        push_report_data(&mut prompt, report, Some(player));
        prompt.push('\n');
    }

    prompt.push_str(&comparison_instructions(player1, player2, &format, focus));
    prompt.push('\n');
    prompt.push_str(CLOSING);
    prompt
}

/// Prompt for a general cricket question answered from the model's own
/// knowledge.
pub fn insight_prompt(question: &str) -> String {
    let mut prompt = format!(
        "As a cricket statistics expert, provide insights on: {}\n\n\
         Use your knowledge of cricket statistics, player performance, and historical data to \
         provide:\n\n",
        question.trim()
    );
    push_numbered(
        &mut prompt,
        &[
            "**Statistical Analysis**: The relevant figures and records".to_string(),
            "**Historical Context**: How this compares across eras".to_string(),
            "**Current Trends**: Patterns in recent seasons".to_string(),
            "**Expert View**: Recommendations or predictions".to_string(),
        ],
    );
    prompt.push_str("\nBe specific and data-driven in your response.\n");
    prompt.push_str(CLOSING);
    prompt
}

fn push_report_data(prompt: &mut String, report: &AggregateReport, player: Option<&str>) {
    let suffix = player
        .map(|p| format!(" FOR {}", p.to_uppercase()))
        .unwrap_or_default();

    for result in report.successful_results() {
        let _ = writeln!(
            prompt,
            "--- {} DATA{} ---\nStatus: {}",
            result.source().display_name().to_uppercase(),
            suffix,
            result.status()
        );
        let stats = serde_json::to_string_pretty(result.payload()).unwrap_or_default();
        let _ = writeln!(prompt, "Statistics: {}\n", stats);
    }

    let failed: Vec<String> = report
        .failed_results()
        .map(|r| match r.note() {
            Some(note) => format!("- {}: {}", r.source(), note),
            None => format!("- {}", r.source()),
        })
        .collect();
    if !failed.is_empty() {
        let _ = writeln!(prompt, "Sources that returned no data:\n{}\n", failed.join("\n"));
    }
}

fn analysis_instructions(player: &str, format: &str, focus: Focus) -> String {
    let (subject, items) = match focus {
        Focus::Overall => (
            String::new(),
            vec![
                "**Player Overview**: Basic information and career summary".to_string(),
                "**Statistical Analysis**: Key performance metrics and achievements".to_string(),
                format!("**Format Performance**: How they perform in {} cricket", format),
                "**Career Highlights**: Notable achievements and records".to_string(),
                "**Data Quality Assessment**: Reliability of different data sources".to_string(),
                "**Overall Assessment**: Summary and conclusion".to_string(),
            ],
        ),
        _ => {
            let area = focus.to_string();
            (
                format!("{} ", area.to_uppercase()),
                vec![
                    format!("**{} Overview**: Basic {} information and style", area, area.to_lowercase()),
                    format!("**Statistical Analysis**: Key {} metrics and achievements", area.to_lowercase()),
                    format!(
                        "**Format Performance**: How they perform in {} cricket {}",
                        format,
                        area.to_lowercase()
                    ),
                    format!("**{} Strengths**: Key {} strengths and techniques", area, area.to_lowercase()),
                    format!("**{} Assessment**: Overall {} ability and ranking", area, area.to_lowercase()),
                ],
            )
        }
    };

    let mut text = format!(
        "Please provide a comprehensive {}analysis of {} including:\n\n",
        subject, player
    );
    push_numbered(&mut text, &items);
    if focus != Focus::Overall {
        let _ = writeln!(text, "\nFocus specifically on {}.", focus.description());
    }
    text
}

fn comparison_instructions(player1: &str, player2: &str, format: &str, focus: Focus) -> String {
    let (subject, items) = match focus {
        Focus::Overall => (
            String::new(),
            vec![
                "**Player Overview**: Compare their basic information and career summaries"
                    .to_string(),
                "**Statistical Comparison**: Side-by-side performance metrics".to_string(),
                format!("**Format Performance**: How they compare in {} cricket", format),
                "**Career Highlights**: Compare their notable achievements and records"
                    .to_string(),
                "**Data Quality Assessment**: Reliability of different data sources".to_string(),
                "**Overall Assessment**: Who is the better player and why".to_string(),
            ],
        ),
        _ => {
            let area = focus.to_string();
            let role = match focus {
                Focus::Bowling => "bowler",
                Focus::Fielding => "fielder",
                _ => "batsman",
            };
            (
                format!("{} ", area.to_uppercase()),
                vec![
                    format!(
                        "**{} Overview**: Compare their {} styles and approaches",
                        area,
                        area.to_lowercase()
                    ),
                    format!("**Statistical Comparison**: Side-by-side {} metrics", area.to_lowercase()),
                    format!(
                        "**Format Performance**: How they compare in {} cricket {}",
                        format,
                        area.to_lowercase()
                    ),
                    format!(
                        "**{} Strengths**: Compare their {} strengths and techniques",
                        area,
                        area.to_lowercase()
                    ),
                    format!("**{} Assessment**: Who is the better {} and why", area, role),
                ],
            )
        }
    };

    let mut text = format!(
        "Please provide a comprehensive {}comparison between {} and {} including:\n\n",
        subject, player1, player2
    );
    push_numbered(&mut text, &items);
    if focus != Focus::Overall {
        let _ = writeln!(text, "\nFocus specifically on {}.", focus.description());
    }
    text
}

fn push_numbered(text: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, item);
    }
}
