//! Report rendering.

pub mod generator;

pub use generator::{
    generate_json_report, generate_markdown_analysis, generate_markdown_answer,
    generate_markdown_comparison,
    generate_stats_report, status_section, write_report,
};
