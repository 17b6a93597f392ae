//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analyzer::Provider;
use crate::models::{Focus, Format};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Crickstat - cricket player statistics from several sources, analyzed by an LLM
///
/// Queries ESPN Cricinfo, Cricbuzz and Wikipedia concurrently, fills gaps
/// from built-in fallback data and asks a language model for an analysis.
///
/// Examples:
///   crickstat analyze "Virat Kohli" --format test
///   crickstat compare "Virat Kohli" "Joe Root" --focus batting
///   crickstat ask "compare Kohli vs Root in ODI bowling"
///   crickstat chat
///   crickstat stats "Sachin Tendulkar" -f odi
///   crickstat tool search_players --args '{"query": "kohli"}'
///   crickstat serve --bind 0.0.0.0:8080
///   crickstat init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .crickstat.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Language-model provider
    #[arg(long, value_name = "PROVIDER", global = true)]
    pub provider: Option<Provider>,

    /// Model to use for analysis
    ///
    /// Can also be set via CRICKSTAT_MODEL env var or .crickstat.toml config.
    #[arg(short, long, env = "CRICKSTAT_MODEL", global = true)]
    pub model: Option<String>,

    /// Model API base URL
    #[arg(long, value_name = "URL", global = true)]
    pub api_base: Option<String>,

    /// API key for the hosted model
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum tokens in the LLM response
    #[arg(long, value_name = "TOKENS", global = true)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout for data sources, in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub source_timeout: Option<u64>,

    /// Extra attempts after a transient source failure (at most 3)
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<u32>,

    /// TOML file with extra fallback statistics
    #[arg(long, value_name = "FILE", global = true)]
    pub fallback_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Collect statistics for a player and analyze them
    Analyze {
        /// Player name, e.g. "Virat Kohli"
        player: String,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// Compare two players
    Compare {
        /// First player
        player1: String,

        /// Second player
        player2: String,

        #[command(flatten)]
        options: AnalysisOptions,
    },

    /// Ask a free-text question, e.g. "Kohli vs Root in tests"
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Start an interactive session reading one question per line
    Chat,

    /// Collect statistics only, without analysis
    Stats {
        /// Player name
        player: String,

        /// Cricket format
        #[arg(short, long, value_name = "FORMAT")]
        format: Option<Format>,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Invoke a tool endpoint and print its JSON result
    Tool {
        /// Tool name
        #[arg(required_unless_present = "list")]
        name: Option<String>,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON", default_value = "{}")]
        args: String,

        /// List the available tools
        #[arg(long)]
        list: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on (default: from config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Generate a default .crickstat.toml configuration file
    InitConfig,
}

/// Options shared by `analyze` and `compare`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Cricket format (default: from config)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<Format>,

    /// Aspect of the record to concentrate on
    #[arg(long, value_name = "FOCUS", default_value = "overall")]
    pub focus: Focus,

    /// Dry run: collect statistics and show the prompt without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub output: OutputOptions,
}

/// Where and how to write the report.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OutputOptions {
    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub report_format: OutputFormat,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        if self.source_timeout == Some(0) {
            return Err("Source timeout must be at least 1 second".to_string());
        }

        if let Some(ref api_base) = self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                return Err("API base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            Command::Analyze { player, .. } | Command::Stats { player, .. } => {
                require_name(player)?;
            }
            Command::Compare {
                player1, player2, ..
            } => {
                require_name(player1)?;
                require_name(player2)?;
                if player1.trim().eq_ignore_ascii_case(player2.trim()) {
                    return Err("Cannot compare a player with themselves".to_string());
                }
            }
            Command::Tool { args, .. } => {
                let parsed: serde_json::Value = serde_json::from_str(args)
                    .map_err(|e| format!("--args is not valid JSON: {}", e))?;
                if !parsed.is_object() {
                    return Err("--args must be a JSON object".to_string());
                }
            }
            Command::Ask { .. } | Command::Chat | Command::Serve { .. } | Command::InitConfig => {}
        }

        // Validate fallback file if provided
        if let Some(ref path) = self.fallback_file {
            if !path.is_file() {
                return Err(format!("Fallback file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn require_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        Err("Player name must not be empty".to_string())
    } else {
        Ok(())
    }
}
