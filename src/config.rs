//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.crickstat.toml` files.

use crate::analyzer::Provider;
use crate::models::Format;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".crickstat.toml";

/// Upper bound on extra attempts per source.
pub const MAX_RETRIES: u32 = 3;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Language-model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Data source settings.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// HTTP API settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level when neither -v/-q nor RUST_LOG is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Format used when a request does not name one.
    #[serde(default)]
    pub default_format: Format,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_format: Format::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Language-model settings.
///
/// The API key is not part of the file: it comes from `--api-key` or the
/// `GOOGLE_API_KEY` environment variable only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend provider.
    #[serde(default)]
    pub provider: Provider,

    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// API base URL; the provider's public endpoint when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: default_model(),
            api_base: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_model_timeout() -> u64 {
    120
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Per-request timeout for live fetches, in seconds.
    #[serde(default = "default_source_timeout")]
    pub timeout_seconds: u64,

    /// Extra attempts after a transient failure (capped at 3).
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// User agent sent with every live fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_espn_base_url")]
    pub espn_base_url: String,

    #[serde(default = "default_espn_stats_url")]
    pub espn_stats_url: String,

    /// Search engine results page used by the ESPN-via-search source.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_cricbuzz_base_url")]
    pub cricbuzz_base_url: String,

    #[serde(default = "default_wikipedia_base_url")]
    pub wikipedia_base_url: String,

    /// Extra fallback entries, merged over the built-in table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_file: Option<PathBuf>,

    /// Start from the built-in fallback entries.
    #[serde(default = "default_true")]
    pub builtin_fallback: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_source_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            user_agent: default_user_agent(),
            espn_base_url: default_espn_base_url(),
            espn_stats_url: default_espn_stats_url(),
            search_url: default_search_url(),
            cricbuzz_base_url: default_cricbuzz_base_url(),
            wikipedia_base_url: default_wikipedia_base_url(),
            fallback_file: None,
            builtin_fallback: true,
        }
    }
}

impl SourcesConfig {
    /// Retries actually used, after the cap.
    pub fn effective_retries(&self) -> u32 {
        self.retries.min(MAX_RETRIES)
    }
}

fn default_source_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    500
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

fn default_espn_base_url() -> String {
    "https://www.espncricinfo.com".to_string()
}

fn default_espn_stats_url() -> String {
    "https://stats.espncricinfo.com".to_string()
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_cricbuzz_base_url() -> String {
    "https://www.cricbuzz.com".to_string()
}

fn default_wikipedia_base_url() -> String {
    "https://en.wikipedia.org".to_string()
}

fn default_true() -> bool {
    true
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the API listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Upper bound on one request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> u64 {
    180
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.crickstat.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_base) = args.api_base {
            self.model.api_base = Some(api_base.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.model.max_tokens = max_tokens;
        }

        if let Some(timeout) = args.source_timeout {
            self.sources.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.sources.retries = retries;
        }
        if let Some(ref fallback_file) = args.fallback_file {
            self.sources.fallback_file = Some(fallback_file.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
