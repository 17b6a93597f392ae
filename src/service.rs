//! Request-level operations shared by the CLI, the tools and the HTTP API.

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::coordinator::{AggregateReport, Coordinator};
use crate::error::CricketError;
use crate::fallback::FallbackTable;
use crate::models::{AnalysisResult, Focus, Format, PlayerInfo, Query, ReportMetadata};
use crate::query::{self, Request};
use crate::sources::http::build_client;
use crate::sources::{EspnDirect, PlayerDirectory, SourceRegistry};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Largest number of names `search_players` returns.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// What came of the analysis step of a request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    /// No usable data; the backend was not called.
    InsufficientData(AnalysisResult),
    /// The backend call failed.
    Failed { error: String },
}

impl AnalysisOutcome {
    fn from_result(result: Result<AnalysisResult, CricketError>) -> Result<Self, CricketError> {
        match result {
            Ok(analysis) if analysis.insufficient_data => {
                Ok(AnalysisOutcome::InsufficientData(analysis))
            }
            Ok(analysis) => Ok(AnalysisOutcome::Completed(analysis)),
            Err(CricketError::AnalysisBackend(error)) => Ok(AnalysisOutcome::Failed { error }),
            Err(other) => Err(other),
        }
    }

    /// Whether the language model was consulted.
    pub fn consulted_model(&self) -> bool {
        !matches!(self, AnalysisOutcome::InsufficientData(_))
    }

    /// The analysis text, or the error message.
    pub fn text(&self) -> &str {
        match self {
            AnalysisOutcome::Completed(a) | AnalysisOutcome::InsufficientData(a) => &a.text,
            AnalysisOutcome::Failed { error } => error,
        }
    }
}

/// A single-player analysis with its source report.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerAnalysis {
    pub report: AggregateReport,
    pub focus: Focus,
    pub outcome: AnalysisOutcome,
    pub metadata: ReportMetadata,
}

/// A two-player comparison with both source reports.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerComparison {
    pub first: AggregateReport,
    pub second: AggregateReport,
    pub focus: Focus,
    pub outcome: AnalysisOutcome,
    pub metadata: ReportMetadata,
}

/// An answer to a general cricket question.
#[derive(Debug, Clone, Serialize)]
pub struct CricketInsight {
    pub question: String,
    pub outcome: AnalysisOutcome,
    pub metadata: ReportMetadata,
}

/// Result of a free-text request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Answer {
    Analysis(PlayerAnalysis),
    Comparison(PlayerComparison),
    Insight(CricketInsight),
}

impl Answer {
    pub fn outcome(&self) -> &AnalysisOutcome {
        match self {
            Answer::Analysis(a) => &a.outcome,
            Answer::Comparison(c) => &c.outcome,
            Answer::Insight(i) => &i.outcome,
        }
    }
}

/// The cricket statistics service.
#[derive(Clone)]
pub struct CricketService {
    coordinator: Coordinator,
    analyzer: Option<Analyzer>,
    directory: Arc<dyn PlayerDirectory>,
    fallback: Arc<FallbackTable>,
    default_format: Format,
}

impl CricketService {
    pub fn new(
        coordinator: Coordinator,
        directory: Arc<dyn PlayerDirectory>,
        fallback: Arc<FallbackTable>,
        default_format: Format,
    ) -> Self {
        Self {
            coordinator,
            analyzer: None,
            directory,
            fallback,
            default_format,
        }
    }

    /// Build the standard sources and fallback table from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fallback = Arc::new(load_fallback(config)?);
        info!("Fallback table has {} players", fallback.len());

        let client = build_client(&config.sources).context("Failed to create HTTP client")?;
        let registry =
            SourceRegistry::standard(&config.sources, client.clone(), Arc::clone(&fallback));
        let directory = Arc::new(EspnDirect::new(client, &config.sources));

        Ok(Self::new(
            Coordinator::new(registry),
            directory,
            fallback,
            config.general.default_format,
        ))
    }

    /// Attach the analyzer used by the analysis operations.
    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn default_format(&self) -> Format {
        self.default_format
    }

    fn analyzer(&self) -> Result<&Analyzer, CricketError> {
        self.analyzer.as_ref().ok_or_else(|| {
            CricketError::Configuration("no analysis backend is configured".to_string())
        })
    }

    /// Collect statistics from every source.
    pub async fn collect(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<AggregateReport, CricketError> {
        self.coordinator.collect(query, cancel).await
    }

    /// Collect and analyze one player.
    ///
    /// A failing backend is reported in the outcome so the source report
    /// is never lost.
    pub async fn analyze_player(
        &self,
        query: &Query,
        focus: Focus,
        cancel: &CancellationToken,
    ) -> Result<PlayerAnalysis, CricketError> {
        let analyzer = self.analyzer()?;
        let start = Instant::now();

        let report = self.collect(query, cancel).await?;
        let outcome = AnalysisOutcome::from_result(analyzer.analyze(&report, focus).await)?;
        let metadata = metadata(analyzer, &outcome, start);

        Ok(PlayerAnalysis {
            report,
            focus,
            outcome,
            metadata,
        })
    }

    /// Collect both players concurrently, then make one comparison call.
    pub async fn compare_players(
        &self,
        player1: &str,
        player2: &str,
        format: Format,
        focus: Focus,
        cancel: &CancellationToken,
    ) -> Result<PlayerComparison, CricketError> {
        let analyzer = self.analyzer()?;
        let first_query = Query::new(player1, format)?;
        let second_query = Query::new(player2, format)?;
        let start = Instant::now();

        let (first, second) = tokio::join!(
            self.collect(&first_query, cancel),
            self.collect(&second_query, cancel)
        );
        let (first, second) = (first?, second?);

        let outcome =
            AnalysisOutcome::from_result(analyzer.compare(&first, &second, focus).await)?;
        let metadata = metadata(analyzer, &outcome, start);

        Ok(PlayerComparison {
            first,
            second,
            focus,
            outcome,
            metadata,
        })
    }

    /// Answer a free-text request.
    pub async fn ask(&self, text: &str, cancel: &CancellationToken) -> Result<Answer, CricketError> {
        match query::parse(text, self.default_format)? {
            Request::Analyze { query, focus } => {
                info!("Interpreted '{}' as analysis of {}", text, query);
                self.analyze_player(&query, focus, cancel)
                    .await
                    .map(Answer::Analysis)
            }
            Request::Compare {
                first,
                second,
                focus,
            } => {
                info!(
                    "Interpreted '{}' as comparison of {} and {}",
                    text, first.player, second.player
                );
                self.compare_players(&first.player, &second.player, first.format, focus, cancel)
                    .await
                    .map(Answer::Comparison)
            }
            Request::Insight { question } => {
                info!("Interpreted '{}' as a general question", text);
                self.insight(&question, cancel).await.map(Answer::Insight)
            }
        }
    }

    /// Answer a general cricket question with one backend call. No source
    /// is queried.
    pub async fn insight(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<CricketInsight, CricketError> {
        let analyzer = self.analyzer()?;
        let start = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CricketError::Cancelled),
            result = analyzer.insight(question) => result,
        };
        let outcome = AnalysisOutcome::from_result(result)?;
        let metadata = metadata(analyzer, &outcome, start);

        Ok(CricketInsight {
            question: question.to_string(),
            outcome,
            metadata,
        })
    }

    /// Player names matching `query`: live search results first, then
    /// fallback table matches, without duplicates.
    pub async fn search_players(&self, query: &str, limit: usize) -> Vec<String> {
        let limit = limit.clamp(1, MAX_SEARCH_RESULTS);

        let mut names = match self.directory.search(query, limit).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Player search for '{}' failed: {}", query, e);
                Vec::new()
            }
        };
        names.extend(self.fallback.search(query));

        let mut seen = std::collections::HashSet::new();
        names.retain(|name| seen.insert(name.to_lowercase()));
        names.truncate(limit);
        names
    }

    /// Name, role and team from the player's profile page. `None` when
    /// the profile cannot be found or read.
    pub async fn player_info(
        &self,
        player: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PlayerInfo>, CricketError> {
        let player = player.trim();
        if player.is_empty() {
            return Err(CricketError::Configuration(
                "player name must not be empty".to_string(),
            ));
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CricketError::Cancelled),
            result = self.directory.basic_info(player) => result,
        };
        match result {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                warn!("Profile lookup for '{}' failed: {}", player, e);
                Ok(None)
            }
        }
    }
}

fn load_fallback(config: &Config) -> Result<FallbackTable> {
    let mut table = if config.sources.builtin_fallback {
        FallbackTable::builtin()
    } else {
        FallbackTable::empty()
    };
    if let Some(path) = &config.sources.fallback_file {
        table.merge(FallbackTable::load(path)?);
    }
    if table.is_empty() {
        warn!("Fallback table is empty; failed sources will carry no data");
    }
    Ok(table)
}

fn metadata(analyzer: &Analyzer, outcome: &AnalysisOutcome, start: Instant) -> ReportMetadata {
    ReportMetadata {
        generated_at: Utc::now(),
        model_used: outcome
            .consulted_model()
            .then(|| analyzer.model_name().to_string()),
        duration_seconds: start.elapsed().as_secs_f64(),
    }
}
