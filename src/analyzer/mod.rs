//! Natural-language analysis of aggregate reports.
//!
//! The analyzer renders one or two [`AggregateReport`]s, or a general
//! question, into a prompt and makes exactly one backend call. Reports
//! without usable data never reach the backend.

pub mod backend;
pub mod prompt;

use crate::coordinator::AggregateReport;
use crate::error::CricketError;
use crate::models::{AnalysisResult, Focus};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

pub use backend::{build_backend, CompletionBackend, Provider};

#[derive(Clone)]
pub struct Analyzer {
    backend: Arc<dyn CompletionBackend>,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Analyze one player's report.
    pub async fn analyze(
        &self,
        report: &AggregateReport,
        focus: Focus,
    ) -> Result<AnalysisResult, CricketError> {
        let query = report.query();
        if !report.has_data() {
            warn!("No usable data for {}, skipping analysis", query);
            return Ok(AnalysisResult::insufficient(format!(
                "Insufficient data: none of the {} sources returned statistics for {}.",
                report.total(),
                query
            )));
        }

        info!("Analyzing {} ({} focus) with {}", query, focus, self.model_name());
        let prompt = prompt::analysis_prompt(query, report, focus);
        let text = self.backend.complete(&prompt).await?;
        Ok(AnalysisResult::completed(text, report.sources_used()))
    }

    /// Compare two players' reports.
    pub async fn compare(
        &self,
        first: &AggregateReport,
        second: &AggregateReport,
        focus: Focus,
    ) -> Result<AnalysisResult, CricketError> {
        let missing: Vec<String> = [first, second]
            .iter()
            .filter(|r| !r.has_data())
            .map(|r| r.query().player.clone())
            .collect();
        if !missing.is_empty() {
            warn!("No usable data for {}, skipping comparison", missing.join(", "));
            return Ok(AnalysisResult::insufficient(format!(
                "Insufficient data: no source returned statistics for {}.",
                missing.join(" or ")
            )));
        }

        info!(
            "Comparing {} and {} ({} focus) with {}",
            first.query().player,
            second.query().player,
            focus,
            self.model_name()
        );
        let prompt = prompt::comparison_prompt(first, second, focus);
        let text = self.backend.complete(&prompt).await?;

        let mut sources_used = first.sources_used();
        sources_used.extend(second.sources_used());
        Ok(AnalysisResult::completed(text, sources_used))
    }

    /// Answer a general cricket question. No source data is involved.
    pub async fn insight(&self, question: &str) -> Result<AnalysisResult, CricketError> {
        info!("Answering '{}' with {}", question, self.model_name());
        let prompt = prompt::insight_prompt(question);
        let text = self.backend.complete(&prompt).await?;
        Ok(AnalysisResult::completed(text, BTreeSet::new()))
    }
}
