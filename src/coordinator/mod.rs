//! Concurrent fan-out over the source agents.

pub mod aggregator;

use crate::error::CricketError;
use crate::models::Query;
use crate::sources::SourceRegistry;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use aggregator::{filter_payload, AggregateReport};

/// Runs every configured source agent for a query and merges the results.
#[derive(Clone)]
pub struct Coordinator {
    registry: SourceRegistry,
}

impl Coordinator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Query all sources concurrently and wait for every one of them.
    ///
    /// Fails only when `cancel` fires first; the in-flight fetches are
    /// dropped in that case.
    pub async fn collect(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<AggregateReport, CricketError> {
        info!(
            "Collecting {} from {} sources",
            query,
            self.registry.len()
        );

        if self.registry.is_empty() {
            warn!("No sources configured; every query will come back empty");
        }

        let fetches = self
            .registry
            .agents()
            .iter()
            .map(|agent| agent.fetch(&query.player, query.format));

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Collection for {} cancelled", query);
                return Err(CricketError::Cancelled);
            }
            results = join_all(fetches) => results,
        };

        let report = AggregateReport::from_results(query.clone(), results);
        info!("{}: {}", query, report.summary_line());
        Ok(report)
    }
}
