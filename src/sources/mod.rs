//! Source agents.
//!
//! Each data source implements [`StatSource`], a single live retrieval.
//! [`SourceAgent`] wraps a source with the bounded retry policy and the
//! fallback table, and always produces a [`SourceResult`].

pub mod cricbuzz;
pub mod espn;
pub mod espn_search;
pub mod html;
pub mod http;
pub mod wikipedia;

use crate::config::SourcesConfig;
use crate::error::SourceError;
use crate::fallback::FallbackTable;
use crate::models::{Format, Payload, PlayerInfo, SourceId, SourceResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use cricbuzz::Cricbuzz;
pub use espn::EspnDirect;
pub use espn_search::EspnSearch;
pub use wikipedia::Wikipedia;

/// One external data source.
#[async_trait]
pub trait StatSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Fetch and parse live statistics for a player.
    async fn fetch_live(&self, player: &str, format: Format) -> Result<Payload, SourceError>;
}

/// Player lookup used by the search and profile tools.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError>;

    /// Name, role and team from the player's profile page.
    async fn basic_info(&self, player: &str) -> Result<PlayerInfo, SourceError>;
}

/// Extra attempts after a transient failure, with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(settings: &SourcesConfig) -> Self {
        Self {
            retries: settings.effective_retries(),
            delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}

/// A source plus its retry policy and fallback data.
#[derive(Clone)]
pub struct SourceAgent {
    source: Arc<dyn StatSource>,
    fallback: Arc<FallbackTable>,
    retry: RetryPolicy,
}

impl SourceAgent {
    pub fn new(
        source: Arc<dyn StatSource>,
        fallback: Arc<FallbackTable>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            fallback,
            retry,
        }
    }

    pub fn id(&self) -> SourceId {
        self.source.id()
    }

    /// Fetch statistics for a player. Never fails: errors become a
    /// Fallback result when the table has an entry, Failed otherwise.
    pub async fn fetch(&self, player: &str, format: Format) -> SourceResult {
        let id = self.id();

        match self.fetch_with_retry(player, format).await {
            Ok(payload) => {
                info!("{}: live data for {} ({} stats)", id, player, payload.len());
                SourceResult::live(id, payload)
            }
            Err(err) => match self.fallback.lookup(player, format) {
                Some(payload) => {
                    warn!("{}: {}; using fallback data", id, err);
                    SourceResult::fallback(id, payload, err.to_string())
                }
                None => {
                    warn!("{}: {}; no fallback data", id, err);
                    SourceResult::failed(id, format!("{}; no fallback data available", err))
                }
            },
        }
    }

    async fn fetch_with_retry(
        &self,
        player: &str,
        format: Format,
    ) -> Result<Payload, SourceError> {
        let mut attempt = 0;

        loop {
            let result = self
                .source
                .fetch_live(player, format)
                .await
                .and_then(|payload| {
                    if payload.is_empty() {
                        Err(SourceError::Empty)
                    } else {
                        Ok(payload)
                    }
                });

            match result {
                Err(err) if err.is_retryable() && attempt < self.retry.retries => {
                    attempt += 1;
                    debug!(
                        "{}: attempt {} failed ({}), retrying in {:?}",
                        self.id(),
                        attempt,
                        err,
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                other => return other,
            }
        }
    }
}

/// The configured set of source agents.
#[derive(Clone)]
pub struct SourceRegistry {
    agents: Vec<SourceAgent>,
}

impl SourceRegistry {
    /// The four standard sources sharing one HTTP client.
    pub fn standard(
        settings: &SourcesConfig,
        client: reqwest::Client,
        fallback: Arc<FallbackTable>,
    ) -> Self {
        let sources: Vec<Arc<dyn StatSource>> = vec![
            Arc::new(EspnDirect::new(client.clone(), settings)),
            Arc::new(EspnSearch::new(client.clone(), settings)),
            Arc::new(Cricbuzz::new(client.clone(), settings)),
            Arc::new(Wikipedia::new(client, settings)),
        ];
        Self::with_sources(sources, fallback, RetryPolicy::from_config(settings))
    }

    /// Any set of sources sharing one fallback table and retry policy.
    pub fn with_sources(
        sources: Vec<Arc<dyn StatSource>>,
        fallback: Arc<FallbackTable>,
        retry: RetryPolicy,
    ) -> Self {
        let agents = sources
            .into_iter()
            .map(|source| SourceAgent::new(source, Arc::clone(&fallback), retry))
            .collect();
        Self { agents }
    }

    pub fn agents(&self) -> &[SourceAgent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceStatus;
    use crate::testing::{kohli_test_payload, FakeSource};

    fn agent(source: Arc<FakeSource>, retry: RetryPolicy) -> SourceAgent {
        SourceAgent::new(source, Arc::new(FallbackTable::builtin()), retry)
    }

    #[tokio::test]
    async fn test_live_result() {
        let source = Arc::new(FakeSource::live(SourceId::Cricbuzz, kohli_test_payload()));
        let result = agent(source, RetryPolicy::none())
            .fetch("Virat Kohli", Format::Test)
            .await;

        assert_eq!(result.status(), SourceStatus::Live);
        assert_eq!(result.payload(), &kohli_test_payload());
        assert_eq!(result.note(), None);
    }

    #[tokio::test]
    async fn test_failure_with_entry_is_exact_fallback() {
        let source = Arc::new(FakeSource::failing(SourceId::EspnDirect));
        let result = agent(source, RetryPolicy::none())
            .fetch("Virat Kohli", Format::Test)
            .await;

        let expected = FallbackTable::builtin()
            .lookup("Virat Kohli", Format::Test)
            .unwrap();
        assert_eq!(result.status(), SourceStatus::Fallback);
        assert_eq!(result.payload(), &expected);
        assert!(result.note().is_some());
    }

    #[tokio::test]
    async fn test_failure_without_entry_is_failed() {
        let source = Arc::new(FakeSource::failing(SourceId::Wikipedia));
        let result = agent(source, RetryPolicy::none())
            .fetch("Unknown Player X", Format::Odi)
            .await;

        assert_eq!(result.status(), SourceStatus::Failed);
        assert!(result.payload().is_empty());
        assert!(result.note().unwrap().contains("no fallback data"));
    }

    #[tokio::test]
    async fn test_empty_live_payload_counts_as_failure() {
        let source = Arc::new(FakeSource::live(SourceId::EspnSearch, Payload::new()));
        let result = agent(source, RetryPolicy::none())
            .fetch("Unknown Player X", Format::Test)
            .await;

        assert_eq!(result.status(), SourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let source = Arc::new(FakeSource::flaky(
            SourceId::Cricbuzz,
            1,
            kohli_test_payload(),
        ));
        let retry = RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(1),
        };
        let result = agent(Arc::clone(&source), retry)
            .fetch("Virat Kohli", Format::Test)
            .await;

        assert_eq!(result.status(), SourceStatus::Live);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let source = Arc::new(FakeSource::flaky(
            SourceId::Cricbuzz,
            10,
            kohli_test_payload(),
        ));
        let retry = RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(1),
        };
        let result = agent(Arc::clone(&source), retry)
            .fetch("Virat Kohli", Format::Test)
            .await;

        assert_eq!(result.status(), SourceStatus::Fallback);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let source = Arc::new(FakeSource::failing(SourceId::Wikipedia));
        let retry = RetryPolicy {
            retries: 3,
            delay: Duration::from_millis(1),
        };
        agent(Arc::clone(&source), retry)
            .fetch("Virat Kohli", Format::Test)
            .await;

        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_retry_policy_from_config_is_capped() {
        let settings = SourcesConfig {
            retries: 9,
            retry_delay_ms: 250,
            ..SourcesConfig::default()
        };
        let policy = RetryPolicy::from_config(&settings);
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_standard_registry_order() {
        let settings = SourcesConfig::default();
        let client = http::build_client(&settings).unwrap();
        let registry =
            SourceRegistry::standard(&settings, client, Arc::new(FallbackTable::builtin()));

        let ids: Vec<SourceId> = registry.agents().iter().map(SourceAgent::id).collect();
        assert_eq!(ids, SourceId::ALL.to_vec());
    }
}
