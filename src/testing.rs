//! Test doubles for sources and the completion backend.

use crate::analyzer::CompletionBackend;
use crate::error::{CricketError, SourceError};
use crate::models::{Format, Payload, PlayerInfo, SourceId};
use crate::sources::{PlayerDirectory, StatSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn payload(pairs: &[(&str, &str)]) -> Payload {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A live Test payload that differs from the fallback entry.
pub fn kohli_test_payload() -> Payload {
    payload(&[("matches", "123"), ("runs", "9230"), ("average", "46.85")])
}

/// A source with scripted behaviour.
pub struct FakeSource {
    id: SourceId,
    payload: Option<Payload>,
    transient_failures: u32,
    delay: Duration,
    calls: AtomicU32,
}

impl FakeSource {
    /// Always returns `payload`.
    pub fn live(id: SourceId, payload: Payload) -> Self {
        Self {
            id,
            payload: Some(payload),
            transient_failures: 0,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// Always fails with a not-found error.
    pub fn failing(id: SourceId) -> Self {
        Self {
            payload: None,
            ..Self::live(id, Payload::new())
        }
    }

    /// Fails with HTTP 503 for the first `failures` calls, then succeeds.
    pub fn flaky(id: SourceId, failures: u32, payload: Payload) -> Self {
        Self {
            transient_failures: failures,
            ..Self::live(id, payload)
        }
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatSource for FakeSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch_live(&self, player: &str, _format: Format) -> Result<Payload, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.transient_failures {
            return Err(SourceError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        self.payload
            .clone()
            .ok_or_else(|| SourceError::NotFound(player.to_string()))
    }
}

/// A directory matching against fixed names, or failing when `names` is `None`.
pub struct FakeDirectory {
    pub names: Option<Vec<String>>,
}

#[async_trait]
impl PlayerDirectory for FakeDirectory {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let query = query.to_lowercase();
        match &self.names {
            Some(names) => Ok(names
                .iter()
                .filter(|name| name.to_lowercase().contains(&query))
                .take(limit)
                .cloned()
                .collect()),
            None => Err(SourceError::Status(StatusCode::FORBIDDEN)),
        }
    }

    async fn basic_info(&self, player: &str) -> Result<PlayerInfo, SourceError> {
        let name = self
            .search(player, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(player.to_string()))?;
        Ok(PlayerInfo {
            name: Some(name),
            role: Some("Batter".to_string()),
            team: None,
        })
    }
}

/// A completion backend that records prompts.
pub struct FakeBackend {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CricketError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(CricketError::AnalysisBackend)
    }
}
