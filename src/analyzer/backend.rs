//! Language-model completion backends.

use crate::config::ModelConfig;
use crate::error::CricketError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const OLLAMA_API_BASE: &str = "http://localhost:11434";

const SYSTEM_PROMPT: &str = "You are a cricket statistics expert. Base every figure you quote on the data provided and say when sources disagree.";

/// Which completion service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (hosted)
    #[default]
    Gemini,
    /// Ollama (local)
    Ollama,
}

impl Provider {
    fn default_api_base(self) -> &'static str {
        match self {
            Provider::Gemini => GEMINI_API_BASE,
            Provider::Ollama => OLLAMA_API_BASE,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

/// A text-completion endpoint: one prompt in, one text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, CricketError>;
}

/// Build the backend named by the model settings.
///
/// Fails before any network call when the provider needs a key and none
/// was given.
pub fn build_backend(
    settings: &ModelConfig,
    api_key: Option<String>,
) -> Result<Box<dyn CompletionBackend>, CricketError> {
    let api_base = settings
        .api_base
        .clone()
        .unwrap_or_else(|| settings.provider.default_api_base().to_string())
        .trim_end_matches('/')
        .to_string();

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()
        .map_err(|e| CricketError::Configuration(format!("cannot build HTTP client: {}", e)))?;

    match settings.provider {
        Provider::Gemini => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                CricketError::Configuration(
                    "GOOGLE_API_KEY is not set (use --api-key or the environment)".to_string(),
                )
            })?;
            Ok(Box::new(GeminiBackend {
                http_client,
                api_base,
                api_key,
                settings: settings.clone(),
            }))
        }
        Provider::Ollama => Ok(Box::new(OllamaBackend {
            http_client,
            api_base,
            settings: settings.clone(),
        })),
    }
}

fn request_error(err: reqwest::Error, settings: &ModelConfig, api_base: &str) -> CricketError {
    let message = if err.is_timeout() {
        format!("Request timed out after {}s", settings.timeout_seconds)
    } else if err.is_connect() {
        format!("Cannot connect to {} at {}", settings.provider, api_base)
    } else {
        format!("Failed to send request: {}", err)
    };
    CricketError::AnalysisBackend(message)
}

async fn check_status(
    response: reqwest::Response,
    provider: Provider,
) -> Result<reqwest::Response, CricketError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(CricketError::AnalysisBackend(format!(
        "{} API error {}: {}",
        provider, status, body
    )))
}

/// Gemini `generateContent` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Hosted Gemini model.
pub struct GeminiBackend {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    settings: ModelConfig,
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn model_name(&self) -> &str {
        &self.settings.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, CricketError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.settings.name
        );
        debug!("Sending {} byte prompt to {}", prompt.len(), url);

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(e, &self.settings, &self.api_base))?;
        let response = check_status(response, Provider::Gemini).await?;

        let body: GeminiResponse = response.json().await.map_err(|e| {
            CricketError::AnalysisBackend(format!("Failed to parse Gemini response: {}", e))
        })?;
        body.text().ok_or_else(|| {
            CricketError::AnalysisBackend("Gemini returned no candidates".to_string())
        })
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Local model served by Ollama.
pub struct OllamaBackend {
    http_client: reqwest::Client,
    api_base: String,
    settings: ModelConfig,
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.settings.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, CricketError> {
        let url = format!("{}/api/chat", self.api_base);
        debug!("Sending {} byte prompt to {}", prompt.len(), url);

        let request = OllamaChatRequest {
            model: self.settings.name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(e, &self.settings, &self.api_base))?;
        let response = check_status(response, Provider::Ollama).await?;

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            CricketError::AnalysisBackend(format!("Failed to parse Ollama response: {}", e))
        })?;
        Ok(chat_response.message.content)
    }
}
