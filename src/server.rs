//! HTTP JSON API.
//!
//! Routes:
//! - `GET /health`
//! - `GET /api/tools`, `POST /api/tools/:name`
//! - `POST /api/analyze`, `POST /api/compare`, `POST /api/ask`
//!
//! Each request gets a child of the server's shutdown token and is
//! bounded by the configured request timeout.

use crate::error::CricketError;
use crate::models::{Focus, Format, Query};
use crate::service::{AnalysisOutcome, CricketService};
use crate::tools::{get_tool_definitions, ToolDefinition, ToolExecutor, ToolResult};
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    service: CricketService,
    tools: ToolExecutor,
    shutdown: CancellationToken,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        service: CricketService,
        shutdown: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            tools: ToolExecutor::new(service.clone()),
            service,
            shutdown,
            request_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub analysis_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub player: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub focus: Focus,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub player1: String,
    pub player2: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub focus: Focus,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

/// An error response: `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CricketError> for ApiError {
    fn from(err: CricketError) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            CricketError::AnalysisBackend(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(call_tool))
        .route("/api/analyze", post(analyze))
        .route("/api/compare", post(compare))
        .route("/api/ask", post(ask))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let shutdown = state.shutdown.clone();
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    info!("HTTP server listening on http://{}", bind);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Run `work` with a per-request cancellation token under the timeout.
async fn bounded<T, F, Fut>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, CricketError>>,
{
    let cancel = state.shutdown.child_token();
    match tokio::time::timeout(state.request_timeout, work(cancel.clone())).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            cancel.cancel();
            warn!("Request timed out after {:?}", state.request_timeout);
            Err(ApiError {
                status: StatusCode::GATEWAY_TIMEOUT,
                message: format!(
                    "request timed out after {}s",
                    state.request_timeout.as_secs()
                ),
            })
        }
    }
}

fn parse_format(format: Option<&str>, default: Format) -> Result<Format, CricketError> {
    match format {
        Some(f) => f.parse(),
        None => Ok(default),
    }
}

fn outcome_status(outcome: &AnalysisOutcome) -> StatusCode {
    match outcome {
        AnalysisOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        analysis_available: state.service.has_analyzer(),
    })
}

async fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(get_tool_definitions())
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    args: Option<Json<Value>>,
) -> Result<Json<ToolResult>, ApiError> {
    let args = args.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    let tools = state.tools.clone();
    let result = bounded(&state, |cancel| async move {
        Ok(tools.execute(&name, &args, &cancel).await)
    })
    .await?;
    Ok(Json(result))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    let format = parse_format(request.format.as_deref(), state.service.default_format())?;
    let query = Query::new(&request.player, format)?;
    let service = state.service.clone();

    let analysis = bounded(&state, |cancel| async move {
        service.analyze_player(&query, request.focus, &cancel).await
    })
    .await?;
    Ok((outcome_status(&analysis.outcome), Json(analysis)).into_response())
}

async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Response, ApiError> {
    let format = parse_format(request.format.as_deref(), state.service.default_format())?;
    let service = state.service.clone();

    let comparison = bounded(&state, |cancel| async move {
        service
            .compare_players(&request.player1, &request.player2, format, request.focus, &cancel)
            .await
    })
    .await?;
    Ok((outcome_status(&comparison.outcome), Json(comparison)).into_response())
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let service = state.service.clone();

    let answer = bounded(&state, |cancel| async move {
        service.ask(&request.query, &cancel).await
    })
    .await?;
    Ok((outcome_status(answer.outcome()), Json(answer)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{standard_sources, test_service};
    use crate::testing::FakeBackend;
    use std::sync::Arc;

    fn state(backend: Option<FakeBackend>) -> AppState {
        AppState::new(
            test_service(backend.map(Arc::new), standard_sources()),
            CancellationToken::new(),
            Duration::from_secs(5),
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health(State(state(None))).await;
        assert_eq!(health.status, "healthy");
        assert!(!health.analysis_available);
    }

    #[tokio::test]
    async fn test_analyze_ok() {
        let request = AnalyzeRequest {
            player: "Virat Kohli".to_string(),
            format: Some("test".to_string()),
            focus: Focus::Overall,
        };
        let response = analyze(State(state(Some(FakeBackend::replying("great")))), Json(request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"]["status"], "completed");
        assert_eq!(body["outcome"]["text"], "great");
        assert_eq!(body["report"]["successful"], 4);
    }

    #[tokio::test]
    async fn test_analyze_backend_failure_is_502_with_report() {
        let request = AnalyzeRequest {
            player: "Virat Kohli".to_string(),
            format: Some("test".to_string()),
            focus: Focus::Overall,
        };
        let response = analyze(State(state(Some(FakeBackend::failing("down")))), Json(request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["outcome"]["error"], "down");
        assert_eq!(body["report"]["total"], 4);
    }

    #[tokio::test]
    async fn test_analyze_invalid_format() {
        let request = AnalyzeRequest {
            player: "Virat Kohli".to_string(),
            format: Some("hundred".to_string()),
            focus: Focus::Overall,
        };
        let err = analyze(State(state(Some(FakeBackend::replying("x")))), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_call_tool() {
        let Json(result) = call_tool(
            State(state(None)),
            Path("search_players".to_string()),
            Some(Json(json!({"query": "ponting"}))),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.output["players"][0], "Ricky Ponting");
    }

    #[tokio::test]
    async fn test_ask_comparison() {
        let request = AskRequest {
            query: "Virat Kohli vs Ricky Ponting".to_string(),
        };
        let response = ask(State(state(Some(FakeBackend::replying("both good")))), Json(request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "comparison");
        assert_eq!(body["second"]["query"]["player"], "Ricky Ponting");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let state = state(Some(FakeBackend::replying("x")));
        state.shutdown.cancel();
        let request = AnalyzeRequest {
            player: "Virat Kohli".to_string(),
            format: None,
            focus: Focus::Overall,
        };
        let err = analyze(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
