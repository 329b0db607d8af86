mod rate_limit;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{ConnectInfo, Json, Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use serde::{Deserialize, Serialize};
use skybot_agents::{build_assistant, AssistantConfig, FlightAssistant};
use skybot_completion::{Completion, CompletionError};
use skybot_core::FlightNumber;
use skybot_observability::{AppMetrics, MetricsSnapshot};
use skybot_storage::Store;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::rate_limit::ClientRateLimiter;

pub const DEFAULT_API_KEY: &str = "dev-skybot-key";
const MAX_QUESTION_LEN: usize = 2_000;

pub type Assistant = FlightAssistant<Store, Completion>;

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: Arc<String>,
    pub limiter: ClientRateLimiter,
    pub trust_forwarded_for: bool,
}

/// HTTP-only knobs. The assistant itself is configured by
/// [`AssistantConfig`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    /// Key the limiter on `x-forwarded-for`. Only safe behind a proxy that
    /// overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 80,
            trust_forwarded_for: false,
        }
    }
}

impl ApiSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let window_seconds = env::var("SKYBOT_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(defaults.rate_limit_window.as_secs());
        let max_requests = env::var("SKYBOT_RATE_LIMIT_MAX")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.rate_limit_max);

        Self {
            api_key: env::var("SKYBOT_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.api_key),
            rate_limit_window: Duration::from_secs(window_seconds.max(1)),
            rate_limit_max: max_requests,
            trust_forwarded_for: env::var("SKYBOT_TRUST_FORWARDED_FOR")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.trust_forwarded_for),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    completion_provider: &'static str,
    store_backend: &'static str,
    metrics: MetricsSnapshot,
}

pub async fn build_app(config: AssistantConfig, settings: ApiSettings) -> Result<Router> {
    let state = build_state(&config, settings).await?;
    Ok(build_router(state))
}

pub async fn build_state(config: &AssistantConfig, settings: ApiSettings) -> Result<ApiState> {
    let metrics = AppMetrics::shared();
    let assistant = build_assistant(config, metrics.clone()).await?;

    info!(
        completion_provider = assistant.completion_provider(),
        store_backend = assistant.store().backend_name(),
        rate_limit_max = settings.rate_limit_max,
        "flight assistant ready"
    );

    Ok(ApiState {
        assistant: Arc::new(assistant),
        metrics,
        api_key: Arc::new(settings.api_key),
        limiter: ClientRateLimiter::new(settings.rate_limit_window, settings.rate_limit_max),
        trust_forwarded_for: settings.trust_forwarded_for,
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/answer", post(answer))
        .route("/v1/flights/:flight_number", get(flight_details))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        completion_provider: state.assistant.completion_provider(),
        store_backend: state.assistant.store().backend_name(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn answer(State(state): State<ApiState>, Json(request): Json<AnswerRequest>) -> Response {
    if request.text.chars().count() > MAX_QUESTION_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_request",
                "message": format!("text must be at most {MAX_QUESTION_LEN} characters")
            })),
        )
            .into_response();
    }

    let result = match request.session_id.as_deref() {
        Some(session_id) if !session_id.trim().is_empty() => {
            state.assistant.converse(session_id, &request.text).await
        }
        _ => state.assistant.answer(&request.text).await,
    };

    match result {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(err) => answer_failure(err),
    }
}

/// Exact-match lookup. A path segment that is not a flight number gets the
/// same guidance reply as an unresolved question.
async fn flight_details(
    State(state): State<ApiState>,
    Path(flight_number): Path<String>,
) -> impl IntoResponse {
    let flight_number = FlightNumber::parse(&flight_number).ok();
    let payload = state.assistant.lookup(flight_number.as_ref()).await;
    (StatusCode::OK, Json(payload))
}

fn answer_failure(err: anyhow::Error) -> Response {
    if err.downcast_ref::<CompletionError>().is_some() {
        error!(error = %format!("{err:#}"), "completion provider failed");
        return (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": "completion_failed",
                "message": err.to_string()
            })),
        )
            .into_response();
    }

    error!(error = %format!("{err:#}"), "answer failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "internal",
            "message": err.to_string()
        })),
    )
        .into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_key(&request, state.trust_forwarded_for);
    if let Err(retry_after) = state.limiter.check(&client) {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
        let seconds = retry_after.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

/// Peer address from the connection. `x-forwarded-for` is honoured only
/// when the deployment says a proxy sets it.
fn client_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}
