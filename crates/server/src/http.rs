//! HTTP Endpoints
//!
//! REST API for the health assistant.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Json, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use health_agent_agent::{ChatReply, GeneralReply};
use health_agent_core::{ChatRequest, ChatTurn, Error, TurnRole};

use crate::auth::authenticate;
use crate::metrics::{self, metrics_handler};
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let (cors_enabled, cors_origins) = {
        let config = state.config.read();
        (config.server.cors_enabled, config.server.cors_origins.clone())
    };
    let cors_layer = build_cors_layer(&cors_origins, cors_enabled);

    Router::new()
        // Conversational pipeline
        .route("/api/chat", post(chat))
        // Streamed speech synthesis
        .route("/api/speech", post(speech))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns a permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000 for safety
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// One turn of inbound chat history
#[derive(Debug, Deserialize)]
struct WireChatTurn {
    role: TurnRole,
    content: String,
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    message: String,
    #[serde(default)]
    chat_history: Vec<WireChatTurn>,
}

/// Error payload; `reset_in` is present on rate-limit rejections
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_in: Option<u64>,
}

fn error_response(err: ServerError) -> Response {
    let reset_in = match &err {
        ServerError::RateLimited { reset_in } => Some(*reset_in),
        _ => None,
    };
    let body = ErrorBody {
        error: err.to_string(),
        reset_in,
    };
    (StatusCode::from(err), Json(body)).into_response()
}

/// Chat endpoint: admission control, intent routing, validated generation
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequestBody>,
) -> Response {
    // Fail fast, before any generation work begins.
    let identity = match authenticate(&state, &headers).await {
        Ok(identity) => identity,
        Err(err) => return error_response(err),
    };

    match state.limiter.check_and_consume(&identity) {
        RateLimitDecision::Allowed => {}
        RateLimitDecision::Limited { reset_in } => {
            metrics::record_rate_limited();
            tracing::warn!(identity = %identity, reset_in, "Request rejected by admission control");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody {
                    error: "rate limit exceeded".to_string(),
                    reset_in: Some(reset_in),
                }),
            )
                .into_response();
        }
    }

    // Profile enrichment is best-effort: the store is an external
    // collaborator and a failed read never blocks the turn.
    let profile = match state.profiles.fetch(&identity).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(identity = %identity, error = %e, "Profile fetch failed, continuing without profile");
            None
        }
    };

    let history: Vec<ChatTurn> = body
        .chat_history
        .into_iter()
        .map(|turn| ChatTurn::new(turn.role, turn.content))
        .collect();

    let mut request = ChatRequest::new(body.message).with_history(history);
    if let Some(profile) = profile {
        request = request.with_profile(profile);
    }

    let started = Instant::now();
    match state.agent.respond(&request).await {
        Ok(reply) => {
            metrics::record_generation_latency(started.elapsed().as_secs_f64());
            metrics::record_chat_request(match &reply {
                ChatReply::General(_) => "general",
                ChatReply::Medicine(_) => "medicine",
            });
            Json(reply).into_response()
        }
        Err(e) => {
            // Terminal generator failure: the user sees the fixed fallback
            // message, the cause stays in the log.
            metrics::record_generation_failure();
            tracing::error!(identity = %identity, error = %e, "Generation failed");
            Json(ChatReply::General(GeneralReply {
                response: Error::FALLBACK_MESSAGE.to_string(),
            }))
            .into_response()
        }
    }
}

/// Speech request
#[derive(Debug, Deserialize)]
struct SpeechRequestBody {
    text: String,
}

/// Streamed speech synthesis endpoint.
///
/// The response body is chunked audio produced incrementally by the
/// synthesizer; the client can start playback before synthesis completes.
async fn speech(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SpeechRequestBody>,
) -> Response {
    if let Err(err) = authenticate(&state, &headers).await {
        return error_response(err);
    }

    metrics::record_speech_request();

    let stream = state
        .synthesizer
        .synthesize(&body.text)
        .map(|chunk| chunk.map(|c| axum::body::Bytes::from(c.data)));

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from_stream(stream))
        .unwrap()
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "tracked_identities": state.limiter.tracked_identities(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    use health_agent_agent::HealthAgent;
    use health_agent_config::Settings;
    use health_agent_core::{
        AudioStream, GenerateRequest, GenerateResponse, HealthProfile, IdentityVerifier,
        LanguageModel, ProfileStore, SearchProvider, SearchResult, SpeechSynthesizer,
    };

    struct StubLlm;

    #[async_trait]
    impl LanguageModel for StubLlm {
        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> health_agent_core::Result<GenerateResponse> {
            Ok(GenerateResponse::text(r#"{"should_route":false}"#))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubSearch;

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, _query: &str) -> health_agent_core::Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    struct StubSynth;

    impl SpeechSynthesizer for StubSynth {
        fn synthesize(&self, _text: &str) -> AudioStream {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubVerifier;

    #[async_trait]
    impl IdentityVerifier for StubVerifier {
        async fn verify(&self, _token: &str) -> health_agent_core::Result<String> {
            Ok("u1".to_string())
        }
    }

    struct StubProfiles;

    #[async_trait]
    impl ProfileStore for StubProfiles {
        async fn fetch(&self, _user_id: &str) -> health_agent_core::Result<Option<HealthProfile>> {
            Ok(None)
        }
    }

    fn test_state() -> AppState {
        let llm: Arc<dyn LanguageModel> = Arc::new(StubLlm);
        let agent = Arc::new(HealthAgent::new(llm, Arc::new(StubSearch)));
        AppState::new(
            Settings::default(),
            agent,
            Arc::new(StubSynth),
            Arc::new(StubVerifier),
            Arc::new(StubProfiles),
        )
    }

    #[test]
    fn test_router_creation() {
        let _ = create_router(test_state());
    }

    #[test]
    fn test_rate_limit_error_body() {
        let body = ErrorBody {
            error: "rate limit exceeded".to_string(),
            reset_in: Some(1800),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "rate limit exceeded");
        assert_eq!(json["reset_in"], 1800);
    }

    #[test]
    fn test_plain_error_body_omits_reset() {
        let body = ErrorBody {
            error: "Authentication error: Invalid token".to_string(),
            reset_in: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("reset_in").is_none());
    }

    #[test]
    fn test_chat_request_body_parsing() {
        let body: ChatRequestBody = serde_json::from_str(
            r#"{
                "message": "What is paracetamol used for?",
                "chat_history": [
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hello" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(body.chat_history.len(), 2);
        assert!(matches!(body.chat_history[0].role, TurnRole::User));
    }
}
