//! Health Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use health_agent_agent::HealthAgent;
use health_agent_config::{load_settings, Settings};
use health_agent_core::{
    IdentityVerifier, LanguageModel, ProfileStore, SearchProvider, SpeechSynthesizer,
};
use health_agent_llm::{HttpLlmBackend, LlmConfig};
use health_agent_server::{create_router, init_metrics, AppState, StaticTokenVerifier};
use health_agent_speech::{SpeechClient, SpeechConfig};
use health_agent_tools::{HttpProfileStore, HttpSearchClient, ProfileStoreConfig, SearchConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("HEALTH_AGENT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Health Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = %config.environment,
        "Configuration loaded"
    );

    if init_metrics() {
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    // External capabilities, all behind the core trait seams.
    let llm: Arc<dyn LanguageModel> = Arc::new(HttpLlmBackend::new(LlmConfig {
        model: config.llm.model.clone(),
        endpoint: config.llm.endpoint.clone(),
        api_key: config.llm.api_key.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })?);

    let search: Arc<dyn SearchProvider> = Arc::new(HttpSearchClient::new(SearchConfig {
        endpoint: config.search.endpoint.clone(),
        api_key: config.search.api_key.clone(),
        timeout: Duration::from_secs(config.search.timeout_secs),
        max_results: config.search.max_results,
    })?);

    let profiles: Arc<dyn ProfileStore> = Arc::new(HttpProfileStore::new(ProfileStoreConfig {
        endpoint: config.profile_store.endpoint.clone(),
        api_key: config.profile_store.api_key.clone(),
        timeout: Duration::from_secs(config.profile_store.timeout_secs),
    })?);

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(SpeechClient::new(SpeechConfig {
        endpoint: config.speech.endpoint.clone(),
        model: config.speech.model.clone(),
        voice: config.speech.voice.clone(),
        audio_format: config.speech.audio_format.clone(),
        api_key: config.speech.api_key.clone(),
        timeout: Duration::from_secs(config.speech.timeout_secs),
    })?);

    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(StaticTokenVerifier::new(config.auth.tokens.clone()));

    let agent = Arc::new(HealthAgent::new(llm, search));
    let state = AppState::new(config.clone(), agent, synthesizer, verifier, profiles);

    // Background reaper bounds the admission map to active identities.
    let _reaper_shutdown = state.limiter.start_reaper();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing from the observability config
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("health_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
