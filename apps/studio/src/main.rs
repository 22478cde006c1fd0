mod chat;
mod config;
mod document;
mod errors;
mod llm_client;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::orchestrator::Orchestrator;
use crate::chat::retry::RetryPolicy;
use crate::config::Config;
use crate::llm_client::HttpGenerationClient;
use crate::routes::build_router;
use crate::session::credentials::CredentialStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Studio v{}", env!("CARGO_PKG_VERSION"));

    let credentials = match &config.credential_file {
        Some(path) => CredentialStore::open(path)?,
        None => {
            info!("CREDENTIAL_FILE not set; credential kept in memory");
            CredentialStore::in_memory()
        }
    };

    let client = HttpGenerationClient::new(&config.generation_url, config.request_timeout)?;
    info!("Generation client initialized ({})", config.generation_url);

    let policy = RetryPolicy {
        backoff: config.server_retry_delay,
        ..RetryPolicy::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(client), policy);

    let state = AppState::new(config.clone(), credentials, orchestrator);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
