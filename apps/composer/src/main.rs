mod composer;
mod config;
mod errors;
mod export;
mod image;
mod llm_client;
mod models;
mod persistence;
mod render;
mod routes;
mod state;
mod suggestion;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::composer::Composer;
use crate::config::Config;
use crate::export::HtmlExporter;
use crate::llm_client::{DisabledImprover, LlmClient, TextImprover};
use crate::persistence::{FileSlot, PersistenceGateway};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Composer v{}", env!("CARGO_PKG_VERSION"));

    // Hydrate the composer from the persistence slot
    let slot = FileSlot::new(&config.storage_dir)?;
    info!("Persistence slot at {}", slot.path().display());
    let composer = Composer::open(PersistenceGateway::new(Arc::new(slot)), config.default_style);

    // Suggestion service is optional
    let improver: Arc<dyn TextImprover> = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), config.suggestion_timeout)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(client)
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set, suggestions are disabled");
            Arc::new(DisabledImprover)
        }
    };

    let state = AppState {
        composer: Arc::new(Mutex::new(composer)),
        improver,
        exporter: Arc::new(HtmlExporter),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
