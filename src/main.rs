//! Triage Desk - hospital intake assistant
//!
//! A Rust backend that walks patients through a slot-filling conversation,
//! routes them to a ward, stores the record and notifies staff.

mod api;
mod completion;
mod config;
mod db;
mod prompts;
mod runtime;
mod slots;
mod state_machine;
mod triage;
mod webhook;

use api::{create_router, AppState};
use completion::CompletionHandler;
use config::Config;
use db::Database;
use runtime::{DatabaseStore, ProductionManager, SessionManager};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook::WebhookNotifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage_desk=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let notifier = WebhookNotifier::new(config.webhook_url.clone(), config.webhook_timeout)?;
    if notifier.is_enabled() {
        tracing::info!("Webhook notifications enabled");
    } else {
        tracing::warn!("WEBHOOK_URL not set; completed intakes will not be forwarded");
    }

    let completion = CompletionHandler::new(DatabaseStore::new(db), notifier)
        .with_timeouts(config.persist_timeout, config.webhook_timeout);
    let sessions: Arc<ProductionManager> =
        Arc::new(SessionManager::new(completion, config.session_limits()));
    let cleanup = sessions.start_cleanup_task();

    let state = AppState::new(sessions);

    let cors = match &config.cors_allowed_origins {
        None => CorsLayer::new().allow_origin(Any),
        Some(origins) => {
            let origins = origins
                .iter()
                .map(|o| o.parse::<axum::http::HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?;
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Triage Desk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    cleanup.cancel();
    Ok(())
}
