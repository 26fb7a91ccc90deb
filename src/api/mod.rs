//! API layer - JSON over HTTP for the Trust Flow back office and customer portal
//!
//! Handlers are thin: they extract the owner and inputs, call into [`crate::core`], and
//! serialize the result. Errors become `{"error": ...}` bodies with a matching status.

/// HTTP status mapping of crate errors
pub mod error;
/// Request extractors (owner header)
pub mod extract;
/// Route handlers grouped by entity
pub mod routes;

use crate::core::notify::Notifier;
use crate::errors::Result;
use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared data available to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection for all database operations
    pub db: Arc<DatabaseConnection>,
    /// Where step completion notifications go
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Creates the state from a connection and a notifier.
    #[must_use]
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db: Arc::new(db),
            notifier,
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::dashboard::routes())
        .merge(routes::customers::routes())
        .merge(routes::applications::routes())
        .merge(routes::templates::routes())
        .merge(routes::providers::routes())
        .merge(routes::quotations::routes())
        .merge(routes::invoices::routes())
        .merge(routes::ledger::routes())
        .merge(routes::staff::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .merge(routes::portal::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Serves the API until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
