//! HTTP service exposing search and referral redirects.
//!
//! Search failures travel in the response body with status 200; only a
//! missing keyword is a 400. The redirect endpoint always answers with a
//! redirect once its parameters are valid.

mod handlers;
mod routes;

pub use routes::create_router;

use crate::affiliate::AffiliateResolver;
use crate::search::SearchOrchestrator;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub resolver: Arc<AffiliateResolver>,
}

impl AppState {
    pub fn new(orchestrator: SearchOrchestrator, resolver: AffiliateResolver) -> Self {
        Self { orchestrator: Arc::new(orchestrator), resolver: Arc::new(resolver) }
    }
}

/// Serves until Ctrl-C.
pub async fn serve(state: AppState, listen_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr =
        listen_addr.parse().with_context(|| format!("Invalid listen address: {}", listen_addr))?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
