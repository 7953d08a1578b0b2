//! HTTP ingress for the relay: `POST /webhook` and `GET /health`.

pub mod core;
pub mod dispatch;
pub mod error_handler;
pub mod routes;
pub mod signature;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

pub use crate::core::app_state::AppState;
pub use dispatch::{Dispatch, PublishDispatcher};
pub use error_handler::{AppError, AppResult};

use crate::routes::{health_route::health_route, webhook::webhook_route::webhook_route};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook_route))
        .route("/health", get(health_route))
        .with_state(state)
}

/// Serves on `0.0.0.0:port` until Ctrl+C.
pub async fn start(port: u16, state: AppState) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(AppError::Bind)?;
    info!(%addr, "webhook server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("webhook server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        // Without a signal handler the server only stops with the process.
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
