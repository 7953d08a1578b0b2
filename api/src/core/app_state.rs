use std::sync::Arc;

use crate::dispatch::Dispatch;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared secret used to sign webhook bodies.
    pub webhook_secret: Arc<str>,
    /// Where accepted events go; the handler never waits for processing.
    pub dispatcher: Arc<dyn Dispatch>,
}

impl AppState {
    pub fn new(webhook_secret: impl Into<String>, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            webhook_secret: Arc::from(webhook_secret.into()),
            dispatcher,
        }
    }
}
