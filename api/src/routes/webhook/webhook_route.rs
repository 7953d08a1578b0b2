use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::webhook::webhook_request::WebhookRequest,
    signature::{SIGNATURE_HEADER, verify_signature},
};

#[derive(Debug, Serialize)]
pub struct WebhookAccepted {
    pub project: String,
    pub branch: String,
    pub branch_type: &'static str,
}

/// Receives an analysis-complete webhook.
///
/// The raw body is authenticated with HMAC-SHA256 before it is decoded. On
/// success the publish cycle is queued and the handler returns at once; the
/// outcome of processing only shows up in logs.
#[instrument(name = "webhook_route", skip_all, fields(len = body.len()))]
pub async fn webhook_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    // --- Authenticate -----------------------------------------------------------
    let Some(provided) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
    else {
        warn!("webhook without signature header");
        return Err(AppError::Unauthorized("missing signature"));
    };

    if !verify_signature(&body, provided, state.webhook_secret.as_bytes()) {
        warn!("webhook signature mismatch");
        return Err(AppError::Unauthorized("invalid signature"));
    }

    // --- Decode -----------------------------------------------------------------
    let request = WebhookRequest::from_slice(&body)?;
    debug!(status = ?request.status, "webhook decoded");
    let target = request.into_target()?;

    // --- Enqueue ----------------------------------------------------------------
    let accepted = WebhookAccepted {
        project: target.project.clone(),
        branch: target.branch.clone(),
        branch_type: target.branch_type.as_str(),
    };

    state.dispatcher.dispatch(target).map_err(|_| {
        warn!(project = %accepted.project, "work queue closed, rejecting webhook");
        AppError::Unavailable
    })?;

    info!(
        project = %accepted.project,
        branch = %accepted.branch,
        branch_type = accepted.branch_type,
        "publish cycle queued"
    );

    Ok(ApiResponse::success(accepted).into_response_with_status(StatusCode::OK))
}
