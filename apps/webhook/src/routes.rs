//! The webhook endpoint: method gate, secret-token check, processor
//! dispatch, and outcome-to-response mapping.
//!
//! The contract over the wire stays deliberately flat. Telegram only ever
//! sees 200/401/500 with a plain-text body; the structured failure reason
//! lives in logs and metrics.

use crate::reqid;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
};
use botgate_processor::UpdateProcessor;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const WEBHOOK_PATH: &str = "/telegram/webhook";

pub const NON_POST_BODY: &str = "Send POST request to use the bot.";
pub const OK_BODY: &str = "OK";
pub const FAILURE_BODY: &str = "Error processing update";

const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<dyn UpdateProcessor>,
    pub secret_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, any(handle_update))
        .layer(middleware::from_fn(reqid::with_request_id))
        .with_state(state)
}

fn secret_token_valid(expected: &Option<String>, provided: Option<&str>) -> bool {
    match expected {
        Some(exp) => provided == Some(exp.as_str()),
        None => true,
    }
}

async fn handle_update(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        // Browsers, probes, and health checks get a friendly 200 so
        // monitoring does not flag the endpoint as broken.
        return (StatusCode::OK, NON_POST_BODY).into_response();
    }

    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_token_valid(&state.secret_token, provided) {
        warn!("telegram secret token mismatch");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // Raw bytes, not a `String` extractor: invalid UTF-8 must reach the
    // processor and fail there, not bounce off the extractor as a 400.
    let body = String::from_utf8_lossy(&body);

    match state.processor.process(&body).await {
        Ok(processed) => {
            metrics::counter!("updates_processed_total", "outcome" => "ok").increment(1);
            info!(with_output = processed.output.is_some(), "update processed");
            let body = processed.output.unwrap_or_else(|| OK_BODY.to_string());
            (StatusCode::OK, body).into_response()
        }
        Err(err) => {
            metrics::counter!("updates_processed_total", "outcome" => err.kind()).increment(1);
            error!(error = %err, kind = err.kind(), "update processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
        }
    }
}
