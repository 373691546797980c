//! HTTP route handlers for the facilitator API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use super::state::AppState;
use crate::discussion::{ConclusionSections, DiscussionRequest};
use crate::error::{FacilitatorError, FacilitatorResult};
use crate::rate_limit::{Admission, Endpoint};

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/generate-conclusion", post(generate_conclusion))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

/// Chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Facilitator reply.
    pub response: String,
}

/// Conclusion response.
#[derive(Debug, Serialize)]
pub struct ConclusionResponse {
    /// Raw markdown conclusion.
    pub conclusion: String,
    /// Section name to bullets, in encounter order.
    pub structured: ConclusionSections,
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model": state.service.model(),
        "available_keys": state.service.available_keys(),
        "site": state.site_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Handle facilitation requests.
async fn chat(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<DiscussionRequest>, JsonRejection>,
) -> FacilitatorResult<Response> {
    let admission = state.governor.check(&client_identity(addr), Endpoint::Chat)?;
    let request = parse_body(payload)?;

    let response = state.service.facilitate(&request).await?;

    Ok((rate_limit_headers(admission), Json(ChatResponse { response })).into_response())
}

/// Handle conclusion requests.
async fn generate_conclusion(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<DiscussionRequest>, JsonRejection>,
) -> FacilitatorResult<Response> {
    let admission = state
        .governor
        .check(&client_identity(addr), Endpoint::Conclusion)?;
    let request = parse_body(payload)?;

    let conclusion = state.service.conclude(&request).await?;

    Ok((
        rate_limit_headers(admission),
        Json(ConclusionResponse {
            conclusion: conclusion.text,
            structured: conclusion.sections,
        }),
    )
        .into_response())
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Endpoint not found" })),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed", "retry": false })),
    )
}

/// Rate limits are keyed on the remote IP, not on the caller-supplied user id.
fn client_identity(addr: SocketAddr) -> String {
    addr.ip().to_string()
}

fn parse_body(payload: Result<Json<DiscussionRequest>, JsonRejection>) -> FacilitatorResult<DiscussionRequest> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        FacilitatorError::InvalidRequest("Invalid request format".to_string())
    })
}

fn rate_limit_headers(admission: Admission) -> [(&'static str, String); 2] {
    [
        ("x-ratelimit-limit", admission.limit.to_string()),
        ("x-ratelimit-remaining", admission.remaining.to_string()),
    ]
}

impl IntoResponse for FacilitatorError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let retry = self.is_retryable();

        let body = match &self {
            Self::InvalidRequest(message) => serde_json::json!({
                "error": message,
                "retry": retry,
            }),
            Self::RateLimited {
                window,
                retry_after_secs,
            } => serde_json::json!({
                "error": "Too many requests",
                "message": "Please wait before making new requests",
                "window": window,
                "retry_after": retry_after_secs,
                "retry": retry,
            }),
            Self::ProviderExhausted { .. } => serde_json::json!({
                "error": "All AI services are currently unavailable",
                "retry": retry,
            }),
            Self::StructuralValidationFailed { missing } => serde_json::json!({
                "error": "Generated conclusion did not follow the required format",
                "missing_sections": missing,
                "retry": retry,
            }),
            Self::Config(err) => {
                tracing::error!(error = %err, "Configuration error while serving request");
                serde_json::json!({
                    "error": "Server misconfigured",
                    "retry": retry,
                })
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
