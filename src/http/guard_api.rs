//! `POST /api/guard`: single endpoint for checks and control actions.
//!
//! Body: `{"action": "check" | "status" | "unblock", "ip": "<client id>"}`.
//! A missing or unparsable body is treated as a `check`, so malformed input
//! never bypasses admission.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::{ApiError, CheckResponse};
use crate::http::server::AppState;
use crate::security::access_control::Credential;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardAction {
    #[default]
    Check,
    Status,
    Unblock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GuardRequest {
    #[serde(default)]
    pub action: GuardAction,
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl GuardRequest {
    /// Parse a request body, falling back to a plain `check`.
    pub fn parse(body: &[u8]) -> Self {
        if body.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Unparsable guard request body, treating as check");
            Self::default()
        })
    }
}

pub async fn guard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = GuardRequest::parse(&body);
    let credential = Credential::from_headers(&headers);

    match request.action {
        GuardAction::Check => {
            let remaining = state.guard.check(&headers).into_result()?;
            Ok(Json(CheckResponse::allowed(remaining)).into_response())
        }
        GuardAction::Status => {
            let report = state.control.status(credential)?;
            Ok(Json(report).into_response())
        }
        GuardAction::Unblock => {
            let ack = state.control.unblock(credential, request.ip.as_deref())?;
            Ok(Json(ack).into_response())
        }
    }
}
