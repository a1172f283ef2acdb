//! Response bodies and error-to-status mapping.
//!
//! | Error             | Status | Discriminator |
//! |-------------------|--------|---------------|
//! | ClientRateLimited | 429    | `limited`     |
//! | ClientBlocked     | 429    | `blocked`     |
//! | GlobalOverloaded  | 503    | `overloaded`  |
//! | Unauthorized      | 401    |               |
//! | Forbidden         | 403    |               |
//! | InvalidRequest    | 400    |               |
//!
//! Denials also carry `retryAfter` (seconds) in the body and a `Retry-After` header.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::control::ControlError;
use crate::guard::{Denial, DenyKind};

/// Body of an allowed `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub allowed: bool,
    pub requests_remaining: u64,
}

impl CheckResponse {
    pub fn allowed(requests_remaining: u64) -> Self {
        Self {
            allowed: true,
            requests_remaining,
        }
    }
}

/// Body of a denied request or control-surface failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overloaded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error(transparent)]
    Control(#[from] ControlError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Denied(denial) => match denial.kind {
                DenyKind::ClientRateLimited | DenyKind::ClientBlocked => StatusCode::TOO_MANY_REQUESTS,
                DenyKind::GlobalOverloaded => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Control(ControlError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Control(ControlError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Control(ControlError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Denied(denial) => {
                let flag = Some(true);
                let mut body = ErrorBody {
                    error: denial.kind.to_string(),
                    retry_after: Some(denial.retry_after_secs()),
                    ..ErrorBody::default()
                };
                match denial.kind {
                    DenyKind::ClientRateLimited => body.limited = flag,
                    DenyKind::ClientBlocked => body.blocked = flag,
                    DenyKind::GlobalOverloaded => body.overloaded = flag,
                }
                body
            }
            ApiError::Control(e) => ErrorBody {
                error: e.to_string(),
                ..ErrorBody::default()
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.body())).into_response();
        if let ApiError::Denied(denial) = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(denial.retry_after_secs()));
        }
        response
    }
}
