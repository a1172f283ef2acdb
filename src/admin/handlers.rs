//! REST handlers. `auth.rs` has already vetted the credential; the calls
//! below still go through the control surface so both transports share it.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::admin::control::UnblockAck;
use crate::guard::StatusReport;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::access_control::Credential;

pub async fn get_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusReport>, ApiError> {
    let report = state.control.status(Credential::from_headers(&headers))?;
    Ok(Json(report))
}

pub async fn unblock_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ip): Path<String>,
) -> Result<Json<UnblockAck>, ApiError> {
    let ack = state
        .control
        .unblock(Credential::from_headers(&headers), Some(&ip))?;
    Ok(Json(ack))
}
