use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::access_control::Credential;

/// Rejects requests whose credential is missing (401) or untrusted or malformed (403).
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    state.control.authorize(Credential::from_headers(request.headers()))?;
    Ok(next.run(request).await)
}
