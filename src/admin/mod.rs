//! Operator control surface.
//!
//! `control.rs` holds the transport-independent operations; the router here
//! exposes them as REST routes behind `auth.rs`.

pub mod auth;
pub mod control;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub use control::{ControlError, ControlSurface, UnblockAck};

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/unblock/{ip}", post(unblock_client))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
