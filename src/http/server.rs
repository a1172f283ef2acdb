//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the guard endpoint, health and admin routes
//! - Wire up middleware (tracing, request id, timeout, body limit)
//! - Serve until the shutdown signal fires

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, ControlSurface};
use crate::config::GuardConfig;
use crate::guard::AdmissionGuard;
use crate::http::guard_api::guard_handler;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::security::access_control::SharedPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<AdmissionGuard>,
    pub control: ControlSurface,
}

impl AppState {
    pub fn new(guard: Arc<AdmissionGuard>, policy: SharedPolicy) -> Self {
        let control = ControlSurface::new(guard.clone(), policy);
        Self { guard, control }
    }
}

/// HTTP server exposing the guard.
pub struct GuardServer {
    router: Router,
}

impl GuardServer {
    /// Create a new HTTP server around an existing guard.
    pub fn new(config: &GuardConfig, guard: Arc<AdmissionGuard>, policy: SharedPolicy) -> Self {
        let state = AppState::new(guard, policy);
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout sits directly on the routes; its inner body must be `Default`.
    #[allow(deprecated)]
    fn build_router(config: &GuardConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/guard", post(guard_handler))
            .route("/health", get(health_handler))
            .with_state(state.clone())
            .merge(setup_admin_router(state))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::security::access_control::StaticTokenPolicy;

    fn server(max_body_size: usize) -> GuardServer {
        let mut config = GuardConfig::default();
        config.security.max_body_size = max_body_size;
        let guard = Arc::new(AdmissionGuard::from_config(&config.limits));
        GuardServer::new(&config, guard, Arc::new(StaticTokenPolicy::new("admin")))
    }

    #[tokio::test]
    async fn test_layered_router_serves_guard_endpoint() {
        let request = Request::post("/api/guard")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::from(r#"{"action":"check"}"#))
            .unwrap();

        let response = server(1024).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let body = vec![b'x'; 64];
        let request = Request::post("/api/guard")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = server(16).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
