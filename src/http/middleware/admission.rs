//! Admission middleware for downstream routers.
//!
//! Wrap any router with `axum::middleware::from_fn_with_state(guard,
//! admission_middleware)` to run the guard as a pre-check. Denied requests
//! never reach the inner handler.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::guard::{AdmissionGuard, AdmissionResult};
use crate::http::response::ApiError;

pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

pub async fn admission_middleware(
    State(guard): State<Arc<AdmissionGuard>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match guard.check(request.headers()) {
        AdmissionResult::Allowed { requests_remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(X_RATELIMIT_REMAINING, HeaderValue::from(requests_remaining));
            response
        }
        AdmissionResult::Denied(denial) => ApiError::from(denial).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardLimits;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn protected(guard: Arc<AdmissionGuard>) -> Router {
        Router::new()
            .route("/orders", get(|| async { "orders" }))
            .layer(middleware::from_fn_with_state(guard, admission_middleware))
    }

    fn request() -> Request<Body> {
        Request::builder()
            .uri("/orders")
            .header("x-real-ip", "192.0.2.10")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_allowed_request_reaches_handler() {
        let guard = Arc::new(AdmissionGuard::new(GuardLimits::default()));
        let response = protected(guard).oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "49");
    }

    #[tokio::test]
    async fn test_denied_request_short_circuits() {
        let guard = Arc::new(AdmissionGuard::new(GuardLimits {
            client_max: 1,
            ..GuardLimits::default()
        }));
        let app = protected(guard);

        assert_eq!(app.clone().oneshot(request()).await.unwrap().status(), StatusCode::OK);
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }
}
