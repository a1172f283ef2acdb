//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request id)
//!     → guard_api.rs (POST /api/guard: check | status | unblock)
//!       or admin routes (crate::admin)
//!     → response.rs (status codes, JSON bodies, Retry-After)
//!
//! Downstream routers:
//!     → middleware/admission.rs (guard pre-check) → inner handler
//! ```

pub mod guard_api;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{ApiError, CheckResponse, ErrorBody};
pub use server::{AppState, GuardServer};
