//! In-process admission control.
//!
//! Decides, per incoming request, whether to admit it based on a global
//! request budget and a per-client budget, auto-blocks abusive clients for a
//! cool-down period, and exposes an authenticated control surface for
//! inspecting and clearing blocks.
//!
//! # Architecture Overview
//!
//! ```text
//!     request ──▶ http::server ──▶ http::guard_api ──┬──▶ guard::engine ──▶ guard::window
//!                     │                              │         ▲
//!                     │                              │         │
//!                     └──▶ admin (status/unblock) ───┴─▶ admin::control
//!
//!     Cross-cutting: config (TOML + hot reload), security (identity, privilege),
//!                    observability (tracing, metrics), lifecycle (startup/shutdown)
//! ```

// Core
pub mod guard;
pub mod http;

// Control surface
pub mod admin;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GuardConfig;
pub use guard::{AdmissionGuard, AdmissionResult, Denial, DenyKind, GuardLimits, StatusReport};
pub use http::GuardServer;
pub use lifecycle::Shutdown;
