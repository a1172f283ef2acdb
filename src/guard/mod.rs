//! Admission control.
//!
//! # Data Flow
//! ```text
//! request headers
//!     → security::identity (client id)
//!     → engine.rs (decision, reads/writes window.rs)
//!     → AdmissionResult: Allowed { remaining } | Denied(Denial)
//!
//! Background (opt-in):
//!     eviction.rs → engine.rs::evict_idle → window.rs
//! ```
//!
//! # Design Decisions
//! - Fixed windows: counters reset in jumps, bursts at boundaries are accepted
//! - One guard object per process, injected into handlers; no global state
//! - Every time-dependent operation has an `*_at(now)` form for tests
//! - Single-process only; counters are not shared across instances

pub mod decision;
pub mod engine;
pub mod eviction;
pub mod limits;
pub mod status;
pub mod window;

pub use decision::{AdmissionResult, Denial, DenyKind};
pub use engine::AdmissionGuard;
pub use eviction::IdleEvictor;
pub use limits::GuardLimits;
pub use status::{BlockedClient, StatusReport};
pub use window::{ClientObservation, ClientWindow, GlobalWindow, WindowStore};
