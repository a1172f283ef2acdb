//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (derive client id from forwarded-address headers)
//!     → guard (admission decision)
//!
//! Control surface request:
//!     → access_control.rs (bearer credential → trusted-identity check)
//! ```
//!
//! # Design Decisions
//! - No trust decisions are made from the client id; it is only a bucket key
//! - The privilege policy is injected, never read from ambient state

pub mod access_control;
pub mod identity;

pub use access_control::{Credential, PrivilegePolicy, SharedPolicy, StaticTokenPolicy};
pub use identity::{resolve_client_id, UNKNOWN_CLIENT};
