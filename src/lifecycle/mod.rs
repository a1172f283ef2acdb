//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Metrics → Guard + policy → Evictor / reload tasks → Listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Server drains → Background tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, run_with_shutdown, StartupError, StartupOptions};
