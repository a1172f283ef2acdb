//! Point-in-time view of guard state for operators.

use serde::{Deserialize, Serialize};

/// Snapshot returned by the control surface's `status` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Requests counted in the current global window.
    pub global_count: u64,
    pub global_limit: u64,
    /// Currently blocked clients, soonest unblock first.
    pub blocked: Vec<BlockedClient>,
    /// Distinct client identifiers tracked.
    pub tracked_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedClient {
    pub ip: String,
    /// Wall-clock unblock time, seconds since the Unix epoch.
    pub blocked_until: u64,
    /// Seconds until the block lifts, rounded up.
    pub retry_after: u64,
}
