//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Admission limits (windows, thresholds, block duration).
    pub limits: LimitsConfig,

    /// Control surface settings.
    pub admin: AdminConfig,

    /// Idle client eviction.
    pub eviction: EvictionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Admission limits.
///
/// All counters share one fixed window length. A client passing `client_max`
/// is rate-limited; passing `block_threshold` gets blocked for
/// `block_duration_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Window length in seconds, for both global and per-client counters.
    pub window_secs: u64,

    /// Requests per window across all clients before global overload.
    pub global_max: u64,

    /// Requests per window from one client before it is rate-limited.
    pub client_max: u64,

    /// Requests per window from one client before it is auto-blocked.
    pub block_threshold: u64,

    /// Auto-block length in seconds.
    pub block_duration_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            global_max: 1000,
            client_max: 50,
            block_threshold: 100,
            block_duration_secs: 300,
        }
    }
}

/// Control surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token identifying the administrative principal.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Idle client eviction. Off by default: client entries then live for the
/// whole process lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Enable the background eviction task.
    pub enabled: bool,

    /// Sweep interval in seconds.
    pub interval_secs: u64,

    /// How long after its window ended an unblocked client may be dropped.
    pub idle_secs: u64,

    /// Optional hard cap on tracked clients; least recently seen go first.
    pub max_tracked_clients: Option<usize>,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
            idle_secs: 600,
            max_tracked_clients: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024, // 64KB
        }
    }
}
