//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and cross-field rules.
//! Returns every problem found, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GuardConfig;

/// Longest duration any setting may name: ten years.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max} seconds, got {value}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("limits.block_threshold ({threshold}) must not be below limits.client_max ({client_max})")]
    ThresholdBelowClientMax { threshold: u64, client_max: u64 },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must not be empty")]
    EmptyApiKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let limits = &config.limits;

    let non_zero = [
        ("limits.window_secs", limits.window_secs),
        ("limits.global_max", limits.global_max),
        ("limits.client_max", limits.client_max),
        ("limits.block_threshold", limits.block_threshold),
        ("limits.block_duration_secs", limits.block_duration_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let durations = [
        ("limits.window_secs", limits.window_secs),
        ("limits.block_duration_secs", limits.block_duration_secs),
        ("eviction.interval_secs", config.eviction.interval_secs),
        ("eviction.idle_secs", config.eviction.idle_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in durations {
        if value > MAX_DURATION_SECS {
            errors.push(ValidationError::TooLarge {
                field,
                value,
                max: MAX_DURATION_SECS,
            });
        }
    }

    if limits.block_threshold < limits.client_max {
        errors.push(ValidationError::ThresholdBelowClientMax {
            threshold: limits.block_threshold,
            client_max: limits.client_max,
        });
    }

    if config.eviction.enabled && config.eviction.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "eviction.interval_secs" });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
