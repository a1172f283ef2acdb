//! Runtime admission limits.

use std::time::Duration;

use crate::config::LimitsConfig;

/// Limits the decision engine evaluates against, with durations resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardLimits {
    pub window: Duration,
    pub global_max: u64,
    pub client_max: u64,
    pub block_threshold: u64,
    pub block_duration: Duration,
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for GuardLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            global_max: config.global_max,
            client_max: config.client_max,
            block_threshold: config.block_threshold,
            block_duration: Duration::from_secs(config.block_duration_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = GuardLimits::default();
        assert_eq!(limits.window, Duration::from_secs(60));
        assert_eq!(limits.global_max, 1000);
        assert_eq!(limits.client_max, 50);
        assert_eq!(limits.block_threshold, 100);
        assert_eq!(limits.block_duration, Duration::from_secs(300));
    }
}
