//! Admission decision engine.
//!
//! # Algorithm (per request, in order)
//! ```text
//! 1. resolve client id
//! 2. blocked?  until passed → clear block, continue
//!              otherwise    → deny ClientBlocked(until - now), touch nothing
//! 3. count global
//! 4. count client
//! 5. global  > global_max      → deny GlobalOverloaded(window)
//! 6. client  > block_threshold → block for block_duration, deny ClientBlocked
//! 7. client  > client_max      → deny ClientRateLimited(window end - now)
//! 8. allow, client_max - count remaining
//! ```
//! Steps 2–7 run under the client's entry lock, so concurrent requests from
//! one client each see a distinct count. Increments from steps 3–4 are kept
//! even when the request is denied.

use arc_swap::ArcSwap;
use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::LimitsConfig;
use crate::guard::decision::{ceil_secs, AdmissionResult, Denial, DenyKind};
use crate::guard::limits::GuardLimits;
use crate::guard::status::{BlockedClient, StatusReport};
use crate::guard::window::{deadline, WindowStore};
use crate::observability::metrics;
use crate::security::identity::resolve_client_id;

/// In-process admission guard.
///
/// Construct one per process and share it behind an `Arc`.
#[derive(Debug)]
pub struct AdmissionGuard {
    store: WindowStore,
    limits: ArcSwap<GuardLimits>,
}

impl AdmissionGuard {
    pub fn new(limits: GuardLimits) -> Self {
        Self::new_at(limits, Instant::now())
    }

    /// Create a guard whose global window starts at `now`.
    pub fn new_at(limits: GuardLimits, now: Instant) -> Self {
        Self {
            store: WindowStore::new(now, limits.window),
            limits: ArcSwap::from_pointee(limits),
        }
    }

    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::new(GuardLimits::from(config))
    }

    /// Limits currently in force.
    pub fn limits(&self) -> GuardLimits {
        **self.limits.load()
    }

    /// Swap in new limits. Existing counters and blocks are kept.
    pub fn update_limits(&self, limits: GuardLimits) {
        let previous = self.limits.swap(Arc::new(limits));
        if *previous != limits {
            tracing::info!(
                window_secs = limits.window.as_secs(),
                global_max = limits.global_max,
                client_max = limits.client_max,
                block_threshold = limits.block_threshold,
                block_duration_secs = limits.block_duration.as_secs(),
                "Admission limits updated"
            );
        }
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    /// Admission check for a request, identified by its forwarded-address headers.
    pub fn check(&self, headers: &HeaderMap) -> AdmissionResult {
        let client = resolve_client_id(headers);
        self.check_client(&client)
    }

    /// Admission check for an already resolved client id.
    pub fn check_client(&self, client: &str) -> AdmissionResult {
        self.check_client_at(client, Instant::now())
    }

    pub fn check_client_at(&self, client: &str, now: Instant) -> AdmissionResult {
        let limits = self.limits();
        let window = limits.window;

        let result = self.store.with_client(client, now, window, |state| {
            if let Some(until) = state.blocked_until {
                if now >= until {
                    state.clear_block(now, window);
                    tracing::info!(client = %client, "Block expired");
                } else {
                    return AdmissionResult::Denied(Denial::new(DenyKind::ClientBlocked, until - now));
                }
            }

            let global_count = self.store.observe_global(now, window);
            let count = state.observe(now, window);
            metrics::record_global_count(global_count);

            if global_count > limits.global_max {
                return AdmissionResult::Denied(Denial::new(DenyKind::GlobalOverloaded, window));
            }

            if count > limits.block_threshold {
                state.block(deadline(now, limits.block_duration));
                metrics::record_auto_block();
                tracing::warn!(
                    client = %client,
                    count,
                    block_secs = limits.block_duration.as_secs(),
                    "Client auto-blocked"
                );
                return AdmissionResult::Denied(Denial::new(DenyKind::ClientBlocked, limits.block_duration));
            }

            if count > limits.client_max {
                let retry_after = state.window_reset_at.saturating_duration_since(now);
                return AdmissionResult::Denied(Denial::new(DenyKind::ClientRateLimited, retry_after));
            }

            AdmissionResult::Allowed {
                requests_remaining: limits.client_max - count,
            }
        });

        metrics::record_admission(result.outcome());
        if let AdmissionResult::Denied(denial) = &result {
            tracing::warn!(
                client = %client,
                kind = denial.kind.as_str(),
                retry_after_secs = denial.retry_after_secs(),
                "Admission denied"
            );
        }
        result
    }

    pub fn status(&self) -> StatusReport {
        self.status_at(Instant::now())
    }

    /// Build an operator status report as of `now`.
    pub fn status_at(&self, now: Instant) -> StatusReport {
        let limits = self.limits();
        let global = self.store.global();
        // An expired window has not rolled over yet; report it as empty.
        let global_count = if now > global.window_reset_at { 0 } else { global.count };

        let wall_now = SystemTime::now();
        let blocked = self
            .store
            .snapshot(now)
            .into_iter()
            .map(|(ip, until)| {
                let remaining = until.saturating_duration_since(now);
                BlockedClient {
                    ip,
                    blocked_until: unix_secs(wall_now.checked_add(remaining).unwrap_or(wall_now)),
                    retry_after: ceil_secs(remaining),
                }
            })
            .collect();

        let tracked_clients = self.store.active_count();
        metrics::record_tracked_clients(tracked_clients);

        StatusReport {
            global_count,
            global_limit: limits.global_max,
            blocked,
            tracked_clients,
        }
    }

    pub fn unblock(&self, client: &str) -> bool {
        self.unblock_at(client, Instant::now())
    }

    /// Lift any block on `client` and restart its window.
    ///
    /// Idempotent; returns whether a block was lifted. Unknown ids are not tracked.
    pub fn unblock_at(&self, client: &str, now: Instant) -> bool {
        let was_blocked = self.store.clear_block(client, now, self.limits().window);
        if was_blocked {
            metrics::record_manual_unblock();
        }
        tracing::info!(client = %client, was_blocked, "Client unblocked by operator");
        was_blocked
    }

    /// Drop idle client entries. Returns the number removed.
    pub fn evict_idle(&self, now: Instant, idle: Duration, max_tracked: Option<usize>) -> usize {
        let removed = self.store.evict_idle(now, idle, max_tracked);
        let tracked = self.store.active_count();
        metrics::record_tracked_clients(tracked);
        if removed > 0 {
            metrics::record_evictions(removed);
            tracing::debug!(removed, tracked, "Evicted idle clients");
        }
        removed
    }
}

fn unix_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn limits(global_max: u64, client_max: u64, block_threshold: u64) -> GuardLimits {
        GuardLimits {
            global_max,
            client_max,
            block_threshold,
            ..GuardLimits::default()
        }
    }

    fn denied(kind: DenyKind, retry_after: Duration) -> AdmissionResult {
        AdmissionResult::Denied(Denial::new(kind, retry_after))
    }

    #[test]
    fn test_client_max_then_rate_limited() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);

        for i in 1..=50 {
            assert_eq!(
                guard.check_client_at("A", start),
                AdmissionResult::Allowed { requests_remaining: 50 - i }
            );
        }
        assert_eq!(
            guard.check_client_at("A", start + secs(15)),
            denied(DenyKind::ClientRateLimited, secs(45))
        );
    }

    #[test]
    fn test_auto_block_persists_without_traffic() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);

        for _ in 0..100 {
            guard.check_client_at("A", start);
        }
        assert_eq!(
            guard.check_client_at("A", start),
            denied(DenyKind::ClientBlocked, secs(300))
        );
        assert_eq!(
            guard.check_client_at("A", start + secs(10)),
            denied(DenyKind::ClientBlocked, secs(290))
        );
        // Still blocked after the regular window has long passed.
        assert_eq!(
            guard.check_client_at("A", start + secs(200)),
            denied(DenyKind::ClientBlocked, secs(100))
        );
    }

    #[test]
    fn test_blocked_requests_touch_no_counters() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);
        for _ in 0..101 {
            guard.check_client_at("A", start);
        }
        for _ in 0..10 {
            guard.check_client_at("A", start + secs(1));
        }
        assert_eq!(guard.store().global().count, 101);
        assert_eq!(guard.store().get("A").map(|c| c.count), Some(101));
    }

    #[test]
    fn test_block_expiry_is_evaluated_fresh() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);
        for _ in 0..101 {
            guard.check_client_at("A", start);
        }

        assert_eq!(
            guard.check_client_at("A", start + secs(300)),
            AdmissionResult::Allowed { requests_remaining: 49 }
        );
        let client = guard.store().get("A").unwrap();
        assert!(!client.is_blocked());
        assert_eq!(client.window_reset_at, start + secs(360));
    }

    #[test]
    fn test_admin_unblock_starts_fresh_window() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);
        for _ in 0..101 {
            guard.check_client_at("A", start);
        }

        assert!(guard.unblock_at("A", start + secs(20)));
        assert_eq!(
            guard.check_client_at("A", start + secs(21)),
            AdmissionResult::Allowed { requests_remaining: 49 }
        );
        assert!(!guard.unblock_at("A", start + secs(22)));
    }

    #[test]
    fn test_unblock_unknown_client_is_noop() {
        let guard = AdmissionGuard::new(GuardLimits::default());
        assert!(!guard.unblock("203.0.113.9"));
        assert_eq!(guard.store().active_count(), 0);
    }

    #[test]
    fn test_global_overload_counts_attempt() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(limits(5, 50, 100), start);

        for i in 0..5 {
            assert!(guard.check_client_at(&format!("c{i}"), start).is_allowed());
        }
        assert_eq!(
            guard.check_client_at("c5", start + secs(1)),
            denied(DenyKind::GlobalOverloaded, secs(60))
        );
        assert_eq!(guard.store().global().count, 6);
        assert_eq!(guard.store().get("c5").map(|c| c.count), Some(1));
    }

    #[test]
    fn test_global_overload_takes_precedence_over_block() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(limits(2, 1, 2), start);
        for _ in 0..5 {
            guard.check_client_at("A", start);
        }
        assert!(!guard.store().get("A").unwrap().is_blocked());
    }

    #[test]
    fn test_global_window_resets_independently() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);

        guard.check_client_at("A", start);
        guard.check_client_at("B", start + secs(30));
        guard.check_client_at("B", start + secs(61));

        assert_eq!(guard.store().global().count, 1);
        assert_eq!(guard.store().get("B").map(|c| c.count), Some(2));
        assert_eq!(guard.store().get("A").map(|c| c.count), Some(1));
    }

    #[test]
    fn test_client_window_rollover_restores_quota() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(limits(1000, 2, 100), start);
        guard.check_client_at("A", start);
        guard.check_client_at("A", start);
        assert!(!guard.check_client_at("A", start).is_allowed());

        assert_eq!(
            guard.check_client_at("A", start + secs(61)),
            AdmissionResult::Allowed { requests_remaining: 1 }
        );
    }

    #[test]
    fn test_check_uses_forwarded_headers() {
        let guard = AdmissionGuard::new(limits(1000, 1, 100));
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.1"));

        assert!(guard.check(&headers).is_allowed());
        assert!(!guard.check(&headers).is_allowed());
        assert!(guard.store().get("198.51.100.4").is_some());

        // Requests without any forwarded header share one bucket.
        assert!(guard.check(&HeaderMap::new()).is_allowed());
        assert!(!guard.check(&HeaderMap::new()).is_allowed());
    }

    #[test]
    fn test_concurrent_requests_lose_no_increments() {
        const K: u64 = 64;
        let guard = AdmissionGuard::new(limits(10_000, 10, 1000));

        let denied = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..K)
                .map(|_| scope.spawn(|| guard.check_client("same")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|r| !r.is_allowed())
                .count() as u64
        });

        assert_eq!(denied, K - 10);
        assert_eq!(guard.store().get("same").map(|c| c.count), Some(K));
        assert_eq!(guard.store().global().count, K);
    }

    #[test]
    fn test_status_report() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(GuardLimits::default(), start);
        for _ in 0..101 {
            guard.check_client_at("A", start);
        }
        guard.check_client_at("B", start);

        let report = guard.status_at(start + secs(30));
        assert_eq!(report.global_count, 102);
        assert_eq!(report.global_limit, 1000);
        assert_eq!(report.tracked_clients, 2);
        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].ip, "A");
        assert_eq!(report.blocked[0].retry_after, 270);

        // Past the global window the count reads as empty.
        assert_eq!(guard.status_at(start + secs(61)).global_count, 0);
    }

    #[test]
    fn test_update_limits_applies_to_next_check() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(limits(1000, 1, 100), start);
        guard.check_client_at("A", start);
        assert!(!guard.check_client_at("A", start).is_allowed());

        guard.update_limits(limits(1000, 5, 100));
        assert_eq!(
            guard.check_client_at("A", start),
            AdmissionResult::Allowed { requests_remaining: 2 }
        );
    }

    #[test]
    fn test_oversized_block_duration_does_not_panic() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(
            GuardLimits {
                block_duration: Duration::from_secs(u64::MAX),
                ..limits(1000, 1, 2)
            },
            start,
        );

        assert!(guard.check_client_at("a", start).is_allowed());
        assert_eq!(
            guard.check_client_at("a", start).denial().map(|d| d.kind),
            Some(DenyKind::ClientRateLimited)
        );
        assert_eq!(
            guard.check_client_at("a", start).denial().map(|d| d.kind),
            Some(DenyKind::ClientBlocked)
        );
        assert_eq!(
            guard.check_client_at("a", start + secs(3600)).denial().map(|d| d.kind),
            Some(DenyKind::ClientBlocked)
        );
        assert_eq!(guard.status_at(start).blocked.len(), 1);
    }

    #[test]
    fn test_oversized_window_does_not_panic() {
        let start = Instant::now();
        let guard = AdmissionGuard::new_at(
            GuardLimits {
                window: Duration::from_secs(u64::MAX),
                ..GuardLimits::default()
            },
            start,
        );
        assert!(guard.check_client_at("a", start + secs(1)).is_allowed());
        assert_eq!(guard.status_at(start + secs(1)).global_count, 1);
    }
}
