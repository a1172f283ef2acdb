//! Fixed-window counter state.
//!
//! # Responsibilities
//! - Hold the process-wide global window
//! - Hold one window per client identifier, created lazily
//! - Expose atomic read-modify-write operations on both
//!
//! # Locking
//! Client windows live in a sharded `DashMap`; each operation on a client
//! holds that entry's shard lock for its full duration. The global window has
//! its own mutex. The global lock may be taken while a client entry is held,
//! never the other way around.

use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Stand-in deadline when `Instant + Duration` would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `at + span`, clamped to a far-future instant instead of panicking.
pub(crate) fn deadline(at: Instant, span: Duration) -> Instant {
    at.checked_add(span)
        .or_else(|| at.checked_add(FAR_FUTURE))
        .unwrap_or(at)
}

/// Process-wide request counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalWindow {
    pub count: u64,
    pub window_reset_at: Instant,
}

impl GlobalWindow {
    fn new(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_reset_at: deadline(now, window),
        }
    }

    fn observe(&mut self, now: Instant, window: Duration) -> u64 {
        if now > self.window_reset_at {
            self.count = 0;
            self.window_reset_at = deadline(now, window);
        }
        self.count += 1;
        self.count
    }
}

/// Per-client request counter and block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindow {
    pub count: u64,
    pub window_reset_at: Instant,
    /// `Some` while the client is blocked.
    pub blocked_until: Option<Instant>,
    /// Last time this client was observed or reset, for idle eviction.
    pub last_seen: Instant,
}

impl ClientWindow {
    pub fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_reset_at: deadline(now, window),
            blocked_until: None,
            last_seen: now,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_until.is_some()
    }

    /// Count one request, rolling the window over first if it has expired.
    ///
    /// A rollover also drops the block flag; block expiry itself is decided
    /// against `blocked_until` by the caller.
    pub fn observe(&mut self, now: Instant, window: Duration) -> u64 {
        if now > self.window_reset_at {
            *self = Self::fresh(now, window);
        }
        self.count += 1;
        self.last_seen = now;
        self.count
    }

    pub fn block(&mut self, until: Instant) {
        self.blocked_until = Some(until);
    }

    /// Leave the blocked state and start a clean window.
    pub fn clear_block(&mut self, now: Instant, window: Duration) {
        *self = Self::fresh(now, window);
    }

    /// Whether this entry may be dropped by idle eviction.
    fn is_idle(&self, now: Instant, idle: Duration) -> bool {
        match self.blocked_until {
            Some(until) if until > now => false,
            _ => now
                .checked_duration_since(self.window_reset_at)
                .is_some_and(|elapsed| elapsed > idle),
        }
    }

    fn is_actively_blocked(&self, now: Instant) -> bool {
        matches!(self.blocked_until, Some(until) if until > now)
    }
}

/// Result of counting one client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientObservation {
    pub count: u64,
    pub blocked_until: Option<Instant>,
}

/// Owner of all guard counter state.
#[derive(Debug)]
pub struct WindowStore {
    global: Mutex<GlobalWindow>,
    clients: DashMap<String, ClientWindow>,
}

impl WindowStore {
    pub fn new(now: Instant, window: Duration) -> Self {
        Self {
            global: Mutex::new(GlobalWindow::new(now, window)),
            clients: DashMap::new(),
        }
    }

    /// Count one request against the global window and return the new count.
    pub fn observe_global(&self, now: Instant, window: Duration) -> u64 {
        self.global
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(now, window)
    }

    /// Copy of the global window as it is stored.
    pub fn global(&self) -> GlobalWindow {
        *self.global.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the client's window while holding its entry lock,
    /// creating a fresh window for unseen identifiers.
    pub fn with_client<R>(
        &self,
        id: &str,
        now: Instant,
        window: Duration,
        f: impl FnOnce(&mut ClientWindow) -> R,
    ) -> R {
        if let Some(mut entry) = self.clients.get_mut(id) {
            return f(entry.value_mut());
        }
        let mut entry = self
            .clients
            .entry(id.to_owned())
            .or_insert_with(|| ClientWindow::fresh(now, window));
        f(entry.value_mut())
    }

    pub fn get_or_init(&self, id: &str, now: Instant, window: Duration) -> ClientWindow {
        self.with_client(id, now, window, |client| *client)
    }

    /// Existing window for `id`, without creating one.
    pub fn get(&self, id: &str) -> Option<ClientWindow> {
        self.clients.get(id).map(|entry| *entry.value())
    }

    pub fn observe_client(&self, id: &str, now: Instant, window: Duration) -> ClientObservation {
        self.with_client(id, now, window, |client| {
            let count = client.observe(now, window);
            ClientObservation {
                count,
                blocked_until: client.blocked_until,
            }
        })
    }

    /// Mark a tracked client blocked until `until`. Returns false for unknown ids.
    pub fn set_blocked(&self, id: &str, until: Instant) -> bool {
        match self.clients.get_mut(id) {
            Some(mut entry) => {
                entry.block(until);
                true
            }
            None => false,
        }
    }

    /// Clear a client's block and restart its window.
    ///
    /// Returns whether the client was blocked. Unknown ids are left untracked.
    pub fn clear_block(&self, id: &str, now: Instant, window: Duration) -> bool {
        match self.clients.get_mut(id) {
            Some(mut entry) => {
                let was_blocked = entry.is_blocked();
                entry.clear_block(now, window);
                was_blocked
            }
            None => false,
        }
    }

    /// Blocked clients whose block is still in force at `now`, soonest expiry first.
    pub fn snapshot(&self, now: Instant) -> Vec<(String, Instant)> {
        let mut blocked: Vec<_> = self
            .clients
            .iter()
            .filter_map(|entry| match entry.blocked_until {
                Some(until) if until > now => Some((entry.key().clone(), until)),
                _ => None,
            })
            .collect();
        blocked.sort_by_key(|(_, until)| *until);
        blocked
    }

    /// Number of distinct client identifiers tracked.
    pub fn active_count(&self) -> usize {
        self.clients.len()
    }

    /// Drop idle clients, then enforce `max_tracked` by dropping the least
    /// recently seen unblocked clients. Returns the number removed.
    pub fn evict_idle(&self, now: Instant, idle: Duration, max_tracked: Option<usize>) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, client| !client.is_idle(now, idle));

        if let Some(max) = max_tracked {
            let excess = self.clients.len().saturating_sub(max);
            if excess > 0 {
                let mut candidates: Vec<(String, Instant)> = self
                    .clients
                    .iter()
                    .filter(|entry| !entry.is_actively_blocked(now))
                    .map(|entry| (entry.key().clone(), entry.last_seen))
                    .collect();
                candidates.sort_by_key(|(_, last_seen)| *last_seen);
                for (id, _) in candidates.into_iter().take(excess) {
                    self.clients
                        .remove_if(&id, |_, client| !client.is_actively_blocked(now));
                }
            }
        }

        before.saturating_sub(self.clients.len())
    }
}
