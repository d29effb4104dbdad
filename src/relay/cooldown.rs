//! Per-user cooldown tracking for relayed requests.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use poise::serenity_prelude::UserId;

/// Minimum interval between accepted requests from one user.
pub const COOLDOWN: Duration = Duration::from_secs(30);

/// Last accepted request time per user.
///
/// Entries older than the window are swept on every write, so the map only
/// ever holds users who were accepted within the last window.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    entries: DashMap<UserId, Instant>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(COOLDOWN)
    }
}

impl CooldownTracker {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time left before `user` may be accepted again, or `None` if they may go now.
    ///
    /// Does not record anything.
    #[must_use]
    pub fn remaining(&self, user: UserId, now: Instant) -> Option<Duration> {
        let last = *self.entries.get(&user)?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    /// Record an accepted request for `user` at `now`.
    pub fn record(&self, user: UserId, now: Instant) {
        self.entries
            .retain(|_, last| now.saturating_duration_since(*last) < self.window);
        self.entries.insert(user, now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whole seconds left to wait, rounded up so a notice never says "0 seconds".
#[must_use]
pub fn whole_seconds(remaining: Duration) -> u64 {
    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
}

/// Informational reply for a user still on cooldown.
#[must_use]
pub fn cooldown_notice(remaining: Duration) -> String {
    let secs = whole_seconds(remaining);
    let unit = if secs == 1 { "second" } else { "seconds" };
    format!("Please wait {secs} more {unit} before asking another question.")
}
