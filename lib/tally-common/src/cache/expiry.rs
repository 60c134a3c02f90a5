use std::time::Duration;

use quanta::{Clock, Instant};

/// Time-to-idle expiration policy.
///
/// An entry is considered expired once the time since it was last accessed (inserted, read, or updated) reaches the
/// configured time-to-idle. Every access slides the deadline forward.
#[derive(Clone, Debug)]
pub(super) struct Expiration {
    clock: Clock,
    time_to_idle: Option<Duration>,
}

impl Expiration {
    pub(super) fn new(clock: Clock, time_to_idle: Option<Duration>) -> Self {
        Self { clock, time_to_idle }
    }

    pub(super) fn now(&self) -> Instant {
        self.clock.now()
    }

    pub(super) fn is_enabled(&self) -> bool {
        self.time_to_idle.is_some()
    }

    pub(super) fn is_expired(&self, last_accessed: Instant, now: Instant) -> bool {
        match self.time_to_idle {
            Some(time_to_idle) => now.saturating_duration_since(last_accessed) >= time_to_idle,
            None => false,
        }
    }
}
