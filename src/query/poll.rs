//! Completion-poll pacing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wait schedule between `GetOperationStatus` calls.
///
/// The first wait is `initial_interval`. Each later wait is the previous one
/// times `backoff_factor` (a zero wait grows to one millisecond), capped at
/// `max_interval`. A zero `max_interval` polls without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            max_interval: Duration::from_millis(100),
            backoff_factor: 2,
        }
    }
}

impl PollPolicy {
    /// Poll back-to-back with no wait.
    pub fn spin() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            backoff_factor: 1,
        }
    }

    /// Infinite sequence of waits following this policy.
    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            next: self.initial_interval.min(self.max_interval),
            policy: *self,
        }
    }
}

/// Iterator over the waits of a [`PollPolicy`].
#[derive(Debug, Clone)]
pub struct PollIntervals {
    next: Duration,
    policy: PollPolicy,
}

impl Iterator for PollIntervals {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        let max = self.policy.max_interval;
        let grown = if current.is_zero() {
            Duration::from_millis(1)
        } else {
            current
                .checked_mul(self.policy.backoff_factor)
                .unwrap_or(max)
        };
        self.next = grown.min(max);
        Some(current)
    }
}
