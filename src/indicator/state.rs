//! The eye counter and its hysteresis rules.
//!
//! Growth is rate-limited by a cool-down measured from the last increment,
//! while decay removes one eye per absent sample with no time limit.
//!
//! ```text
//!   present && count < max && cooled down     absent && count > 0
//!          count += 1, stamp = now                count -= 1
//!   ┌───────────────────────────────┐   ┌───────────────────────────┐
//!   0 ──▶ 1 ──▶ ... ──▶ max          max ──▶ ... ──▶ 1 ──▶ 0
//! ```

use crate::config::ResetPolicy;
use std::time::{Duration, Instant};

/// Bounded eye counter with slow growth and fast decay.
#[derive(Debug, Clone)]
pub struct IndicatorState {
    count: u32,
    max_count: u32,
    min_increment_interval: Duration,
    last_increment: Instant,
}

impl IndicatorState {
    /// Create an empty counter whose cool-down starts at `started`.
    pub fn new(max_count: u32, min_increment_interval: Duration, started: Instant) -> Self {
        Self {
            count: 0,
            max_count,
            min_increment_interval,
            last_increment: started,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn last_increment(&self) -> Instant {
        self.last_increment
    }

    /// Whether the counter sits at its upper bound.
    pub fn is_saturated(&self) -> bool {
        self.count >= self.max_count
    }

    /// Apply one debounced presence sample taken at `now`.
    ///
    /// Returns `true` when the count changed.
    pub fn observe_presence(&mut self, detected: bool, now: Instant) -> bool {
        if detected {
            let cooled_down =
                now.saturating_duration_since(self.last_increment) >= self.min_increment_interval;
            if self.count < self.max_count && cooled_down {
                self.count += 1;
                self.last_increment = now;
                return true;
            }
            false
        } else if self.count > 0 {
            self.count -= 1;
            true
        } else {
            false
        }
    }

    /// Zero the counter.
    ///
    /// The cool-down is untouched; see [`reset_with_policy`](Self::reset_with_policy).
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Zero the counter and, under [`ResetPolicy::RestartCooldown`], restart
    /// the growth cool-down at `now`.
    pub fn reset_with_policy(&mut self, policy: ResetPolicy, now: Instant) {
        self.reset();
        if policy == ResetPolicy::RestartCooldown {
            self.last_increment = now;
        }
    }
}
