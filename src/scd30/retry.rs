// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bounded retry policy for measurement polling
//!
//! The policy is pure bookkeeping: it never sleeps or talks to the bus, the
//! measurement state machine asks it what to do after each outcome.

use std::time::Duration;

/// Default number of consecutive failures tolerated
pub const DEFAULT_FAILURE_CEILING: u32 = 20;
/// Default pause after a transient failure
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Ceiling and backoff of the polling retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub ceiling: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(ceiling: u32, backoff: Duration) -> Self {
        Self {
            ceiling: ceiling.max(1),
            backoff,
        }
    }

    pub fn counter(&self) -> FailureCounter {
        FailureCounter::new(self.ceiling)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_CEILING, DEFAULT_RETRY_BACKOFF)
    }
}

/// What the poller should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the backoff and poll again
    Retry { remaining: u32 },
    /// Budget spent, give up on the session
    GiveUp,
}

/// Consecutive-failure budget
///
/// Starts at the ceiling, loses one unit per transient failure and is
/// refilled by any success. Once it reaches zero it stays exhausted until
/// [`FailureCounter::reset`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCounter {
    ceiling: u32,
    remaining: u32,
}

impl FailureCounter {
    pub fn new(ceiling: u32) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            ceiling,
            remaining: ceiling,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Failures recorded since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.ceiling - self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                remaining: self.remaining,
            }
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.ceiling;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_count_down_from_ceiling() {
        let mut counter = FailureCounter::new(20);
        for n in 1..=5 {
            assert_eq!(
                counter.record_failure(),
                RetryDecision::Retry { remaining: 20 - n }
            );
        }
        assert_eq!(counter.remaining(), 15);
        assert_eq!(counter.consecutive_failures(), 5);
    }

    #[test]
    fn test_success_refills_budget() {
        let mut counter = FailureCounter::new(4);
        counter.record_failure();
        counter.record_failure();
        counter.reset();
        assert_eq!(counter.remaining(), 4);
        assert!(!counter.is_exhausted());
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let mut counter = FailureCounter::new(2);
        assert_eq!(
            counter.record_failure(),
            RetryDecision::Retry { remaining: 1 }
        );
        assert_eq!(counter.record_failure(), RetryDecision::GiveUp);
        assert!(counter.is_exhausted());
        assert_eq!(counter.record_failure(), RetryDecision::GiveUp);
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn test_zero_ceiling_is_clamped() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.ceiling, 1);
        assert_eq!(policy.counter().remaining(), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.ceiling, 20);
        assert_eq!(policy.backoff, Duration::from_millis(100));
    }
}
