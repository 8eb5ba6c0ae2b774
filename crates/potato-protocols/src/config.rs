//! Per-invocation pass configuration.

use std::time::Duration;

/// Pass limit and per-hop delay in effect for one forward step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassConfig {
    /// Completed hops after which the game ends. `None` never ends.
    pub max_passes: Option<u64>,

    /// Synchronous pause applied after every committed hop.
    pub delay: Duration,
}

impl PassConfig {
    /// Create a config with the given limit and delay.
    #[must_use]
    pub fn new(max_passes: Option<u64>, delay: Duration) -> Self {
        Self { max_passes, delay }
    }

    /// Set the pass limit.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: u64) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    /// Remove the pass limit.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_passes = None;
        self
    }

    /// Set the per-hop delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the per-hop delay in seconds. Negative or non-finite values mean no delay.
    #[must_use]
    pub fn with_delay_secs(self, secs: f64) -> Self {
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        self.with_delay(delay)
    }

    /// Check whether a token with `times_passed` hops sits exactly at the limit.
    ///
    /// Equality, not `>=`: a count that skips past the limit keeps going.
    #[must_use]
    pub fn is_limit_reached(&self, times_passed: u64) -> bool {
        self.max_passes == Some(times_passed)
    }
}
