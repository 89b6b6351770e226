use std::time::Duration;

use rand::Rng;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_PROPAGATION_GRACE: Duration = Duration::from_secs(10);

/// Bounded polling policy: probe up to `max_attempts` times, sleeping
/// `delay` plus up to `jitter` between probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub jitter: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
            jitter: Duration::ZERO,
        }
    }
}

impl WaitPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn next_delay(&self, rng: &mut impl Rng) -> Duration {
        let jitter_millis = self.jitter.as_millis() as u64;
        if jitter_millis == 0 {
            return self.delay;
        }
        self.delay + Duration::from_millis(rng.gen_range(0..=jitter_millis))
    }

    /// Longest time a wait can spend sleeping before giving up.
    pub fn max_wait(&self) -> Duration {
        (self.delay + self.jitter) * self.max_attempts.saturating_sub(1)
    }
}
