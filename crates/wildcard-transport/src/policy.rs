//! Reconnect policy: how soon, and how often, to redial after a drop.

use std::time::Duration;

use rand::Rng;

/// Controls what the [`ConnectionManager`](crate::ConnectionManager) does
/// after a connection is lost or a connect attempt fails.
///
/// The first retry after losing a live connection is immediate. Every
/// further consecutive failure waits longer, doubling from
/// `initial_delay` up to `max_delay`, with a random jitter so that many
/// clients dropped by the same authority restart do not redial in lockstep.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Whether to reconnect at all. When `false` the manager stops after
    /// the first disconnect.
    pub enabled: bool,

    /// Delay before the second consecutive attempt.
    pub initial_delay: Duration,

    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,

    /// Fraction (0.0–1.0) of the delay added as random jitter.
    pub jitter: f64,

    /// Give up after this many consecutive failed attempts. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter: 0.2,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns the delay before attempt number `attempt` (0-based count of
    /// consecutive failures so far), or `None` if the manager should stop.
    ///
    /// Attempt 0 always returns [`Duration::ZERO`].
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        if attempt == 0 {
            return Some(Duration::ZERO);
        }

        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);

        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return Some(base);
        }
        let extra = rand::rng().random_range(0.0..=jitter);
        Some(base.mul_f64(1.0 + extra).min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> ReconnectPolicy {
        ReconnectPolicy {
            jitter: 0.0,
            ..ReconnectPolicy::default()
        }
    }

    #[test]
    fn test_delay_for_first_attempt_is_immediate() {
        assert_eq!(no_jitter().delay_for(0), Some(Duration::ZERO));
        assert_eq!(ReconnectPolicy::default().delay_for(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_delay_for_doubles_then_caps() {
        let p = no_jitter();
        assert_eq!(p.delay_for(1), Some(Duration::from_millis(250)));
        assert_eq!(p.delay_for(2), Some(Duration::from_millis(500)));
        assert_eq!(p.delay_for(3), Some(Duration::from_secs(1)));
        assert_eq!(p.delay_for(30), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_delay_for_jitter_stays_within_bounds() {
        let p = ReconnectPolicy::default();
        for _ in 0..100 {
            let d = p.delay_for(2).unwrap();
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(600));
        }
    }

    #[test]
    fn test_delay_for_disabled_returns_none() {
        assert_eq!(ReconnectPolicy::disabled().delay_for(0), None);
    }

    #[test]
    fn test_delay_for_respects_max_attempts() {
        let p = ReconnectPolicy {
            max_attempts: Some(2),
            ..no_jitter()
        };
        assert!(p.delay_for(1).is_some());
        assert_eq!(p.delay_for(2), None);
    }
}
