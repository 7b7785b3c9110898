// crates/keel-modules/src/oracle.rs
//
// IntervalOracle: a minimal moving-average oracle stand-in.
//
// The protocol only consumes the observation frequency (the heartbeat
// derives its cadence from it) and triggers the update hook; price
// internals are out of scope.

use keel_core::{KeelError, PriceOracle, Timestamp};

/// An oracle that records one observation per fixed interval.
pub struct IntervalOracle {
    frequency: u64,
    last_observation: Timestamp,
    observation_count: u64,
}

impl IntervalOracle {
    /// Create an oracle observing every `frequency` seconds.
    pub fn new(frequency: u64) -> Self {
        Self {
            frequency,
            last_observation: 0,
            observation_count: 0,
        }
    }

    /// Number of observations taken so far.
    pub fn observation_count(&self) -> u64 {
        self.observation_count
    }
}

impl PriceOracle for IntervalOracle {
    fn observation_frequency(&self) -> u64 {
        self.frequency
    }

    fn update(&mut self, now: Timestamp) -> Result<bool, KeelError> {
        if self.observation_count > 0 && now < self.last_observation + self.frequency {
            return Ok(false);
        }
        self.last_observation = now;
        self.observation_count += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_observes() {
        let mut oracle = IntervalOracle::new(3_600);
        assert!(oracle.update(1_000).unwrap());
        assert_eq!(oracle.observation_count(), 1);
    }

    #[test]
    fn test_early_update_skips() {
        let mut oracle = IntervalOracle::new(3_600);
        oracle.update(1_000).unwrap();
        assert!(!oracle.update(1_000 + 3_599).unwrap());
        assert_eq!(oracle.observation_count(), 1);
    }

    #[test]
    fn test_due_update_observes() {
        let mut oracle = IntervalOracle::new(3_600);
        oracle.update(1_000).unwrap();
        assert!(oracle.update(1_000 + 3_600).unwrap());
        assert_eq!(oracle.observation_count(), 2);
    }
}
