use crate::config::DelayRange;
use crate::domains::car::DelayProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Uniformly distributed delays between two bounds, inclusive.
pub struct RandomDelay {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl RandomDelay {
    pub fn new(range: DelayRange, seed: Option<u64>) -> Self {
        let (min, max) = range.bounds();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            min,
            max,
            rng: Mutex::new(rng),
        }
    }
}

impl DelayProvider for RandomDelay {
    fn next_delay(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(self.min..=self.max),
            // A poisoned generator still has a usable lower bound.
            Err(_) => self.min,
        }
    }
}

/// Always the same delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl DelayProvider for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
