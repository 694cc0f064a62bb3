// src/load_balancer/random.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform draws for the selector. Tests plug in scripted values.
pub trait RandomSource: Send + Sync {
    /// Uniform sample in `[0, 1)`.
    fn next_unit(&self) -> f64;
}

/// Process-wide generator, seeded once. The lock is held for a single draw.
pub struct SharedRng {
    inner: Mutex<StdRng>,
}

impl SharedRng {
    /// Seed from the wall clock in nanoseconds.
    pub fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();

        tracing::debug!(seed, "seeding shared random generator");
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SharedRng {
    fn next_unit(&self) -> f64 {
        // A panic elsewhere cannot leave the generator in a bad state.
        let mut rng = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen::<f64>()
    }
}
