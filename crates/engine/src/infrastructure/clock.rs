//! Clock and random implementations.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::infrastructure::ports::{ClockPort, RandomPort};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        if max < min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic random source. The same seed yields the same sequence,
/// which makes a generated map reproducible.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned lock only means another caller panicked mid-draw; the
        // generator state is still usable.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl RandomPort for SeededRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        if max < min {
            return min;
        }
        self.with_rng(|rng| rng.gen_range(min..=max))
    }

    fn gen_uuid(&self) -> Uuid {
        let bytes: [u8; 16] = self.with_rng(|rng| rng.gen());
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed random for testing. Ignores the requested range.
#[cfg(test)]
pub struct FixedRandom(pub i32);

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_range(&self, _min: i32, _max: i32) -> i32 {
        self.0
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let draws_a: Vec<i32> = (0..20).map(|_| a.gen_range(1, 100)).collect();
        let draws_b: Vec<i32> = (0..20).map(|_| b.gen_range(1, 100)).collect();
        assert_eq!(draws_a, draws_b);
        assert_eq!(a.gen_uuid(), b.gen_uuid());
    }

    #[test]
    fn gen_range_stays_inclusive() {
        let random = SeededRandom::new(7);
        for _ in 0..200 {
            let n = random.gen_range(2, 3);
            assert!((2..=3).contains(&n));
        }
    }

    #[test]
    fn inverted_range_returns_min() {
        assert_eq!(SystemRandom::new().gen_range(5, 1), 5);
        assert_eq!(SeededRandom::new(1).gen_range(5, 1), 5);
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let now = Utc::now();
        let clock = FixedClock(now);
        assert_eq!(clock.today(), now.date_naive());
    }
}
