//! Testability ports for injecting time and randomness.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Time source. Tests use a fixed clock.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Source of randomness for map generation and encounter rolls.
pub trait RandomPort: Send + Sync {
    /// Inclusive on both ends. Returns `min` when `max < min`.
    fn gen_range(&self, min: i32, max: i32) -> i32;
    fn gen_uuid(&self) -> Uuid;
}
