//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Persistence (in-memory map or SQLite key-value table)
//! - Step counts and streak status (device pedometer, health service)
//! - Progression tracking (XP and collection sets outside the delve)
//! - Clock/Random (for testing)

mod error;
mod external;
mod storage;
mod testing;

pub use error::{ProgressionError, StepSourceError, StorageError};
pub use external::{DailySteps, ProgressionPort, StepSourcePort};
pub use storage::KeyValueStore;
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use external::{MockProgressionPort, MockStepSourcePort};
#[cfg(test)]
pub use storage::MockKeyValueStore;
