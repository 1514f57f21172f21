//! Use cases - User story orchestration.
//!
//! Each module drives one part of a delve: earning runs from steps, building
//! the dungeon, moving through it, resolving encounters and leaving it.

pub mod cash_out;
pub mod encounter;
pub mod expedition;
pub mod map_generation;
pub mod run_queue;
pub mod run_state;

pub use cash_out::{CashOutError, CashOutManager, CashOutResult, CashOutSummary};
pub use encounter::{EncounterError, EncounterResolver};
pub use expedition::{Expedition, ExpeditionError};
pub use map_generation::{DungeonMapGenerator, MapGenerationError};
pub use run_queue::{RunQueueError, RunQueueManager, RUNS_KEY};
pub use run_state::{AppliedOutcome, RunError, RunSession, RunStateManager, ACTIVE_RUN_KEY};
