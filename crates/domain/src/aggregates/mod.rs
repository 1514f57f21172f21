//! Aggregates with invariants enforced behind their methods

pub mod dungeon_map;
pub mod run_state;

pub use dungeon_map::{
    validate_map, validate_map_for_depth, DungeonMap, MapValidation, MapValidationError,
    MAX_NODES_PER_DEPTH, MIN_NODES_PER_DEPTH,
};
pub use run_state::{BustSummary, CompletionSummary, RunContribution, RunState};
