//! Delve Domain - pure types and rules of the step-powered dungeon descent.
//!
//! Nothing in this crate performs I/O, awaits, or draws random numbers.
//! The engine injects those through ports and calls into these types.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{
    validate_map, validate_map_for_depth, BustSummary, CompletionSummary, DungeonMap,
    MapValidation, MapValidationError, RunContribution, RunState, MAX_NODES_PER_DEPTH,
    MIN_NODES_PER_DEPTH,
};
pub use entities::{
    CollectedItem, DelvingRun, DungeonNode, EncounterType, ItemType, NodePosition, RunStatistics,
    RunStatus, Shortcut,
};
pub use error::DomainError;
pub use ids::{ItemId, NodeId, RunId, ShortcutId};
pub use value_objects::{
    resolve_encounter, DelveSettings, EncounterConsequence, EncounterEffect, EncounterOutcome,
    EncounterReward, EnergyCalculator, RiskWarning, SafetyMargin, SafetyMarginManager, SafetyZone,
    WarningSeverity,
};
