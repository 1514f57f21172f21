//! Value objects: pure calculations and immutable records

mod encounter;
mod energy;
mod safety_margin;
mod settings;

pub use encounter::{
    resolve_encounter, EncounterConsequence, EncounterEffect, EncounterOutcome, EncounterReward,
};
pub use energy::EnergyCalculator;
pub use safety_margin::{
    RiskWarning, SafetyMargin, SafetyMarginManager, SafetyZone, WarningSeverity,
};
pub use settings::DelveSettings;
