//! Shortcut entity - A discovered passage that makes the way back cheaper

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ShortcutId;

/// A discovered edge reducing future return-cost calculations.
///
/// Run-scoped shortcuts vanish with the run; permanent ones are also written
/// to the cross-run store and apply to every later run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    pub id: ShortcutId,
    /// Deepest level the shortcut can be entered from
    pub from_depth: u32,
    /// Shallower level the shortcut leads to
    pub to_depth: u32,
    /// Energy shaved off the return cost while it applies
    pub energy_reduction: f64,
    #[serde(default)]
    pub is_permanent: bool,
}

impl Shortcut {
    pub fn new(from_depth: u32, to_depth: u32, energy_reduction: f64) -> Result<Self, DomainError> {
        if to_depth >= from_depth {
            return Err(DomainError::validation(format!(
                "shortcut must lead upward: {} -> {}",
                from_depth, to_depth
            )));
        }
        if !(energy_reduction >= 0.0) {
            return Err(DomainError::validation(
                "shortcut energy reduction cannot be negative",
            ));
        }
        Ok(Self {
            id: ShortcutId::new(),
            from_depth,
            to_depth,
            energy_reduction,
            is_permanent: false,
        })
    }

    pub fn permanent(mut self) -> Self {
        self.is_permanent = true;
        self
    }

    /// Whether a player standing at `depth` can use this shortcut on the way back.
    pub fn applies_at(&self, depth: u32) -> bool {
        depth >= self.from_depth
    }
}
