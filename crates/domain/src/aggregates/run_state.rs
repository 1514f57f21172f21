//! RunState aggregate - mutable state of the one active descent
//!
//! # Invariants
//!
//! - `energy_remaining` never exceeds `total_energy`
//! - `current_depth` equals the depth of `current_node`, or 0 at the surface
//! - A failed move leaves the state untouched
//! - The inventory only grows; it is emptied by cash-out or bust, which consume the state

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entities::{CollectedItem, DungeonNode, Shortcut};
use crate::error::DomainError;
use crate::{NodeId, RunId};

/// State of the active run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: RunId,
    pub total_energy: u32,
    pub current_depth: u32,
    pub current_node: Option<NodeId>,
    pub energy_remaining: u32,
    #[serde(default)]
    pub inventory: Vec<CollectedItem>,
    #[serde(default)]
    pub visited_nodes: BTreeSet<NodeId>,
    #[serde(default)]
    pub discovered_shortcuts: Vec<Shortcut>,
    #[serde(default)]
    pub deepest_depth: u32,
}

impl RunState {
    pub fn new(run_id: RunId, total_energy: u32) -> Result<Self, DomainError> {
        if total_energy == 0 {
            return Err(DomainError::validation(format!(
                "run {} cannot start with zero energy",
                run_id
            )));
        }
        Ok(Self {
            run_id,
            total_energy,
            current_depth: 0,
            current_node: None,
            energy_remaining: total_energy,
            inventory: Vec::new(),
            visited_nodes: BTreeSet::new(),
            discovered_shortcuts: Vec::new(),
            deepest_depth: 0,
        })
    }

    /// Spend `energy_cost` to enter `node`. Check and deduct happen together;
    /// on error nothing changes.
    pub fn move_to(&mut self, node: &DungeonNode, energy_cost: u32) -> Result<(), DomainError> {
        if self.energy_remaining < energy_cost {
            return Err(DomainError::insufficient_energy(
                energy_cost,
                self.energy_remaining,
            ));
        }

        self.energy_remaining -= energy_cost;
        self.current_node = Some(node.id);
        self.current_depth = node.depth;
        self.deepest_depth = self.deepest_depth.max(node.depth);
        self.visited_nodes.insert(node.id);
        Ok(())
    }

    pub fn add_item(&mut self, item: CollectedItem) {
        self.inventory.push(item);
    }

    pub fn add_shortcut(&mut self, shortcut: Shortcut) {
        self.discovered_shortcuts.push(shortcut);
    }

    /// Remove up to `amount` energy. Returns how much was actually drained.
    pub fn drain_energy(&mut self, amount: u32) -> u32 {
        let drained = amount.min(self.energy_remaining);
        self.energy_remaining -= drained;
        drained
    }

    /// Restore up to `amount` energy without exceeding the run total.
    /// Returns how much was actually restored.
    pub fn restore_energy(&mut self, amount: u32) -> u32 {
        let room = self.total_energy.saturating_sub(self.energy_remaining);
        let restored = amount.min(room);
        self.energy_remaining += restored;
        restored
    }

    pub fn energy_used(&self) -> u32 {
        self.total_energy.saturating_sub(self.energy_remaining)
    }

    pub fn inventory_value(&self) -> u32 {
        self.inventory.iter().map(|i| i.value).sum()
    }

    pub fn is_at_surface(&self) -> bool {
        self.current_node.is_none()
    }

    /// Consume the state as a successful cash-out.
    pub fn into_completion(self, xp_per_depth: u32) -> CompletionSummary {
        let xp = self.deepest_depth * xp_per_depth + self.inventory_value();
        CompletionSummary {
            run_id: self.run_id,
            total_energy_used: self.energy_used(),
            energy_remaining: self.energy_remaining,
            deepest_depth: self.deepest_depth,
            final_inventory: self.inventory,
            xp,
        }
    }

    /// Consume the state as a bust. Items and remaining energy are forfeited.
    pub fn into_bust(self) -> BustSummary {
        BustSummary {
            run_id: self.run_id,
            energy_lost: self.energy_remaining,
            items_lost: self.inventory.len(),
            deepest_depth: self.deepest_depth,
        }
    }
}

/// Result of a successful cash-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub run_id: RunId,
    pub final_inventory: Vec<CollectedItem>,
    pub deepest_depth: u32,
    pub total_energy_used: u32,
    pub energy_remaining: u32,
    pub xp: u32,
}

impl CompletionSummary {
    pub fn contribution(&self) -> RunContribution {
        RunContribution {
            run_id: self.run_id,
            deepest_depth: self.deepest_depth,
            final_inventory: self.final_inventory.clone(),
            xp: self.xp,
        }
    }
}

/// Result of a bust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BustSummary {
    pub run_id: RunId,
    pub energy_lost: u32,
    pub items_lost: usize,
    pub deepest_depth: u32,
}

/// What progression trackers receive when a run is banked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContribution {
    pub run_id: RunId,
    pub deepest_depth: u32,
    pub final_inventory: Vec<CollectedItem>,
    pub xp: u32,
}
