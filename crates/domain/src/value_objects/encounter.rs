//! Encounter outcomes as closed variants per category.
//!
//! Every encounter yields exactly one reward, one consequence and one effect.
//! Callers match on them exhaustively; there is no free-form payload.

use serde::{Deserialize, Serialize};

use crate::entities::{CollectedItem, EncounterType, ItemType, Shortcut};
use crate::ShortcutId;

/// What the player gains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncounterReward {
    Item { item: CollectedItem },
    Shortcut { shortcut: Shortcut },
    Nothing,
}

/// What the player pays beyond the entry cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncounterConsequence {
    EnergyDrain { amount: u32 },
    Nothing,
}

/// Side effect on the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncounterEffect {
    /// Restore energy, capped at the run's total
    Rest { energy: u32 },
    /// Reveal every node one level below the current one
    RevealNextDepth,
    Nothing,
}

/// Resolved result of one encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterOutcome {
    pub encounter_type: EncounterType,
    pub depth: u32,
    /// d100 roll the outcome was drawn from
    pub roll: u32,
    pub reward: EncounterReward,
    pub consequence: EncounterConsequence,
    pub effect: EncounterEffect,
}

impl EncounterOutcome {
    fn new(encounter_type: EncounterType, depth: u32, roll: u32) -> Self {
        Self {
            encounter_type,
            depth,
            roll,
            reward: EncounterReward::Nothing,
            consequence: EncounterConsequence::Nothing,
            effect: EncounterEffect::Nothing,
        }
    }

    fn with_reward(mut self, reward: EncounterReward) -> Self {
        self.reward = reward;
        self
    }

    fn with_consequence(mut self, consequence: EncounterConsequence) -> Self {
        self.consequence = consequence;
        self
    }

    fn with_effect(mut self, effect: EncounterEffect) -> Self {
        self.effect = effect;
        self
    }
}

/// Map an encounter and a d100 roll (1..=100) to its outcome.
///
/// Pure: the same inputs always produce the same outcome apart from freshly
/// generated item and shortcut IDs.
pub fn resolve_encounter(encounter_type: EncounterType, depth: u32, roll: u32) -> EncounterOutcome {
    let roll = roll.clamp(1, 100);
    let depth = depth.max(1);
    let outcome = EncounterOutcome::new(encounter_type, depth, roll);

    match encounter_type {
        EncounterType::PuzzleChamber => {
            if roll >= 40 {
                let item_type = if roll >= 90 {
                    ItemType::Artifact
                } else {
                    ItemType::Scroll
                };
                outcome.with_reward(item_reward(item_type, depth, 10 * depth + roll / 10))
            } else {
                outcome.with_consequence(EncounterConsequence::EnergyDrain { amount: 2 * depth })
            }
        }
        EncounterType::TradeOpportunity => {
            if roll >= 50 {
                outcome.with_reward(item_reward(ItemType::TradeGood, depth, 8 * depth))
            } else {
                outcome
            }
        }
        EncounterType::DiscoverySite => {
            if roll >= 85 {
                let shortcut = Shortcut {
                    id: ShortcutId::new(),
                    from_depth: depth,
                    to_depth: depth / 2,
                    energy_reduction: f64::from(2 * depth),
                    is_permanent: roll >= 97,
                };
                outcome.with_reward(EncounterReward::Shortcut { shortcut })
            } else if roll >= 30 {
                outcome.with_reward(item_reward(ItemType::Gem, depth, 12 * depth))
            } else {
                outcome.with_effect(EncounterEffect::RevealNextDepth)
            }
        }
        EncounterType::RiskEvent => {
            if roll >= 60 {
                outcome.with_reward(item_reward(ItemType::Relic, depth, 25 * depth))
            } else {
                outcome.with_consequence(EncounterConsequence::EnergyDrain { amount: 5 * depth })
            }
        }
        EncounterType::Hazard => {
            let amount = if roll < 50 { 6 * depth } else { 3 * depth };
            outcome.with_consequence(EncounterConsequence::EnergyDrain { amount })
        }
        EncounterType::RestSite => outcome.with_effect(EncounterEffect::Rest {
            energy: 5 * depth + roll / 5,
        }),
    }
}

fn item_reward(item_type: ItemType, depth: u32, value: u32) -> EncounterReward {
    let (set_id, noun) = match item_type {
        ItemType::Artifact => ("ancient_artifacts", "Artifact"),
        ItemType::Relic => ("forgotten_relics", "Relic"),
        ItemType::Gem => ("crystal_hoard", "Gem"),
        ItemType::Scroll => ("scholar_scrolls", "Scroll"),
        ItemType::TradeGood => ("merchant_wares", "Trade Good"),
    };
    let item = CollectedItem::new(item_type, set_id, value, format!("{} of Depth {}", noun, depth))
        .with_description(format!("Recovered at depth {}", depth));
    EncounterReward::Item { item }
}
