//! DungeonNode entity - One chamber of a generated run map

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::NodeId;

/// Kind of encounter waiting in a chamber.
///
/// Closed set: generation draws from these and encounter resolution matches
/// on them exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterType {
    PuzzleChamber,
    TradeOpportunity,
    DiscoverySite,
    RiskEvent,
    Hazard,
    RestSite,
}

impl EncounterType {
    pub const ALL: [EncounterType; 6] = [
        Self::PuzzleChamber,
        Self::TradeOpportunity,
        Self::DiscoverySite,
        Self::RiskEvent,
        Self::Hazard,
        Self::RestSite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PuzzleChamber => "puzzle_chamber",
            Self::TradeOpportunity => "trade_opportunity",
            Self::DiscoverySite => "discovery_site",
            Self::RiskEvent => "risk_event",
            Self::Hazard => "hazard",
            Self::RestSite => "rest_site",
        }
    }

    /// Draw weight at a given depth. Dangerous encounters grow more common
    /// the deeper the player goes; rest sites grow rarer.
    pub fn weight_at(&self, depth: u32) -> u32 {
        match self {
            Self::PuzzleChamber => 20,
            Self::TradeOpportunity => 15,
            Self::DiscoverySite => 25,
            Self::RiskEvent => 10 + depth,
            Self::Hazard => 10 + 2 * depth,
            Self::RestSite => 12u32.saturating_sub(depth).max(3),
        }
    }

    /// Multiplier applied to the depth-scaled entry cost.
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            Self::PuzzleChamber => 1.2,
            Self::TradeOpportunity => 1.0,
            Self::DiscoverySite => 1.0,
            Self::RiskEvent => 1.3,
            Self::Hazard => 1.5,
            Self::RestSite => 0.5,
        }
    }
}

impl std::fmt::Display for EncounterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncounterType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "puzzle_chamber" => Ok(Self::PuzzleChamber),
            "trade_opportunity" => Ok(Self::TradeOpportunity),
            "discovery_site" => Ok(Self::DiscoverySite),
            "risk_event" => Ok(Self::RiskEvent),
            "hazard" => Ok(Self::Hazard),
            "rest_site" => Ok(Self::RestSite),
            _ => Err(DomainError::parse(format!("Unknown encounter type: {}", s))),
        }
    }
}

/// Layout coordinates of a node (x in 0..1 across the level, y = depth)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
}

/// A chamber at a given depth of the run map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonNode {
    pub id: NodeId,
    /// Descent level, starting at 1
    pub depth: u32,
    pub position: NodePosition,
    pub encounter_type: EncounterType,
    /// Energy spent to enter this node
    pub energy_cost: u32,
    /// Energy needed to return to the surface from this node
    pub return_cost: u32,
    pub is_revealed: bool,
    /// Nodes one level deeper reachable from here
    #[serde(default)]
    pub connections: Vec<NodeId>,
}

impl DungeonNode {
    pub fn new(
        depth: u32,
        position: NodePosition,
        encounter_type: EncounterType,
        energy_cost: u32,
        return_cost: u32,
    ) -> Self {
        Self {
            id: NodeId::new(),
            depth,
            position,
            encounter_type,
            energy_cost,
            return_cost,
            is_revealed: depth == 1,
            connections: Vec::new(),
        }
    }

    pub fn connects_to(&self, node_id: NodeId) -> bool {
        self.connections.contains(&node_id)
    }
}
