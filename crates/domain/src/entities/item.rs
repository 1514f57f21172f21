//! CollectedItem entity - Loot picked up during a descent

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Category of a collected item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Artifact,
    Relic,
    Gem,
    Scroll,
    TradeGood,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Relic => "relic",
            Self::Gem => "gem",
            Self::Scroll => "scroll",
            Self::TradeGood => "trade_good",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item carried in the run inventory until it is banked or lost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedItem {
    pub id: ItemId,
    pub item_type: ItemType,
    /// Collection set the item counts toward
    pub set_id: String,
    pub value: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CollectedItem {
    pub fn new(
        item_type: ItemType,
        set_id: impl Into<String>,
        value: u32,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            item_type,
            set_id: set_id.into(),
            value,
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
