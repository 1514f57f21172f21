//! Domain entities

pub mod dungeon_node;
pub mod item;
pub mod run;
pub mod shortcut;

pub use dungeon_node::{DungeonNode, EncounterType, NodePosition};
pub use item::{CollectedItem, ItemType};
pub use run::{DelvingRun, RunStatistics, RunStatus};
pub use shortcut::Shortcut;
