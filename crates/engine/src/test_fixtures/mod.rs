//! Shared builders for engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use delve_domain::{
    DelveSettings, DungeonMap, DungeonNode, EncounterType, EnergyCalculator, NodePosition,
};

use crate::infrastructure::ports::{KeyValueStore, ProgressionPort, StorageError};
use crate::infrastructure::progression::ProgressionLog;
use crate::infrastructure::storage::InMemoryStore;
use crate::repositories::PermanentShortcuts;
use crate::use_cases::run_state::RunStateManager;

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
}

/// A valid map with two nodes per depth, each linked to both nodes below.
pub fn test_map(max_depth: u32) -> DungeonMap {
    test_map_of(max_depth, EncounterType::PuzzleChamber)
}

pub fn test_map_of(max_depth: u32, encounter_type: EncounterType) -> DungeonMap {
    let calculator = EnergyCalculator::default();
    let mut levels: Vec<Vec<DungeonNode>> = (1..=max_depth)
        .map(|depth| {
            (0..2)
                .map(|i| {
                    DungeonNode::new(
                        depth,
                        NodePosition {
                            x: (i + 1) as f32 / 3.0,
                            y: depth as f32,
                        },
                        encounter_type,
                        calculator.node_energy_cost(depth, encounter_type),
                        calculator.calculate_return_cost(depth, &[]),
                    )
                })
                .collect()
        })
        .collect();

    for d in 1..levels.len() {
        let below: Vec<_> = levels[d].iter().map(|n| n.id).collect();
        for node in &mut levels[d - 1] {
            node.connections = below.clone();
        }
    }

    DungeonMap::from_nodes(levels.into_iter().flatten().collect())
}

pub fn node_at(map: &DungeonMap, depth: u32) -> DungeonNode {
    map.nodes_at_depth(depth)
        .next()
        .cloned()
        .expect("map has a node at this depth")
}

/// Run state manager over the given store with a recording progression log.
pub fn run_state_manager(
    store: Arc<dyn KeyValueStore>,
    progression: Arc<dyn ProgressionPort>,
) -> RunStateManager {
    RunStateManager::new(
        store.clone(),
        Arc::new(PermanentShortcuts::new(store)),
        progression,
        &DelveSettings::default(),
    )
}

pub fn in_memory_run_state() -> (RunStateManager, Arc<InMemoryStore>, Arc<ProgressionLog>) {
    let store = Arc::new(InMemoryStore::new());
    let progression = Arc::new(ProgressionLog::new());
    let manager = run_state_manager(store.clone(), progression.clone());
    (manager, store, progression)
}

/// In-memory store whose next write to a chosen key can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    failures: Mutex<Vec<(&'static str, String)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `operation` ("set" or "delete") on `key`, once.
    pub fn fail_next(&self, operation: &'static str, key: &str) {
        self.failures
            .lock()
            .expect("failures lock")
            .push((operation, key.to_string()));
    }

    fn check(&self, operation: &'static str, key: &str) -> Result<(), StorageError> {
        let mut failures = self.failures.lock().expect("failures lock");
        match failures
            .iter()
            .position(|(op, k)| *op == operation && k == key)
        {
            Some(i) => {
                failures.remove(i);
                Err(StorageError::backend(operation, "database is locked"))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.check("set", key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check("delete", key)?;
        self.inner.delete(key).await
    }
}
