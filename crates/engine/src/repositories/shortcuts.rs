//! Permanent shortcut operations.
//!
//! Permanent shortcuts outlive the run that found them and lower the return
//! cost of every later run.

use std::sync::Arc;

use delve_domain::Shortcut;

use crate::infrastructure::ports::{KeyValueStore, StorageError};
use crate::infrastructure::storage::{load_json, save_json};

pub const PERMANENT_SHORTCUTS_KEY: &str = "delve:permanent_shortcuts";

pub struct PermanentShortcuts {
    store: Arc<dyn KeyValueStore>,
}

impl PermanentShortcuts {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All permanent shortcuts discovered so far, in discovery order.
    pub async fn list(&self) -> Result<Vec<Shortcut>, StorageError> {
        Ok(load_json(self.store.as_ref(), PERMANENT_SHORTCUTS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Record a shortcut. Returns false if it was already known.
    pub async fn add(&self, shortcut: &Shortcut) -> Result<bool, StorageError> {
        let mut shortcuts = self.list().await?;
        if shortcuts.iter().any(|s| s.id == shortcut.id) {
            return Ok(false);
        }

        let mut shortcut = shortcut.clone();
        shortcut.is_permanent = true;
        shortcuts.push(shortcut);
        save_json(self.store.as_ref(), PERMANENT_SHORTCUTS_KEY, &shortcuts).await?;

        tracing::info!(count = shortcuts.len(), "Stored permanent shortcut");
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.delete(PERMANENT_SHORTCUTS_KEY).await
    }
}
