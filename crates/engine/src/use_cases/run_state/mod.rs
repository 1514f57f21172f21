//! Active run state machine.
//!
//! `RunStateManager` owns the one active run of a session:
//! uninitialized -> active -> {completed | busted}.
//!
//! Every mutation holds the session lock for its whole duration, works on a
//! copy of the session, persists the copy and only then commits it. A failed
//! check or a failed write leaves the in-memory run exactly as it was.

use std::collections::BTreeSet;
use std::sync::Arc;

use delve_domain::{
    BustSummary, CollectedItem, CompletionSummary, DelveSettings, DomainError, DungeonMap,
    DungeonNode, EncounterConsequence, EncounterEffect, EncounterOutcome, EncounterReward,
    EnergyCalculator, NodeId, RunId, RunState, Shortcut,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{KeyValueStore, ProgressionError, ProgressionPort, StorageError};
use crate::infrastructure::storage::{load_json, save_json};
use crate::repositories::PermanentShortcuts;

pub const ACTIVE_RUN_KEY: &str = "delve:active_run";

/// Everything persisted for the active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSession {
    pub state: RunState,
    pub map: DungeonMap,
    /// Cross-run shortcuts loaded when the run started, plus any found since
    #[serde(default)]
    pub permanent_shortcuts: Vec<Shortcut>,
    /// Nodes whose encounter has already been played
    #[serde(default)]
    pub resolved_nodes: BTreeSet<NodeId>,
    /// Set once the contribution has reached the progression tracker
    #[serde(default)]
    pub completion: Option<CompletionSummary>,
}

impl RunSession {
    fn shortcuts(&self) -> Vec<Shortcut> {
        self.permanent_shortcuts
            .iter()
            .chain(self.state.discovered_shortcuts.iter())
            .cloned()
            .collect()
    }
}

/// What applying an encounter outcome actually changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOutcome {
    pub outcome: EncounterOutcome,
    pub energy_drained: u32,
    pub energy_restored: u32,
    pub nodes_revealed: usize,
    pub state: RunState,
}

pub struct RunStateManager {
    session: Mutex<Option<RunSession>>,
    store: Arc<dyn KeyValueStore>,
    shortcuts: Arc<PermanentShortcuts>,
    progression: Arc<dyn ProgressionPort>,
    calculator: EnergyCalculator,
    xp_per_depth: u32,
}

impl RunStateManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        shortcuts: Arc<PermanentShortcuts>,
        progression: Arc<dyn ProgressionPort>,
        settings: &DelveSettings,
    ) -> Self {
        Self {
            session: Mutex::new(None),
            store,
            shortcuts,
            progression,
            calculator: EnergyCalculator::new(settings),
            xp_per_depth: settings.xp_per_depth,
        }
    }

    /// Start a run at the surface of `map`.
    ///
    /// # Arguments
    /// * `run_id` - The queued run being played
    /// * `total_energy` - Energy budget for the whole descent
    /// * `map` - The generated dungeon for this run
    ///
    /// # Returns
    /// * `Ok(RunState)` - Fresh state with full energy at depth 0
    /// * `Err(RunError::AlreadyActive)` - A run is active here or in storage
    /// * `Err(RunError::Validation)` - `total_energy` is zero
    pub async fn initialize_run(
        &self,
        run_id: RunId,
        total_energy: u32,
        map: DungeonMap,
    ) -> Result<RunState, RunError> {
        let mut guard = self.session.lock().await;

        if let Some(active) = guard.as_ref() {
            return Err(RunError::AlreadyActive(active.state.run_id));
        }
        if let Some(stored) = load_json::<RunSession>(self.store.as_ref(), ACTIVE_RUN_KEY).await? {
            return Err(RunError::AlreadyActive(stored.state.run_id));
        }

        let state = RunState::new(run_id, total_energy)?;
        let session = RunSession {
            state: state.clone(),
            map,
            permanent_shortcuts: self.shortcuts.list().await?,
            resolved_nodes: BTreeSet::new(),
            completion: None,
        };
        self.persist(&session).await?;

        tracing::info!(
            run_id = %run_id,
            total_energy,
            max_depth = session.map.max_depth(),
            permanent_shortcuts = session.permanent_shortcuts.len(),
            "Run started"
        );
        *guard = Some(session);
        Ok(state)
    }

    /// Reload a run persisted by an earlier process. Returns the active state,
    /// if any.
    pub async fn restore(&self) -> Result<Option<RunState>, RunError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(Some(session.state.clone()));
        }

        let stored = load_json::<RunSession>(self.store.as_ref(), ACTIVE_RUN_KEY).await?;
        if let Some(session) = &stored {
            tracing::info!(
                run_id = %session.state.run_id,
                depth = session.state.current_depth,
                energy_remaining = session.state.energy_remaining,
                "Restored active run"
            );
        }
        let state = stored.as_ref().map(|s| s.state.clone());
        *guard = stored;
        Ok(state)
    }

    pub async fn has_active_run(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn current_state(&self) -> Option<RunState> {
        self.session.lock().await.as_ref().map(|s| s.state.clone())
    }

    pub async fn current_map(&self) -> Option<DungeonMap> {
        self.session.lock().await.as_ref().map(|s| s.map.clone())
    }

    /// Completion of a run that is banked but not yet cleared.
    pub async fn pending_completion(&self) -> Option<CompletionSummary> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.completion.clone())
    }

    /// The node the player stands on; `None` at the surface.
    pub async fn current_node(&self) -> Result<Option<DungeonNode>, RunError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(RunError::NoActiveRun)?;
        Ok(session
            .state
            .current_node
            .and_then(|id| session.map.get(id))
            .cloned())
    }

    /// Nodes reachable with the next move.
    pub async fn next_nodes(&self) -> Result<Vec<DungeonNode>, RunError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(RunError::NoActiveRun)?;
        Ok(session
            .map
            .next_nodes(session.state.current_node)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Return cost from the current depth, using run and permanent shortcuts.
    pub async fn current_return_cost(&self) -> Result<u32, RunError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(RunError::NoActiveRun)?;
        Ok(self
            .calculator
            .calculate_return_cost(session.state.current_depth, &session.shortcuts()))
    }

    /// Spend `energy_cost` to step onto `node_id`.
    ///
    /// # Returns
    /// * `Ok(RunState)` - State after the move
    /// * `Err(RunError::InsufficientEnergy)` - Not enough energy; nothing changed
    /// * `Err(RunError::NodeNotFound)` / `Err(RunError::NodeUnreachable)` - Bad target
    pub async fn move_to_node(
        &self,
        node_id: NodeId,
        energy_cost: u32,
    ) -> Result<RunState, RunError> {
        let state = self
            .mutate(|session| {
                let node = session
                    .map
                    .get(node_id)
                    .cloned()
                    .ok_or(RunError::NodeNotFound(node_id))?;
                if !session
                    .map
                    .is_reachable_from(session.state.current_node, node_id)
                {
                    return Err(RunError::NodeUnreachable(node_id));
                }

                session.state.move_to(&node, energy_cost)?;
                session.map.reveal_around(node_id);
                Ok(session.state.clone())
            })
            .await?;

        tracing::debug!(
            run_id = %state.run_id,
            node_id = %node_id,
            depth = state.current_depth,
            energy_cost,
            energy_remaining = state.energy_remaining,
            "Moved to node"
        );
        Ok(state)
    }

    pub async fn add_to_inventory(&self, item: CollectedItem) -> Result<(), RunError> {
        let name = item.name.clone();
        let value = item.value;
        self.mutate(|session| {
            session.state.add_item(item);
            Ok(())
        })
        .await?;
        tracing::debug!(item = %name, value, "Item collected");
        Ok(())
    }

    /// Record a shortcut for this run. Permanent shortcuts are also written
    /// to the cross-run store once the run itself has been saved.
    pub async fn discover_shortcut(&self, shortcut: Shortcut) -> Result<(), RunError> {
        let mut guard = self.session.lock().await;
        let mut next = working_copy(&guard)?;

        let permanent = record_shortcut(&mut next, shortcut);
        self.persist(&next).await?;
        *guard = Some(next);
        self.keep_permanent(permanent).await;
        Ok(())
    }

    /// Apply a resolved encounter at the current node. Each node's encounter
    /// can be applied once.
    pub async fn apply_encounter_outcome(
        &self,
        outcome: EncounterOutcome,
    ) -> Result<AppliedOutcome, RunError> {
        let mut guard = self.session.lock().await;
        let mut next = working_copy(&guard)?;

        let node_id = next.state.current_node.ok_or(RunError::AtSurface)?;
        if next.resolved_nodes.contains(&node_id) {
            return Err(RunError::EncounterAlreadyResolved(node_id));
        }

        let mut permanent = None;
        match outcome.reward.clone() {
            EncounterReward::Item { item } => next.state.add_item(item),
            EncounterReward::Shortcut { shortcut } => {
                permanent = record_shortcut(&mut next, shortcut);
            }
            EncounterReward::Nothing => {}
        }

        let energy_drained = match outcome.consequence {
            EncounterConsequence::EnergyDrain { amount } => next.state.drain_energy(amount),
            EncounterConsequence::Nothing => 0,
        };

        let (energy_restored, nodes_revealed) = match outcome.effect {
            EncounterEffect::Rest { energy } => (next.state.restore_energy(energy), 0),
            EncounterEffect::RevealNextDepth => {
                (0, next.map.reveal_depth(next.state.current_depth + 1))
            }
            EncounterEffect::Nothing => (0, 0),
        };

        next.resolved_nodes.insert(node_id);
        self.persist(&next).await?;

        let applied = AppliedOutcome {
            outcome,
            energy_drained,
            energy_restored,
            nodes_revealed,
            state: next.state.clone(),
        };
        *guard = Some(next);
        self.keep_permanent(permanent).await;
        Ok(applied)
    }

    /// Bank the run. The caller must already have checked that the return is
    /// affordable.
    ///
    /// The contribution is recorded before the run is cleared, so a tracker
    /// failure leaves the run active and the call can be retried. Once the
    /// tracker has accepted it the run is frozen, and a retry after a failed
    /// storage write only finishes the cleanup.
    pub async fn complete_run(&self) -> Result<CompletionSummary, RunError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(RunError::NoActiveRun)?;
        self.sync_permanent(session).await?;

        let summary = if let Some(recorded) = session.completion.clone() {
            tracing::info!(
                run_id = %recorded.run_id,
                "Resuming completion; contribution already recorded"
            );
            recorded
        } else {
            let summary = session.state.clone().into_completion(self.xp_per_depth);
            self.progression
                .record_contribution(&summary.contribution())
                .await?;
            session.completion = Some(summary.clone());
            self.persist(session).await?;
            summary
        };

        self.store.delete(ACTIVE_RUN_KEY).await?;
        *guard = None;

        tracing::info!(
            run_id = %summary.run_id,
            deepest_depth = summary.deepest_depth,
            items = summary.final_inventory.len(),
            energy_used = summary.total_energy_used,
            xp = summary.xp,
            "Run completed"
        );
        Ok(summary)
    }

    /// End the run in failure. Items and remaining energy are forfeited;
    /// progression already earned is left alone.
    pub async fn bust_run(&self) -> Result<BustSummary, RunError> {
        let mut guard = self.session.lock().await;
        let session = working_copy(&guard)?;
        self.sync_permanent(&session).await?;
        let summary = session.state.into_bust();

        self.store.delete(ACTIVE_RUN_KEY).await?;
        *guard = None;

        tracing::info!(
            run_id = %summary.run_id,
            deepest_depth = summary.deepest_depth,
            energy_lost = summary.energy_lost,
            items_lost = summary.items_lost,
            "Run busted"
        );
        Ok(summary)
    }

    /// Drop a run that never really started. Nothing is recorded with the
    /// progression tracker. Does nothing when `run_id` is not the active run.
    pub async fn abandon(&self, run_id: RunId) -> Result<(), RunError> {
        let mut guard = self.session.lock().await;
        let active = match guard.as_ref() {
            Some(session) => Some(session.state.run_id),
            None => load_json::<RunSession>(self.store.as_ref(), ACTIVE_RUN_KEY)
                .await?
                .map(|s| s.state.run_id),
        };
        if active != Some(run_id) {
            return Ok(());
        }

        self.store.delete(ACTIVE_RUN_KEY).await?;
        *guard = None;
        tracing::warn!(run_id = %run_id, "Run abandoned");
        Ok(())
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut RunSession) -> Result<T, RunError>,
    ) -> Result<T, RunError> {
        let mut guard = self.session.lock().await;
        let mut next = working_copy(&guard)?;

        let result = apply(&mut next)?;
        self.persist(&next).await?;
        *guard = Some(next);
        Ok(result)
    }

    /// Write a permanent shortcut to the cross-run store. Runs after the
    /// session is saved, so the store never holds a shortcut the run lost.
    /// A failed write is picked up again when the run ends.
    async fn keep_permanent(&self, shortcut: Option<Shortcut>) {
        let Some(shortcut) = shortcut else {
            return;
        };
        if let Err(e) = self.shortcuts.add(&shortcut).await {
            tracing::warn!(
                error = %e,
                shortcut_id = %shortcut.id,
                "Permanent shortcut not stored; will retry when the run ends"
            );
        }
    }

    async fn sync_permanent(&self, session: &RunSession) -> Result<(), RunError> {
        for shortcut in &session.permanent_shortcuts {
            self.shortcuts.add(shortcut).await?;
        }
        Ok(())
    }

    async fn persist(&self, session: &RunSession) -> Result<(), RunError> {
        save_json(self.store.as_ref(), ACTIVE_RUN_KEY, session).await?;
        Ok(())
    }
}

/// Clone of the active session for a mutation to work on.
fn working_copy(guard: &Option<RunSession>) -> Result<RunSession, RunError> {
    let session = guard.as_ref().ok_or(RunError::NoActiveRun)?;
    if session.completion.is_some() {
        return Err(RunError::CompletionPending(session.state.run_id));
    }
    Ok(session.clone())
}

/// Add `shortcut` to the session. Returns it back when it must also be kept
/// across runs.
fn record_shortcut(session: &mut RunSession, shortcut: Shortcut) -> Option<Shortcut> {
    tracing::info!(
        from_depth = shortcut.from_depth,
        to_depth = shortcut.to_depth,
        energy_reduction = shortcut.energy_reduction,
        permanent = shortcut.is_permanent,
        "Shortcut discovered"
    );

    let permanent = shortcut.is_permanent.then(|| shortcut.clone());
    if let Some(kept) = &permanent {
        if !session.permanent_shortcuts.iter().any(|s| s.id == kept.id) {
            session.permanent_shortcuts.push(kept.clone());
        }
    }
    session.state.add_shortcut(shortcut);
    permanent
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("A run is already active: {0}")]
    AlreadyActive(RunId),
    #[error("No active run")]
    NoActiveRun,
    #[error("Run {0} is already banked; only its cleanup remains")]
    CompletionPending(RunId),
    #[error("The player is at the surface")]
    AtSurface,
    #[error("Encounter at node {0} was already resolved")]
    EncounterAlreadyResolved(NodeId),
    #[error("Insufficient energy: {required} required, {available} available")]
    InsufficientEnergy { required: u32, available: u32 },
    #[error("Node not found in the run's map: {0}")]
    NodeNotFound(NodeId),
    #[error("Node {0} is not reachable from the current position")]
    NodeUnreachable(NodeId),
    #[error("Validation error: {0}")]
    Validation(DomainError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),
}

impl From<DomainError> for RunError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InsufficientEnergy {
                required,
                available,
            } => Self::InsufficientEnergy {
                required,
                available,
            },
            other => Self::Validation(other),
        }
    }
}
