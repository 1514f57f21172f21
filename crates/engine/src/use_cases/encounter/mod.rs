//! Encounter resolution at the player's current node.

use std::sync::Arc;

use delve_domain::resolve_encounter;

use crate::infrastructure::ports::RandomPort;
use crate::use_cases::run_state::{AppliedOutcome, RunError, RunStateManager};

pub struct EncounterResolver {
    run_state: Arc<RunStateManager>,
    random: Arc<dyn RandomPort>,
}

impl EncounterResolver {
    pub fn new(run_state: Arc<RunStateManager>, random: Arc<dyn RandomPort>) -> Self {
        Self { run_state, random }
    }

    /// Roll 1-100 for the current node's encounter and apply the outcome.
    ///
    /// # Returns
    /// * `Ok(AppliedOutcome)` - The outcome and what it changed
    /// * `Err(EncounterError::NoActiveRun)` - No run in progress
    /// * `Err(EncounterError::AtSurface)` - The player has not entered a node yet
    pub async fn resolve_current_node(&self) -> Result<AppliedOutcome, EncounterError> {
        let node = self
            .run_state
            .current_node()
            .await
            .map_err(|e| match e {
                RunError::NoActiveRun => EncounterError::NoActiveRun,
                other => EncounterError::Run(other),
            })?
            .ok_or(EncounterError::AtSurface)?;

        let roll = self.random.gen_range(1, 100).clamp(1, 100) as u32;
        let outcome = resolve_encounter(node.encounter_type, node.depth, roll);
        let applied = self.run_state.apply_encounter_outcome(outcome).await?;

        tracing::info!(
            node_id = %node.id,
            encounter = node.encounter_type.as_str(),
            depth = node.depth,
            roll,
            reward = ?applied.outcome.reward,
            energy_drained = applied.energy_drained,
            energy_restored = applied.energy_restored,
            energy_remaining = applied.state.energy_remaining,
            "Encounter resolved"
        );
        Ok(applied)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncounterError {
    #[error("No active run")]
    NoActiveRun,
    #[error("No encounter at the surface")]
    AtSurface,
    #[error("Run error: {0}")]
    Run(#[from] RunError),
}
