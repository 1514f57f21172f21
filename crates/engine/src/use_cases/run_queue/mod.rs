//! Run queue use cases.
//!
//! Turns daily step totals into queued runs and owns the persisted run list.
//! The list lives as one JSON document under [`RUNS_KEY`]; every mutation is a
//! read-modify-write serialized by an internal lock.

use std::sync::Arc;

use chrono::NaiveDate;
use delve_domain::{DelvingRun, DomainError, EnergyCalculator, RunId, RunStatistics, RunStatus};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{KeyValueStore, StepSourceError, StepSourcePort, StorageError};
use crate::infrastructure::storage::{load_json, save_json};

pub const RUNS_KEY: &str = "delve:runs";

/// Manages the queue of runs earned from walking.
pub struct RunQueueManager {
    store: Arc<dyn KeyValueStore>,
    step_source: Arc<dyn StepSourcePort>,
    calculator: EnergyCalculator,
    write_lock: Mutex<()>,
}

impl RunQueueManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        step_source: Arc<dyn StepSourcePort>,
        calculator: EnergyCalculator,
    ) -> Self {
        Self {
            store,
            step_source,
            calculator,
            write_lock: Mutex::new(()),
        }
    }

    /// Build a queued run from one day's steps. Nothing is persisted.
    ///
    /// # Arguments
    /// * `date` - The day the steps were walked
    /// * `steps` - Step total for that day
    /// * `has_streak` - Whether the walking streak bonus applies
    ///
    /// # Returns
    /// * `Ok(DelvingRun)` - A run in the `Queued` state
    /// * `Err(RunQueueError::Validation)` - The steps yield no energy
    pub fn generate_run_from_steps(
        &self,
        date: NaiveDate,
        steps: u32,
        has_streak: bool,
    ) -> Result<DelvingRun, RunQueueError> {
        let total_energy = self.calculator.energy_from_steps(steps, has_streak);
        Ok(DelvingRun::new(date, steps, total_energy, has_streak)?)
    }

    pub async fn add_run_to_queue(&self, run: DelvingRun) -> Result<(), RunQueueError> {
        let _guard = self.write_lock.lock().await;
        let mut runs = self.load_runs().await?;

        if runs.iter().any(|r| r.id == run.id) {
            return Err(RunQueueError::DuplicateRun(run.id));
        }

        tracing::info!(
            run_id = %run.id,
            date = %run.date,
            steps = run.steps,
            total_energy = run.total_energy,
            streak_bonus = run.has_streak_bonus,
            "Run queued"
        );
        runs.push(run);
        self.save_runs(&runs).await
    }

    /// Advance a run's status.
    ///
    /// # Returns
    /// * `Ok(DelvingRun)` - The run with its new status, already persisted
    /// * `Err(RunQueueError::RunNotFound)` - No run has this id
    /// * `Err(RunQueueError::Validation)` - Backward or skipping transition
    pub async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
    ) -> Result<DelvingRun, RunQueueError> {
        let _guard = self.write_lock.lock().await;
        let mut runs = self.load_runs().await?;

        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(RunQueueError::RunNotFound(run_id))?;
        let previous = run.status;
        run.transition_to(status)?;
        let updated = run.clone();

        self.save_runs(&runs).await?;
        tracing::info!(run_id = %run_id, from = %previous, to = %status, "Run status updated");
        Ok(updated)
    }

    pub async fn get_all_runs(&self) -> Result<Vec<DelvingRun>, RunQueueError> {
        self.load_runs().await
    }

    pub async fn get_run_by_id(&self, run_id: RunId) -> Result<Option<DelvingRun>, RunQueueError> {
        Ok(self.load_runs().await?.into_iter().find(|r| r.id == run_id))
    }

    pub async fn get_run_statistics(&self) -> Result<RunStatistics, RunQueueError> {
        Ok(RunStatistics::from_runs(&self.load_runs().await?))
    }

    pub async fn clear_all_runs(&self) -> Result<(), RunQueueError> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(RUNS_KEY).await?;
        tracing::info!("Run queue cleared");
        Ok(())
    }

    /// Pull one day's steps from the step source and queue the resulting run.
    pub async fn queue_day(&self, date: NaiveDate) -> Result<DelvingRun, RunQueueError> {
        let daily = self.step_source.daily_steps(date).await?;
        let has_streak = self.step_source.streak_qualifies(date).await?;

        let run = self.generate_run_from_steps(daily.date, daily.steps, has_streak)?;
        self.add_run_to_queue(run.clone()).await?;
        Ok(run)
    }

    /// Oldest queued run by date; ties keep queue order.
    pub async fn next_queued_run(&self) -> Result<Option<DelvingRun>, RunQueueError> {
        let runs = self.load_runs().await?;
        Ok(runs
            .into_iter()
            .filter(|r| r.status == RunStatus::Queued)
            .min_by_key(|r| r.date))
    }

    async fn load_runs(&self) -> Result<Vec<DelvingRun>, RunQueueError> {
        Ok(load_json(self.store.as_ref(), RUNS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_runs(&self, runs: &[DelvingRun]) -> Result<(), RunQueueError> {
        save_json(self.store.as_ref(), RUNS_KEY, runs).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunQueueError {
    #[error("Run not found: {0}")]
    RunNotFound(RunId),
    #[error("Run already queued: {0}")]
    DuplicateRun(RunId),
    #[error("Queue record for run {run_id} is {status}; expected it to end {expected}")]
    OutOfStep {
        run_id: RunId,
        status: RunStatus,
        expected: RunStatus,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Step source error: {0}")]
    StepSource(#[from] StepSourceError),
}
