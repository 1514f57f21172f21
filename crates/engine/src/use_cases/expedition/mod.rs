//! Expedition lifecycle: starting a queued run and busting out of it.
//!
//! Ties the run queue records to the active run state so the two never
//! disagree about which run is being played.

use std::sync::Arc;

use delve_domain::{BustSummary, RunId, RunState, RunStatus};

use crate::use_cases::map_generation::{DungeonMapGenerator, MapGenerationError};
use crate::use_cases::run_queue::{RunQueueError, RunQueueManager};
use crate::use_cases::run_state::{RunError, RunStateManager};

pub struct Expedition {
    run_queue: Arc<RunQueueManager>,
    run_state: Arc<RunStateManager>,
    map_generator: Arc<DungeonMapGenerator>,
    max_map_depth: u32,
}

impl Expedition {
    pub fn new(
        run_queue: Arc<RunQueueManager>,
        run_state: Arc<RunStateManager>,
        map_generator: Arc<DungeonMapGenerator>,
        max_map_depth: u32,
    ) -> Self {
        Self {
            run_queue,
            run_state,
            map_generator,
            max_map_depth,
        }
    }

    /// Start playing a queued run.
    ///
    /// # Arguments
    /// * `run_id` - A run in the `Queued` state
    ///
    /// # Returns
    /// * `Ok(RunState)` - The new active run at the surface
    /// * `Err(ExpeditionError::RunNotFound)` / `Err(ExpeditionError::NotQueued)` - Bad run
    /// * `Err(ExpeditionError::Map)` - No valid map could be generated
    /// * `Err(ExpeditionError::Run)` - Another run is already active
    /// * `Err(ExpeditionError::Queue)` - The queue record could not be marked
    ///   active; the new run is rolled back
    pub async fn start(&self, run_id: RunId) -> Result<RunState, ExpeditionError> {
        let run = self
            .run_queue
            .get_run_by_id(run_id)
            .await?
            .ok_or(ExpeditionError::RunNotFound(run_id))?;
        if run.status != RunStatus::Queued {
            return Err(ExpeditionError::NotQueued {
                run_id,
                status: run.status,
            });
        }

        let map = self
            .map_generator
            .generate_full_map(self.max_map_depth)
            .await?;
        let state = self
            .run_state
            .initialize_run(run.id, run.total_energy, map)
            .await?;
        if let Err(e) = self
            .run_queue
            .update_run_status(run.id, RunStatus::Active)
            .await
        {
            if let Err(rollback) = self.run_state.abandon(run.id).await {
                tracing::error!(
                    run_id = %run.id,
                    error = %rollback,
                    "Could not roll back run after queue update failed"
                );
            }
            return Err(e.into());
        }

        Ok(state)
    }

    /// Start the oldest queued run, if there is one.
    pub async fn start_next(&self) -> Result<Option<RunState>, ExpeditionError> {
        match self.run_queue.next_queued_run().await? {
            Some(run) => Ok(Some(self.start(run.id).await?)),
            None => Ok(None),
        }
    }

    /// Abandon the active run and mark its queue record busted.
    ///
    /// # Returns
    /// * `Ok(BustSummary)` - The run is over and its record is busted
    /// * `Err(ExpeditionError::RecordNotUpdated)` - The run is over but its
    ///   record was not updated; retry with [`Expedition::settle_bust`]
    pub async fn bust(&self) -> Result<BustSummary, ExpeditionError> {
        let summary = self.run_state.bust_run().await?;

        if let Err(source) = self.settle_bust(summary.run_id).await {
            return Err(ExpeditionError::RecordNotUpdated { summary, source });
        }
        Ok(summary)
    }

    /// Mark the queue record of a busted run. Safe to repeat.
    pub async fn settle_bust(&self, run_id: RunId) -> Result<(), RunQueueError> {
        match self.run_queue.get_run_by_id(run_id).await? {
            Some(run) if run.status == RunStatus::Active => {
                self.run_queue
                    .update_run_status(run_id, RunStatus::Busted)
                    .await?;
            }
            Some(run) if run.status == RunStatus::Busted => {}
            Some(run) => {
                return Err(RunQueueError::OutOfStep {
                    run_id,
                    status: run.status,
                    expected: RunStatus::Busted,
                });
            }
            None => {}
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExpeditionError {
    #[error("Run not found: {0}")]
    RunNotFound(RunId),
    #[error("Run {run_id} is {status}, not queued")]
    NotQueued { run_id: RunId, status: RunStatus },
    #[error("Run queue error: {0}")]
    Queue(#[from] RunQueueError),
    #[error("Run error: {0}")]
    Run(#[from] RunError),
    #[error("Map generation error: {0}")]
    Map(#[from] MapGenerationError),
    #[error("Run {} busted but its queue record was not updated: {source}", .summary.run_id)]
    RecordNotUpdated {
        summary: BustSummary,
        source: RunQueueError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedRandom, SeededRandom};
    use crate::infrastructure::ports::{KeyValueStore, RandomPort};
    use crate::infrastructure::progression::ProgressionLog;
    use crate::infrastructure::step_source::FixedStepSource;
    use crate::test_fixtures::{run_state_manager, test_date, FlakyStore};
    use crate::use_cases::run_queue::RUNS_KEY;
    use crate::use_cases::run_state::ACTIVE_RUN_KEY;
    use delve_domain::{DelveSettings, EnergyCalculator};

    struct Fixture {
        expedition: Expedition,
        run_queue: Arc<RunQueueManager>,
        run_state: Arc<RunStateManager>,
        progression: Arc<ProgressionLog>,
        store: Arc<FlakyStore>,
    }

    fn fixture(random: Arc<dyn RandomPort>) -> Fixture {
        let store = Arc::new(FlakyStore::new());
        let progression = Arc::new(ProgressionLog::new());
        let run_state = Arc::new(run_state_manager(store.clone(), progression.clone()));
        let run_queue = Arc::new(RunQueueManager::new(
            store.clone(),
            Arc::new(FixedStepSource::new(3_000, false)),
            EnergyCalculator::default(),
        ));
        let generator = Arc::new(DungeonMapGenerator::new(random, &DelveSettings::default()));
        Fixture {
            expedition: Expedition::new(run_queue.clone(), run_state.clone(), generator, 5),
            run_queue,
            run_state,
            progression,
            store,
        }
    }

    async fn status_of(f: &Fixture, run_id: RunId) -> Option<RunStatus> {
        f.run_queue
            .get_run_by_id(run_id)
            .await
            .expect("lookup")
            .map(|r| r.status)
    }

    #[tokio::test]
    async fn start_activates_run_with_fresh_map() {
        let f = fixture(Arc::new(SeededRandom::new(8)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");

        let state = f.expedition.start(run.id).await.expect("start");
        assert_eq!(state.run_id, run.id);
        assert_eq!(state.energy_remaining, 3_000);

        let map = f.run_state.current_map().await.expect("map");
        assert_eq!(map.max_depth(), 5);
        let stored = f.run_queue.get_run_by_id(run.id).await.expect("lookup");
        assert_eq!(stored.map(|r| r.status), Some(RunStatus::Active));
    }

    #[tokio::test]
    async fn start_next_picks_the_queued_run() {
        let f = fixture(Arc::new(SeededRandom::new(2)));
        assert!(f.expedition.start_next().await.expect("empty").is_none());

        let run = f.run_queue.queue_day(test_date()).await.expect("queue");
        let state = f
            .expedition
            .start_next()
            .await
            .expect("start")
            .expect("a run");
        assert_eq!(state.run_id, run.id);
    }

    #[tokio::test]
    async fn only_queued_runs_can_start() {
        let f = fixture(Arc::new(SeededRandom::new(4)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");
        f.expedition.start(run.id).await.expect("start");
        f.expedition.bust().await.expect("bust");

        let err = f.expedition.start(run.id).await.expect_err("busted run");
        assert!(matches!(
            err,
            ExpeditionError::NotQueued {
                status: RunStatus::Busted,
                ..
            }
        ));
        assert!(matches!(
            f.expedition.start(RunId::new()).await,
            Err(ExpeditionError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn second_start_while_active_fails() {
        let f = fixture(Arc::new(SeededRandom::new(6)));
        let first = f.run_queue.queue_day(test_date()).await.expect("queue");
        let second = f.run_queue.queue_day(test_date()).await.expect("queue");
        f.expedition.start(first.id).await.expect("start");

        let err = f.expedition.start(second.id).await.expect_err("busy");
        assert!(matches!(err, ExpeditionError::Run(RunError::AlreadyActive(_))));
        let stored = f.run_queue.get_run_by_id(second.id).await.expect("lookup");
        assert_eq!(stored.map(|r| r.status), Some(RunStatus::Queued));
    }

    #[tokio::test]
    async fn bust_marks_record_and_skips_progression() {
        let f = fixture(Arc::new(SeededRandom::new(10)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");
        f.expedition.start(run.id).await.expect("start");

        let summary = f.expedition.bust().await.expect("bust");
        assert_eq!(summary.energy_lost, 3_000);
        assert!(f.progression.contributions().await.is_empty());

        let stored = f.run_queue.get_run_by_id(run.id).await.expect("lookup");
        assert_eq!(stored.map(|r| r.status), Some(RunStatus::Busted));
    }

    #[tokio::test]
    async fn map_failure_leaves_run_queued() {
        let f = fixture(Arc::new(FixedRandom(99)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");

        let err = f.expedition.start(run.id).await.expect_err("no map");
        assert!(matches!(
            err,
            ExpeditionError::Map(MapGenerationError::GenerationFailure { .. })
        ));
        assert!(!f.run_state.has_active_run().await);
        let stored = f.run_queue.get_run_by_id(run.id).await.expect("lookup");
        assert_eq!(stored.map(|r| r.status), Some(RunStatus::Queued));
    }

    #[tokio::test]
    async fn failed_queue_update_rolls_back_the_started_run() {
        let f = fixture(Arc::new(SeededRandom::new(12)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");

        f.store.fail_next("set", RUNS_KEY);
        let err = f.expedition.start(run.id).await.expect_err("queue write fails");
        assert!(matches!(err, ExpeditionError::Queue(RunQueueError::Storage(_))));
        assert!(!f.run_state.has_active_run().await);
        assert_eq!(f.store.get(ACTIVE_RUN_KEY).await.expect("get"), None);
        assert_eq!(status_of(&f, run.id).await, Some(RunStatus::Queued));

        f.expedition.start(run.id).await.expect("retry");
        assert_eq!(status_of(&f, run.id).await, Some(RunStatus::Active));
    }

    #[tokio::test]
    async fn bust_reports_summary_when_record_update_fails() {
        let f = fixture(Arc::new(SeededRandom::new(14)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");
        f.expedition.start(run.id).await.expect("start");

        f.store.fail_next("set", RUNS_KEY);
        let err = f.expedition.bust().await.expect_err("queue write fails");
        let ExpeditionError::RecordNotUpdated { summary, .. } = err else {
            panic!("expected RecordNotUpdated, got {err:?}");
        };
        assert_eq!(summary.run_id, run.id);
        assert!(!f.run_state.has_active_run().await);
        assert_eq!(status_of(&f, run.id).await, Some(RunStatus::Active));

        f.expedition.settle_bust(run.id).await.expect("settle");
        f.expedition.settle_bust(run.id).await.expect("settle again");
        assert_eq!(status_of(&f, run.id).await, Some(RunStatus::Busted));
        assert!(f.progression.contributions().await.is_empty());
    }

    #[tokio::test]
    async fn settling_a_bust_rejects_a_record_that_never_started() {
        let f = fixture(Arc::new(SeededRandom::new(16)));
        let run = f.run_queue.queue_day(test_date()).await.expect("queue");

        let err = f.expedition.settle_bust(run.id).await.expect_err("queued");
        assert!(matches!(
            err,
            RunQueueError::OutOfStep {
                status: RunStatus::Queued,
                expected: RunStatus::Busted,
                ..
            }
        ));
    }
}
