//! Cash-out use case.
//!
//! Summarizes what the player is carrying against the cost of getting home,
//! and banks the run when the player chooses to leave.

use std::collections::BTreeMap;
use std::sync::Arc;

use delve_domain::{
    CompletionSummary, DelveSettings, RunId, RunStatus, SafetyMargin, SafetyMarginManager,
};
use serde::{Deserialize, Serialize};

use crate::use_cases::run_queue::{RunQueueError, RunQueueManager};
use crate::use_cases::run_state::{RunError, RunStateManager};

/// Inventory and return-trip picture at the current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOutSummary {
    pub run_id: RunId,
    pub item_count: usize,
    pub total_value: u32,
    /// Item value grouped by collection set
    pub value_by_set: BTreeMap<String, u32>,
    pub energy_remaining: u32,
    pub return_cost: u32,
    /// Energy left after paying the return cost; negative when stranded
    pub energy_after_return: i64,
    pub can_afford_return: bool,
    pub safety: SafetyMargin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashOutResult {
    pub summary: CashOutSummary,
    pub completion: CompletionSummary,
}

pub struct CashOutManager {
    run_state: Arc<RunStateManager>,
    run_queue: Arc<RunQueueManager>,
    safety: SafetyMarginManager,
}

impl CashOutManager {
    pub fn new(
        run_state: Arc<RunStateManager>,
        run_queue: Arc<RunQueueManager>,
        settings: &DelveSettings,
    ) -> Self {
        Self {
            run_state,
            run_queue,
            safety: SafetyMarginManager::new(settings),
        }
    }

    /// Build the cash-out summary without changing anything.
    pub async fn summarize(&self) -> Result<CashOutSummary, CashOutError> {
        let state = self
            .run_state
            .current_state()
            .await
            .ok_or(RunError::NoActiveRun)?;
        let return_cost = self.run_state.current_return_cost().await?;

        let mut value_by_set: BTreeMap<String, u32> = BTreeMap::new();
        for item in &state.inventory {
            *value_by_set.entry(item.set_id.clone()).or_default() += item.value;
        }

        Ok(CashOutSummary {
            run_id: state.run_id,
            item_count: state.inventory.len(),
            total_value: state.inventory_value(),
            value_by_set,
            energy_remaining: state.energy_remaining,
            return_cost,
            energy_after_return: i64::from(state.energy_remaining) - i64::from(return_cost),
            can_afford_return: state.energy_remaining >= return_cost,
            safety: self.safety.calculate_safety_margin(
                state.energy_remaining,
                return_cost,
                state.current_depth,
            ),
        })
    }

    /// Bank the run.
    ///
    /// # Returns
    /// * `Ok(CashOutResult)` - The run is completed and its queue record updated
    /// * `Err(CashOutError::CannotAffordReturn)` - Not enough energy to get home; nothing changed
    /// * `Err(CashOutError::RecordNotUpdated)` - The run is banked but its queue
    ///   record was not updated; retry with [`CashOutManager::settle_completion`]
    pub async fn cash_out(&self) -> Result<CashOutResult, CashOutError> {
        let summary = self.summarize().await?;
        if !summary.can_afford_return {
            tracing::warn!(
                run_id = %summary.run_id,
                return_cost = summary.return_cost,
                energy_remaining = summary.energy_remaining,
                "Cash-out refused: return is unaffordable"
            );
            return Err(CashOutError::CannotAffordReturn {
                return_cost: summary.return_cost,
                energy_remaining: summary.energy_remaining,
            });
        }

        let completion = self.run_state.complete_run().await?;
        if let Err(source) = self.settle_completion(completion.run_id).await {
            return Err(CashOutError::RecordNotUpdated {
                completion: Box::new(completion),
                source,
            });
        }

        tracing::info!(
            run_id = %completion.run_id,
            items = summary.item_count,
            total_value = summary.total_value,
            xp = completion.xp,
            "Run cashed out"
        );
        Ok(CashOutResult {
            summary,
            completion,
        })
    }

    /// Mark the queue record of a banked run completed. Safe to repeat.
    pub async fn settle_completion(&self, run_id: RunId) -> Result<(), RunQueueError> {
        match self.run_queue.get_run_by_id(run_id).await? {
            Some(run) if run.status == RunStatus::Active => {
                self.run_queue
                    .update_run_status(run_id, RunStatus::Completed)
                    .await?;
            }
            Some(run) if run.status == RunStatus::Completed => {}
            Some(run) => {
                return Err(RunQueueError::OutOfStep {
                    run_id,
                    status: run.status,
                    expected: RunStatus::Completed,
                });
            }
            None => {}
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CashOutError {
    #[error("Cannot afford the return trip: {return_cost} needed, {energy_remaining} remaining")]
    CannotAffordReturn {
        return_cost: u32,
        energy_remaining: u32,
    },
    #[error("Run error: {0}")]
    Run(#[from] RunError),
    #[error("Run {} banked but its queue record was not updated: {source}", .completion.run_id)]
    RecordNotUpdated {
        completion: Box<CompletionSummary>,
        source: RunQueueError,
    },
}
