//! External service port traits (step counts, progression tracking).

use async_trait::async_trait;
use chrono::NaiveDate;
use delve_domain::RunContribution;
use serde::{Deserialize, Serialize};

use super::error::{ProgressionError, StepSourceError};

/// Steps walked on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySteps {
    pub date: NaiveDate,
    pub steps: u32,
}

/// Source of daily step counts and streak status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepSourcePort: Send + Sync {
    async fn daily_steps(&self, date: NaiveDate) -> Result<DailySteps, StepSourceError>;

    /// Whether the player's walking streak grants the energy bonus on `date`.
    async fn streak_qualifies(&self, date: NaiveDate) -> Result<bool, StepSourceError>;
}

/// Receives the contribution of every successfully banked run.
///
/// Busted runs never reach this port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressionPort: Send + Sync {
    async fn record_contribution(
        &self,
        contribution: &RunContribution,
    ) -> Result<(), ProgressionError>;
}
