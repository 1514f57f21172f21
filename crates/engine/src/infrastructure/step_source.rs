//! Step source adapters.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::infrastructure::ports::{DailySteps, StepSourceError, StepSourcePort};

/// Reports the same step count and streak status for every day.
///
/// Used by the headless runner, which takes its numbers from the environment
/// instead of a pedometer.
pub struct FixedStepSource {
    steps: u32,
    streak: bool,
}

impl FixedStepSource {
    pub fn new(steps: u32, streak: bool) -> Self {
        Self { steps, streak }
    }
}

#[async_trait]
impl StepSourcePort for FixedStepSource {
    async fn daily_steps(&self, date: NaiveDate) -> Result<DailySteps, StepSourceError> {
        Ok(DailySteps {
            date,
            steps: self.steps,
        })
    }

    async fn streak_qualifies(&self, _date: NaiveDate) -> Result<bool, StepSourceError> {
        Ok(self.streak)
    }
}
