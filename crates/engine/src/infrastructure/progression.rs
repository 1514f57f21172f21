//! Progression tracker adapters.

use async_trait::async_trait;
use delve_domain::RunContribution;
use tokio::sync::RwLock;

use crate::infrastructure::ports::{ProgressionError, ProgressionPort};

/// Keeps banked contributions in memory and logs each one.
#[derive(Default)]
pub struct ProgressionLog {
    contributions: RwLock<Vec<RunContribution>>,
}

impl ProgressionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contributions(&self) -> Vec<RunContribution> {
        self.contributions.read().await.clone()
    }

    pub async fn total_xp(&self) -> u64 {
        self.contributions
            .read()
            .await
            .iter()
            .map(|c| u64::from(c.xp))
            .sum()
    }
}

#[async_trait]
impl ProgressionPort for ProgressionLog {
    async fn record_contribution(
        &self,
        contribution: &RunContribution,
    ) -> Result<(), ProgressionError> {
        tracing::info!(
            run_id = %contribution.run_id,
            deepest_depth = contribution.deepest_depth,
            items = contribution.final_inventory.len(),
            xp = contribution.xp,
            "Recorded run contribution"
        );
        self.contributions.write().await.push(contribution.clone());
        Ok(())
    }
}
