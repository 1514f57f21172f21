//! DelvingRun entity - One day's steps turned into a playable run

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::RunId;

/// Lifecycle status of a queued run.
///
/// Moves forward only: `Queued -> Active -> {Completed | Busted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Active,
    Completed,
    Busted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Busted => "busted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Busted)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Busted)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "busted" => Ok(Self::Busted),
            _ => Err(DomainError::parse(format!("Unknown run status: {}", s))),
        }
    }
}

/// A run earned from one day's step total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelvingRun {
    pub id: RunId,
    pub date: NaiveDate,
    pub steps: u32,
    /// Energy budget of the run; always positive
    pub total_energy: u32,
    pub has_streak_bonus: bool,
    pub status: RunStatus,
}

impl DelvingRun {
    /// Create a queued run. `total_energy` must already include any bonus.
    pub fn new(
        date: NaiveDate,
        steps: u32,
        total_energy: u32,
        has_streak_bonus: bool,
    ) -> Result<Self, DomainError> {
        if total_energy == 0 {
            return Err(DomainError::validation(format!(
                "run for {} has no energy ({} steps)",
                date, steps
            )));
        }
        Ok(Self {
            id: RunId::new(),
            date,
            steps,
            total_energy,
            has_streak_bonus,
            status: RunStatus::Queued,
        })
    }

    pub fn with_id(mut self, id: RunId) -> Self {
        self.id = id;
        self
    }

    /// Advance the status, rejecting backward or skipping transitions.
    pub fn transition_to(&mut self, next: RunStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_state_transition(format!(
                "run {}: {} -> {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Aggregate counts over the run queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    pub total_runs: usize,
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub busted: usize,
    pub total_energy: u64,
    pub streak_bonus_runs: usize,
    pub average_energy: f64,
}

impl RunStatistics {
    pub fn from_runs(runs: &[DelvingRun]) -> Self {
        let mut stats = Self {
            total_runs: runs.len(),
            ..Self::default()
        };

        for run in runs {
            match run.status {
                RunStatus::Queued => stats.queued += 1,
                RunStatus::Active => stats.active += 1,
                RunStatus::Completed => stats.completed += 1,
                RunStatus::Busted => stats.busted += 1,
            }
            stats.total_energy += u64::from(run.total_energy);
            if run.has_streak_bonus {
                stats.streak_bonus_runs += 1;
            }
        }

        if !runs.is_empty() {
            stats.average_energy = stats.total_energy as f64 / runs.len() as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
    }

    #[test]
    fn new_run_starts_queued() {
        let run = DelvingRun::new(date(), 8000, 8000, false).expect("valid run");
        assert_eq!(run.status, RunStatus::Queued);
    }

    #[test]
    fn zero_energy_run_is_rejected() {
        assert!(matches!(
            DelvingRun::new(date(), 0, 0, false),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn status_only_moves_forward() {
        let mut run = DelvingRun::new(date(), 500, 500, false).expect("valid run");
        assert!(run.transition_to(RunStatus::Completed).is_err());
        run.transition_to(RunStatus::Active).expect("queued -> active");
        assert!(run.transition_to(RunStatus::Queued).is_err());
        run.transition_to(RunStatus::Busted).expect("active -> busted");
        assert!(run.status.is_terminal());
        assert!(run.transition_to(RunStatus::Completed).is_err());
        assert_eq!(run.status, RunStatus::Busted);
    }

    #[test]
    fn statistics_count_each_status() {
        let mut active = DelvingRun::new(date(), 1000, 1200, true).expect("valid run");
        active.transition_to(RunStatus::Active).expect("activate");
        let queued = DelvingRun::new(date(), 3000, 3000, false).expect("valid run");

        let stats = RunStatistics::from_runs(&[active, queued]);
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.total_energy, 4200);
        assert_eq!(stats.streak_bonus_runs, 1);
        assert!((stats.average_energy - 2100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_queue_has_zero_average() {
        let stats = RunStatistics::from_runs(&[]);
        assert_eq!(stats, RunStatistics::default());
    }
}
