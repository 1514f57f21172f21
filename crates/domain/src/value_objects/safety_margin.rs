//! Safety margin: how much room the player has left before the way home closes.
//!
//! One basis everywhere: the energy left *after* paying the return cost,
//! as a percentage of the player's current energy.

use serde::{Deserialize, Serialize};

use super::energy::EnergyCalculator;
use super::settings::DelveSettings;

/// Risk band derived from the safety percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyZone {
    Safe,
    Caution,
    Danger,
    Critical,
}

impl SafetyZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Danger => "danger",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SafetyZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the player's margin at one depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMargin {
    /// Energy left after returning; negative when the return is unaffordable
    pub remaining_energy: i64,
    pub safety_percentage: f64,
    pub safety_zone: SafetyZone,
    pub depth: u32,
}

/// How loudly a warning should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Notice,
    Warning,
    Urgent,
}

/// A risk warning, escalating with the safety zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskWarning {
    /// Reserve beyond the return cost is getting thin
    ReserveThinning { safety_percentage: f64 },
    /// Going one level deeper may leave too little to get back
    NextDescentMayStrand {
        next_depth: u32,
        next_return_cost: u32,
    },
    /// The player should head back now
    TurnBackNow { depth: u32 },
    /// The return is already unaffordable
    ReturnUnaffordable { shortfall: u32 },
}

impl RiskWarning {
    pub fn severity(&self) -> WarningSeverity {
        match self {
            Self::ReserveThinning { .. } => WarningSeverity::Notice,
            Self::NextDescentMayStrand { .. } => WarningSeverity::Warning,
            Self::TurnBackNow { .. } | Self::ReturnUnaffordable { .. } => WarningSeverity::Urgent,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::ReserveThinning { safety_percentage } => format!(
                "Only {:.0}% of your energy would remain after the climb back",
                safety_percentage
            ),
            Self::NextDescentMayStrand {
                next_depth,
                next_return_cost,
            } => format!(
                "Returning from depth {} will cost {} energy",
                next_depth, next_return_cost
            ),
            Self::TurnBackNow { depth } => {
                format!("Turn back now: depth {} leaves almost no margin", depth)
            }
            Self::ReturnUnaffordable { shortfall } => {
                format!("You are {} energy short of getting home", shortfall)
            }
        }
    }
}

/// Stateless safety queries over the energy economy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyMarginManager {
    calculator: EnergyCalculator,
    safe_threshold: f64,
    caution_threshold: f64,
    danger_threshold: f64,
}

impl Default for SafetyMarginManager {
    fn default() -> Self {
        Self::new(&DelveSettings::default())
    }
}

impl SafetyMarginManager {
    pub fn new(settings: &DelveSettings) -> Self {
        Self {
            calculator: EnergyCalculator::new(settings),
            safe_threshold: settings.safe_threshold,
            caution_threshold: settings.caution_threshold,
            danger_threshold: settings.danger_threshold,
        }
    }

    pub fn zone_for(&self, safety_percentage: f64) -> SafetyZone {
        if safety_percentage >= self.safe_threshold {
            SafetyZone::Safe
        } else if safety_percentage >= self.caution_threshold {
            SafetyZone::Caution
        } else if safety_percentage >= self.danger_threshold {
            SafetyZone::Danger
        } else {
            SafetyZone::Critical
        }
    }

    pub fn calculate_safety_margin(
        &self,
        current_energy: u32,
        return_cost: u32,
        depth: u32,
    ) -> SafetyMargin {
        let remaining_energy = i64::from(current_energy) - i64::from(return_cost);
        let safety_percentage = if current_energy == 0 {
            0.0
        } else {
            remaining_energy as f64 / f64::from(current_energy) * 100.0
        };

        SafetyMargin {
            remaining_energy,
            safety_percentage,
            safety_zone: self.zone_for(safety_percentage),
            depth,
        }
    }

    /// Warnings for the player's position, most severe last. Empty when safe.
    pub fn get_risk_warnings(
        &self,
        current_energy: u32,
        return_cost: u32,
        depth: u32,
    ) -> Vec<RiskWarning> {
        let margin = self.calculate_safety_margin(current_energy, return_cost, depth);
        let mut warnings = Vec::new();

        if margin.safety_zone >= SafetyZone::Caution {
            warnings.push(RiskWarning::ReserveThinning {
                safety_percentage: margin.safety_percentage.max(0.0),
            });
        }
        if margin.safety_zone >= SafetyZone::Danger {
            warnings.push(RiskWarning::NextDescentMayStrand {
                next_depth: depth.saturating_add(1),
                next_return_cost: self
                    .calculator
                    .calculate_return_cost(depth.saturating_add(1), &[]),
            });
        }
        if margin.safety_zone == SafetyZone::Critical {
            warnings.push(RiskWarning::TurnBackNow { depth });
        }
        if current_energy < return_cost {
            warnings.push(RiskWarning::ReturnUnaffordable {
                shortfall: return_cost - current_energy,
            });
        }

        warnings
    }

    pub fn can_continue(&self, current_energy: u32, minimum_reserve: u32) -> bool {
        current_energy > minimum_reserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SafetyMarginManager {
        SafetyMarginManager::default()
    }

    #[test]
    fn zones_follow_thresholds() {
        let m = manager();
        assert_eq!(m.calculate_safety_margin(100, 50, 3).safety_zone, SafetyZone::Safe);
        assert_eq!(m.calculate_safety_margin(100, 51, 3).safety_zone, SafetyZone::Caution);
        assert_eq!(m.calculate_safety_margin(100, 70, 3).safety_zone, SafetyZone::Caution);
        assert_eq!(m.calculate_safety_margin(100, 71, 3).safety_zone, SafetyZone::Danger);
        assert_eq!(m.calculate_safety_margin(100, 90, 3).safety_zone, SafetyZone::Danger);
        assert_eq!(m.calculate_safety_margin(100, 91, 3).safety_zone, SafetyZone::Critical);
    }

    #[test]
    fn margin_reports_remaining_after_return() {
        let margin = manager().calculate_safety_margin(9990, 5, 1);
        assert_eq!(margin.remaining_energy, 9985);
        assert_eq!(margin.safety_zone, SafetyZone::Safe);
        assert_eq!(margin.depth, 1);
    }

    #[test]
    fn unaffordable_return_goes_negative_and_critical() {
        let margin = manager().calculate_safety_margin(20, 26, 3);
        assert_eq!(margin.remaining_energy, -6);
        assert!(margin.safety_percentage < 0.0);
        assert_eq!(margin.safety_zone, SafetyZone::Critical);
    }

    #[test]
    fn zero_energy_is_critical_not_nan() {
        let margin = manager().calculate_safety_margin(0, 0, 0);
        assert_eq!(margin.safety_percentage, 0.0);
        assert_eq!(margin.safety_zone, SafetyZone::Critical);
    }

    #[test]
    fn no_warnings_when_safe() {
        assert!(manager().get_risk_warnings(1000, 40, 4).is_empty());
    }

    #[test]
    fn warnings_escalate_with_zone() {
        let m = manager();
        let caution = m.get_risk_warnings(100, 60, 2);
        let danger = m.get_risk_warnings(100, 80, 2);
        let critical = m.get_risk_warnings(100, 95, 2);

        assert_eq!(caution.len(), 1);
        assert_eq!(danger.len(), 2);
        assert_eq!(critical.len(), 3);
        assert_eq!(
            critical.last().map(RiskWarning::severity),
            Some(WarningSeverity::Urgent)
        );
        assert!(matches!(
            danger[1],
            RiskWarning::NextDescentMayStrand { next_depth: 3, next_return_cost: 26 }
        ));
    }

    #[test]
    fn unaffordable_return_adds_shortfall_warning() {
        let warnings = manager().get_risk_warnings(20, 26, 3);
        assert!(warnings.contains(&RiskWarning::ReturnUnaffordable { shortfall: 6 }));
        assert!(warnings.iter().all(|w| !w.message().is_empty()));
    }

    #[test]
    fn warnings_at_the_deepest_depth_saturate() {
        let warnings = manager().get_risk_warnings(100, 95, u32::MAX);
        assert!(warnings.iter().any(|w| matches!(
            w,
            RiskWarning::NextDescentMayStrand {
                next_depth: u32::MAX,
                ..
            }
        )));
    }

    #[test]
    fn can_continue_requires_energy_above_reserve() {
        let m = manager();
        assert!(m.can_continue(101, 100));
        assert!(!m.can_continue(100, 100));
    }
}
