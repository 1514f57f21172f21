//! Energy economy: step conversion, node entry costs and the return cost curve.
//!
//! All functions are pure. The calculator is `Copy` and safe to share
//! across threads.

use crate::entities::{EncounterType, Shortcut};

use super::settings::DelveSettings;

/// Cost-curve math for the energy economy.
///
/// Return cost follows `round(base_rate * depth^exponent)` so each level
/// deeper costs more to climb back from than the last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCalculator {
    base_rate: f64,
    exponent: f64,
    streak_multiplier: f64,
    base_node_cost: u32,
}

impl Default for EnergyCalculator {
    fn default() -> Self {
        Self::new(&DelveSettings::default())
    }
}

impl EnergyCalculator {
    pub fn new(settings: &DelveSettings) -> Self {
        Self {
            base_rate: settings.base_return_rate,
            exponent: settings.return_cost_exponent,
            streak_multiplier: settings.streak_multiplier,
            base_node_cost: settings.base_node_cost,
        }
    }

    /// Energy earned from a day's steps, with the streak bonus applied when it holds.
    pub fn energy_from_steps(&self, steps: u32, has_streak_bonus: bool) -> u32 {
        if has_streak_bonus {
            (f64::from(steps) * self.streak_multiplier).round() as u32
        } else {
            steps
        }
    }

    /// Energy spent entering a node at `depth`. Never below 1.
    pub fn node_energy_cost(&self, depth: u32, encounter_type: EncounterType) -> u32 {
        let raw =
            f64::from(self.base_node_cost) * f64::from(depth) * encounter_type.cost_multiplier();
        (raw.round() as u32).max(1)
    }

    /// Energy needed to get back to the surface from `depth`.
    ///
    /// The largest reduction among shortcuts usable at this depth is applied
    /// before rounding; the result never drops below zero.
    pub fn calculate_return_cost(&self, depth: u32, shortcuts: &[Shortcut]) -> u32 {
        if depth == 0 {
            return 0;
        }

        let raw = self.base_rate * f64::from(depth).powf(self.exponent);
        let reduction = shortcuts
            .iter()
            .filter(|s| s.applies_at(depth))
            .map(|s| s.energy_reduction)
            .fold(0.0_f64, f64::max);

        (raw - reduction).max(0.0).round() as u32
    }

    /// Cost of walking back level by level: the sum of every level's return cost.
    pub fn calculate_cumulative_return_cost(&self, depth: u32) -> u32 {
        let total: u64 = (1..=depth)
            .map(|d| u64::from(self.calculate_return_cost(d, &[])))
            .sum();
        u32::try_from(total).unwrap_or(u32::MAX)
    }

    pub fn can_afford_return(&self, current_energy: u32, return_cost: u32) -> bool {
        current_energy >= return_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> EnergyCalculator {
        EnergyCalculator::default()
    }

    #[test]
    fn return_cost_follows_the_curve() {
        let calc = calc();
        assert_eq!(calc.calculate_return_cost(0, &[]), 0);
        assert_eq!(calc.calculate_return_cost(1, &[]), 5);
        assert_eq!(calc.calculate_return_cost(2, &[]), 14);
        assert_eq!(calc.calculate_return_cost(3, &[]), 26);
        assert_eq!(calc.calculate_return_cost(4, &[]), 40);
    }

    #[test]
    fn return_cost_strictly_increases_with_depth() {
        let calc = calc();
        for depth in 1..200 {
            assert!(
                calc.calculate_return_cost(depth + 1, &[]) > calc.calculate_return_cost(depth, &[]),
                "not increasing at depth {}",
                depth
            );
        }
    }

    #[test]
    fn cumulative_cost_sums_each_level() {
        let calc = calc();
        assert_eq!(calc.calculate_cumulative_return_cost(0), 0);
        assert_eq!(calc.calculate_cumulative_return_cost(1), 5);
        assert_eq!(calc.calculate_cumulative_return_cost(3), 5 + 14 + 26);
        for depth in 0..100 {
            assert!(
                calc.calculate_cumulative_return_cost(depth + 1)
                    > calc.calculate_cumulative_return_cost(depth)
            );
        }
    }

    #[test]
    fn best_applicable_shortcut_reduces_cost() {
        let calc = calc();
        let small = Shortcut::new(2, 1, 4.0).expect("valid");
        let large = Shortcut::new(3, 1, 10.0).expect("valid");
        let shortcuts = vec![small, large];

        // Only the depth-2 shortcut applies at depth 2: 14.14 - 4 = 10.14
        assert_eq!(calc.calculate_return_cost(2, &shortcuts), 10);
        // Both apply at depth 3, the larger wins: 25.98 - 10 = 15.98
        assert_eq!(calc.calculate_return_cost(3, &shortcuts), 16);
    }

    #[test]
    fn shortcut_reduction_is_clamped_at_zero() {
        let calc = calc();
        let huge = Shortcut::new(1, 0, 1_000.0).expect("valid");
        assert_eq!(calc.calculate_return_cost(1, &[huge]), 0);
    }

    #[test]
    fn can_afford_return_is_inclusive() {
        let calc = calc();
        assert!(calc.can_afford_return(9990, 5));
        assert!(calc.can_afford_return(5, 5));
        assert!(!calc.can_afford_return(4, 5));
    }

    #[test]
    fn streak_bonus_multiplies_and_rounds() {
        let calc = calc();
        assert_eq!(calc.energy_from_steps(10_000, false), 10_000);
        assert_eq!(calc.energy_from_steps(10_000, true), 12_000);
        assert_eq!(calc.energy_from_steps(1_234, true), 1_481);
    }

    #[test]
    fn node_cost_scales_with_depth_and_encounter() {
        let calc = calc();
        assert_eq!(calc.node_energy_cost(1, EncounterType::DiscoverySite), 10);
        assert_eq!(calc.node_energy_cost(2, EncounterType::Hazard), 30);
        assert_eq!(calc.node_energy_cost(1, EncounterType::RestSite), 5);
    }
}
