//! Delve settings value object
//!
//! Every tunable of the energy economy, the map generator and the safety
//! layer lives here so the engine can load it once (environment, `.env`)
//! and hand copies to the calculators and use cases.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// All configurable economy and generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelveSettings {
    // ============================================================================
    // Energy Economy
    // ============================================================================
    /// Multiplier in `round(base_rate * depth^exponent)`
    pub base_return_rate: f64,

    /// Exponent of the return cost curve
    #[serde(default = "default_return_cost_exponent")]
    pub return_cost_exponent: f64,

    /// Energy multiplier for runs earned during a qualifying streak
    pub streak_multiplier: f64,

    /// Energy cost of entering a depth-1 node before encounter scaling
    pub base_node_cost: u32,

    // ============================================================================
    // Map Generation
    // ============================================================================
    /// Depth of maps generated for new runs
    pub max_map_depth: u32,

    /// Largest depth a caller may request
    #[serde(default = "default_max_depth_ceiling")]
    pub max_depth_ceiling: u32,

    /// Attempts before generation gives up with a fatal failure
    #[serde(default = "default_generation_max_attempts")]
    pub generation_max_attempts: u32,

    // ============================================================================
    // Progression
    // ============================================================================
    /// Experience credited per level of deepest depth on cash-out
    #[serde(default = "default_xp_per_depth")]
    pub xp_per_depth: u32,

    // ============================================================================
    // Safety Zones (percent of current energy left after returning)
    // ============================================================================
    pub safe_threshold: f64,
    pub caution_threshold: f64,
    pub danger_threshold: f64,
}

fn default_return_cost_exponent() -> f64 { 1.5 }
fn default_max_depth_ceiling() -> u32 { 50 }
fn default_generation_max_attempts() -> u32 { 5 }
fn default_xp_per_depth() -> u32 { 10 }

impl Default for DelveSettings {
    fn default() -> Self {
        Self {
            base_return_rate: 5.0,
            return_cost_exponent: 1.5,
            streak_multiplier: 1.2,
            base_node_cost: 10,
            max_map_depth: 10,
            max_depth_ceiling: 50,
            generation_max_attempts: 5,
            xp_per_depth: 10,
            safe_threshold: 50.0,
            caution_threshold: 30.0,
            danger_threshold: 10.0,
        }
    }
}

impl DelveSettings {
    /// Load from environment variables, using defaults for missing values
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_return_rate: env_or("DELVE_BASE_RETURN_RATE", defaults.base_return_rate),
            return_cost_exponent: env_or(
                "DELVE_RETURN_COST_EXPONENT",
                defaults.return_cost_exponent,
            ),
            streak_multiplier: env_or("DELVE_STREAK_MULTIPLIER", defaults.streak_multiplier),
            base_node_cost: env_or("DELVE_BASE_NODE_COST", defaults.base_node_cost),
            max_map_depth: env_or("DELVE_MAX_MAP_DEPTH", defaults.max_map_depth),
            max_depth_ceiling: env_or("DELVE_MAX_DEPTH_CEILING", defaults.max_depth_ceiling),
            generation_max_attempts: env_or(
                "DELVE_GENERATION_MAX_ATTEMPTS",
                defaults.generation_max_attempts,
            ),
            xp_per_depth: env_or("DELVE_XP_PER_DEPTH", defaults.xp_per_depth),
            safe_threshold: env_or("DELVE_SAFE_THRESHOLD", defaults.safe_threshold),
            caution_threshold: env_or("DELVE_CAUTION_THRESHOLD", defaults.caution_threshold),
            danger_threshold: env_or("DELVE_DANGER_THRESHOLD", defaults.danger_threshold),
        }
    }

    /// Reject settings that would break the economy's invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.base_return_rate >= 1.0) {
            return Err(DomainError::validation("base_return_rate must be at least 1.0"));
        }
        if !(self.return_cost_exponent >= 1.0) {
            return Err(DomainError::validation(
                "return_cost_exponent must be at least 1.0",
            ));
        }
        if !(self.streak_multiplier >= 1.0) {
            return Err(DomainError::validation(
                "streak_multiplier must be at least 1.0",
            ));
        }
        if self.max_map_depth == 0 || self.max_map_depth > self.max_depth_ceiling {
            return Err(DomainError::validation(format!(
                "max_map_depth must be within 1..={}",
                self.max_depth_ceiling
            )));
        }
        if self.generation_max_attempts == 0 {
            return Err(DomainError::validation(
                "generation_max_attempts must be at least 1",
            ));
        }
        if !(self.safe_threshold > self.caution_threshold
            && self.caution_threshold > self.danger_threshold
            && self.danger_threshold >= 0.0)
        {
            return Err(DomainError::validation(
                "safety thresholds must satisfy safe > caution > danger >= 0",
            ));
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DelveSettings::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_safety_thresholds() {
        let settings = DelveSettings {
            caution_threshold: 60.0,
            ..DelveSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rejects_depth_above_ceiling() {
        let settings = DelveSettings {
            max_map_depth: 51,
            ..DelveSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let json = r#"{
            "baseReturnRate": 4.0,
            "streakMultiplier": 1.5,
            "baseNodeCost": 12,
            "maxMapDepth": 8,
            "safeThreshold": 50.0,
            "cautionThreshold": 30.0,
            "dangerThreshold": 10.0
        }"#;
        let settings: DelveSettings = serde_json::from_str(json).expect("deserialize");
        assert_eq!(settings.return_cost_exponent, 1.5);
        assert_eq!(settings.generation_max_attempts, 5);
        assert_eq!(settings.max_map_depth, 8);
    }
}
