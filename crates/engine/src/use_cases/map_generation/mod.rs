//! Dungeon map generation.
//!
//! Builds a layered map of 2-3 nodes per depth, links every node to at least
//! one node below it and every node below to at least one above, then checks
//! the result with the domain validator. A map that fails validation is
//! regenerated up to the configured attempt limit; after that the generator
//! gives up with [`MapGenerationError::GenerationFailure`].

use std::sync::Arc;

use delve_domain::{
    validate_map_for_depth, DelveSettings, DomainError, DungeonMap, DungeonNode, EncounterType,
    EnergyCalculator, MapValidationError, NodePosition, MAX_NODES_PER_DEPTH, MIN_NODES_PER_DEPTH,
};

use crate::infrastructure::ports::RandomPort;

pub struct DungeonMapGenerator {
    random: Arc<dyn RandomPort>,
    calculator: EnergyCalculator,
    max_depth_ceiling: u32,
    max_attempts: u32,
}

impl DungeonMapGenerator {
    pub fn new(random: Arc<dyn RandomPort>, settings: &DelveSettings) -> Self {
        Self {
            random,
            calculator: EnergyCalculator::new(settings),
            max_depth_ceiling: settings.max_depth_ceiling,
            max_attempts: settings.generation_max_attempts.max(1),
        }
    }

    /// Generate a validated map spanning depths `1..=max_depth`.
    ///
    /// # Returns
    /// * `Ok(DungeonMap)` - A map that passed validation
    /// * `Err(MapGenerationError::Validation)` - `max_depth` is 0 or above the ceiling
    /// * `Err(MapGenerationError::GenerationFailure)` - Every attempt produced a broken map
    pub async fn generate_full_map(
        &self,
        max_depth: u32,
    ) -> Result<DungeonMap, MapGenerationError> {
        if max_depth == 0 || max_depth > self.max_depth_ceiling {
            return Err(DomainError::validation(format!(
                "max depth must be within 1..={}, got {}",
                self.max_depth_ceiling, max_depth
            ))
            .into());
        }

        let mut last_errors = Vec::new();
        for attempt in 1..=self.max_attempts {
            let nodes = self.generate_nodes(max_depth);
            let validation = validate_map_for_depth(&nodes, max_depth);

            if validation.is_valid {
                tracing::debug!(attempt, max_depth, nodes = nodes.len(), "Generated dungeon map");
                return Ok(DungeonMap::from_nodes(nodes));
            }

            tracing::warn!(
                attempt,
                max_depth,
                errors = validation.errors.len(),
                first_error = ?validation.errors.first(),
                "Generated map failed validation"
            );
            last_errors = validation.errors;
            tokio::task::yield_now().await;
        }

        Err(MapGenerationError::GenerationFailure {
            attempts: self.max_attempts,
            errors: last_errors,
        })
    }

    fn generate_nodes(&self, max_depth: u32) -> Vec<DungeonNode> {
        let mut levels: Vec<Vec<DungeonNode>> = (1..=max_depth)
            .map(|depth| self.generate_level(depth))
            .collect();

        for upper_index in 1..levels.len() {
            let (above, below) = levels.split_at_mut(upper_index);
            if let (Some(upper), Some(lower)) = (above.last_mut(), below.first()) {
                self.connect_levels(upper, lower);
            }
        }

        levels.into_iter().flatten().collect()
    }

    fn generate_level(&self, depth: u32) -> Vec<DungeonNode> {
        let count = self
            .random
            .gen_range(MIN_NODES_PER_DEPTH as i32, MAX_NODES_PER_DEPTH as i32)
            .max(0) as usize;
        let return_cost = self.calculator.calculate_return_cost(depth, &[]);

        (0..count)
            .map(|i| {
                let encounter_type = self.draw_encounter(depth);
                DungeonNode::new(
                    depth,
                    NodePosition {
                        x: (i + 1) as f32 / (count + 1) as f32,
                        y: depth as f32,
                    },
                    encounter_type,
                    self.calculator.node_energy_cost(depth, encounter_type),
                    return_cost,
                )
            })
            .collect()
    }

    /// Link each node in `upper` to one or two nodes in `lower`, then give any
    /// node in `lower` left without a parent a link from a random upper node.
    fn connect_levels(&self, upper: &mut [DungeonNode], lower: &[DungeonNode]) {
        if lower.is_empty() {
            return;
        }
        let last_lower = lower.len() as i32 - 1;

        for node in upper.iter_mut() {
            let links = self.random.gen_range(1, 2).clamp(1, 2);
            for _ in 0..links {
                let target = usize::try_from(self.random.gen_range(0, last_lower))
                    .ok()
                    .and_then(|i| lower.get(i));
                if let Some(target) = target {
                    if !node.connects_to(target.id) {
                        node.connections.push(target.id);
                    }
                }
            }
        }

        let last_upper = upper.len() as i32 - 1;
        for target in lower {
            if upper.iter().any(|n| n.connects_to(target.id)) {
                continue;
            }
            let parent = usize::try_from(self.random.gen_range(0, last_upper))
                .ok()
                .and_then(|i| upper.get_mut(i));
            if let Some(parent) = parent {
                parent.connections.push(target.id);
            }
        }
    }

    /// Weighted draw over the closed set of encounter types.
    fn draw_encounter(&self, depth: u32) -> EncounterType {
        let total: u32 = EncounterType::ALL.iter().map(|t| t.weight_at(depth)).sum();
        if total == 0 {
            return EncounterType::PuzzleChamber;
        }

        let mut roll = self.random.gen_range(0, total as i32 - 1).max(0) as u32;
        for encounter_type in EncounterType::ALL {
            let weight = encounter_type.weight_at(depth);
            if roll < weight {
                return encounter_type;
            }
            roll -= weight;
        }
        EncounterType::RestSite
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapGenerationError {
    #[error("Invalid generation parameters: {0}")]
    Validation(#[from] DomainError),
    #[error("Map generation failed after {attempts} attempts")]
    GenerationFailure {
        attempts: u32,
        errors: Vec<MapValidationError>,
    },
}
