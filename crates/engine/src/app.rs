//! Application state and composition.

use std::sync::Arc;

use delve_domain::{DelveSettings, EnergyCalculator, SafetyMarginManager};

use crate::infrastructure::ports::{KeyValueStore, ProgressionPort, RandomPort, StepSourcePort};
use crate::repositories::PermanentShortcuts;
use crate::use_cases::{
    CashOutManager, DungeonMapGenerator, EncounterResolver, Expedition, RunQueueManager,
    RunStateManager,
};

/// Main application state.
///
/// Holds the settings, the calculators built from them and all use cases.
pub struct App {
    pub settings: DelveSettings,
    pub calculator: EnergyCalculator,
    pub safety: SafetyMarginManager,
    pub shortcuts: Arc<PermanentShortcuts>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub run_queue: Arc<RunQueueManager>,
    pub run_state: Arc<RunStateManager>,
    pub map_generator: Arc<DungeonMapGenerator>,
    pub expedition: Arc<Expedition>,
    pub encounters: Arc<EncounterResolver>,
    pub cash_out: Arc<CashOutManager>,
}

impl App {
    pub fn new(
        settings: DelveSettings,
        store: Arc<dyn KeyValueStore>,
        step_source: Arc<dyn StepSourcePort>,
        progression: Arc<dyn ProgressionPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let calculator = EnergyCalculator::new(&settings);
        let safety = SafetyMarginManager::new(&settings);
        let shortcuts = Arc::new(PermanentShortcuts::new(store.clone()));

        let run_queue = Arc::new(RunQueueManager::new(
            store.clone(),
            step_source,
            calculator,
        ));
        let run_state = Arc::new(RunStateManager::new(
            store,
            shortcuts.clone(),
            progression,
            &settings,
        ));
        let map_generator = Arc::new(DungeonMapGenerator::new(random.clone(), &settings));
        let expedition = Arc::new(Expedition::new(
            run_queue.clone(),
            run_state.clone(),
            map_generator.clone(),
            settings.max_map_depth,
        ));
        let encounters = Arc::new(EncounterResolver::new(run_state.clone(), random));
        let cash_out = Arc::new(CashOutManager::new(
            run_state.clone(),
            run_queue.clone(),
            &settings,
        ));

        Self {
            settings,
            calculator,
            safety,
            shortcuts,
            use_cases: UseCases {
                run_queue,
                run_state,
                map_generator,
                expedition,
                encounters,
                cash_out,
            },
        }
    }
}
