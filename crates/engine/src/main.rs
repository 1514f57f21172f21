//! Delve Engine - headless runner.
//!
//! Queues today's run from the configured step count, plays it with a simple
//! cautious policy and banks it (or busts when stranded).

use std::sync::Arc;

use anyhow::Context;
use delve_domain::{DelveSettings, SafetyZone};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delve_engine::infrastructure::{
    clock::{SeededRandom, SystemClock, SystemRandom},
    ports::{ClockPort, RandomPort},
    progression::ProgressionLog,
    step_source::FixedStepSource,
    storage::SqliteStore,
};
use delve_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delve_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Delve Engine");

    // Load configuration
    let settings = DelveSettings::from_env();
    settings.validate().context("invalid DELVE_* settings")?;
    let db_path = std::env::var("DELVE_DB").unwrap_or_else(|_| "delve.db".into());
    let steps: u32 = env_or("DELVE_STEPS", 10_000);
    let streak: bool = env_or("DELVE_STREAK", false);

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let seed = std::env::var("DELVE_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());
    let random: Arc<dyn RandomPort> = match seed {
        Some(seed) => {
            tracing::info!(seed, "Using seeded randomness");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(SystemRandom::new()),
    };

    tracing::info!(db_path = %db_path, "Opening store");
    let store = Arc::new(SqliteStore::new(&db_path, clock.clone()).await?);
    let progression = Arc::new(ProgressionLog::new());

    let app = App::new(
        settings,
        store,
        Arc::new(FixedStepSource::new(steps, streak)),
        progression.clone(),
        random,
    );

    tracing::info!(
        permanent_shortcuts = app.shortcuts.list().await?.len(),
        "Loaded permanent shortcuts"
    );

    ensure_active_run(&app, clock.as_ref()).await?;
    descend(&app).await?;
    finish(&app).await?;

    let stats = app.use_cases.run_queue.get_run_statistics().await?;
    tracing::info!(
        total_runs = stats.total_runs,
        queued = stats.queued,
        completed = stats.completed,
        busted = stats.busted,
        average_energy = stats.average_energy,
        xp_this_session = progression.total_xp().await,
        "Session finished"
    );
    Ok(())
}

/// Resume a persisted run, or queue today's steps and start the oldest queued run.
async fn ensure_active_run(app: &App, clock: &dyn ClockPort) -> anyhow::Result<()> {
    let uc = &app.use_cases;
    if let Some(state) = uc.run_state.restore().await? {
        let Some(banked) = uc.run_state.pending_completion().await else {
            tracing::info!(run_id = %state.run_id, depth = state.current_depth, "Resuming run");
            return Ok(());
        };
        uc.run_state.complete_run().await?;
        uc.cash_out.settle_completion(banked.run_id).await?;
        tracing::info!(run_id = %banked.run_id, xp = banked.xp, "Finished banking earlier run");
    }

    let today = clock.today();
    let queued_today = uc
        .run_queue
        .get_all_runs()
        .await?
        .iter()
        .any(|r| r.date == today);
    if !queued_today {
        uc.run_queue.queue_day(today).await?;
    }

    uc.expedition
        .start_next()
        .await?
        .context("no queued run to play")?;
    Ok(())
}

/// Take the cheapest next node while the position after the move stays at
/// caution or better, resolving each encounter on arrival.
async fn descend(app: &App) -> anyhow::Result<()> {
    let uc = &app.use_cases;
    loop {
        let state = uc
            .run_state
            .current_state()
            .await
            .context("run ended unexpectedly")?;
        let Some(next) = uc
            .run_state
            .next_nodes()
            .await?
            .into_iter()
            .min_by_key(|n| n.energy_cost)
        else {
            tracing::info!(depth = state.current_depth, "Reached the bottom of the map");
            return Ok(());
        };

        let after_move = state.energy_remaining.saturating_sub(next.energy_cost);
        let next_return = app.calculator.calculate_return_cost(next.depth, &[]);
        let margin = app
            .safety
            .calculate_safety_margin(after_move, next_return, next.depth);

        if state.energy_remaining < next.energy_cost || margin.safety_zone > SafetyZone::Caution {
            for warning in app
                .safety
                .get_risk_warnings(after_move, next_return, next.depth)
            {
                tracing::warn!(severity = ?warning.severity(), "{}", warning.message());
            }
            tracing::info!(depth = state.current_depth, "Turning back");
            return Ok(());
        }

        uc.run_state.move_to_node(next.id, next.energy_cost).await?;
        uc.encounters.resolve_current_node().await?;
    }
}

async fn finish(app: &App) -> anyhow::Result<()> {
    let uc = &app.use_cases;
    let summary = uc.cash_out.summarize().await?;

    if summary.can_afford_return {
        let result = uc.cash_out.cash_out().await?;
        tracing::info!(
            deepest_depth = result.completion.deepest_depth,
            items = result.summary.item_count,
            total_value = result.summary.total_value,
            energy_banked = result.summary.energy_after_return,
            xp = result.completion.xp,
            "Cashed out"
        );
    } else {
        let bust = uc.expedition.bust().await?;
        tracing::warn!(
            deepest_depth = bust.deepest_depth,
            energy_lost = bust.energy_lost,
            items_lost = bust.items_lost,
            "Stranded below the surface"
        );
    }
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
