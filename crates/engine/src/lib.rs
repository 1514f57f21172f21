//! Delve Engine library.
//!
//! Runs the step-powered dungeon descent on top of `delve-domain`.
//!
//! ## Structure
//!
//! - `repositories/` - Data access wrappers around port traits
//! - `use_cases/` - Run queue, run state machine, map generation, encounters, cash-out
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod repositories;
pub mod use_cases;

/// Shared builders for unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
