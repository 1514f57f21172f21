//! Repository modules - Data access wrappers around port traits.

pub mod shortcuts;

pub use shortcuts::{PermanentShortcuts, PERMANENT_SHORTCUTS_KEY};
