mod config;
pub mod item_db;
pub mod migrations;
#[cfg(test)]
pub(crate) mod tests_support;

pub use config::{Config, MergeConfig, UserConfig};
pub use item_db::ItemDb;

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::timeline::Item;

/// Returns `~/.config/dayweave[-dev]/` based on DAYWEAVE_ENV.
///
/// Set DAYWEAVE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DAYWEAVE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("dayweave-dev")
    } else {
        base_dir.join("dayweave")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Result of a single keyed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A row matched the id. Re-applying the same value also lands here.
    Applied,
    /// No row carries the id (vanished concurrently).
    NotFound,
}

/// Storage operations the merge depends on.
///
/// Both writes are keyed by item id and idempotent, so a merge that died
/// half-way can simply be re-run.
pub trait ItemStore {
    /// Error type for storage operations.
    type Error: std::fmt::Display;

    /// The user's items that are not completed, in ordering-id order.
    fn active_items(&self, user_id: &str) -> Result<Vec<Item>, Self::Error>;

    /// Flag an item as completed.
    fn mark_completed(&self, id: &str) -> Result<WriteOutcome, Self::Error>;

    /// Record an item's position in the agenda.
    fn set_ordering_id(&self, id: &str, ordering_id: u32) -> Result<WriteOutcome, Self::Error>;
}
