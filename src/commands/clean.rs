//! Clean command - removes generated artifacts.

use anyhow::Result;

use crate::clean;
use crate::config::Config;

pub enum CleanTarget {
    /// Constants, metadata and the build-input list
    Version,
    /// Factory image and manifest
    Factory,
    /// Cached recovery image download
    Cache,
    All,
}

/// Execute the clean command.
pub fn cmd_clean(config: &Config, target: CleanTarget) -> Result<()> {
    let removed = match target {
        CleanTarget::Version => clean::clean_version(config)?,
        CleanTarget::Factory => clean::clean_factory(config)?,
        CleanTarget::Cache => clean::clean_cache(config)?,
        CleanTarget::All => clean::clean_all(config)?,
    };
    if removed == 0 {
        println!("Nothing to clean.");
    } else {
        println!("Clean complete ({} file(s) removed).", removed);
    }
    Ok(())
}
