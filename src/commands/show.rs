//! Show command - displays information.

use anyhow::Result;

use crate::config::Config;
use crate::factory::layout::KNOWN_LAYOUTS;
use crate::report::{Reporter, Verbosity};
use crate::version::{self, GitCli};

use super::version::request_from_config;

pub enum ShowTarget {
    Config,
    /// Resolve the version without writing anything
    Version,
    Layouts,
}

/// Execute the show command.
pub fn cmd_show(config: &Config, target: ShowTarget, verbosity: Verbosity) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Version => {
            let reporter = Reporter::new("version", verbosity);
            let git = GitCli::new(&config.base_dir);
            let info = version::resolve(&git, &request_from_config(config), &reporter)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        ShowTarget::Layouts => {
            println!("{:<22} {:>6} {:>10} {:>10} {:>10}", "Table", "Flash", "Safeboot", "App", "FS");
            for layout in KNOWN_LAYOUTS {
                println!(
                    "{:<22} {:>6} {:>10} {:>10} {:>10}",
                    layout.table,
                    layout.flash_size,
                    format!("{:#x}", layout.recovery_offset),
                    format!("{:#x}/{:#x}", layout.app_offset, layout.app_offset_with_recovery),
                    format!("{:#x}", layout.fs_offset),
                );
            }
        }
    }
    Ok(())
}
