//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `version` - Resolve the build version and write the constants artifact
//! - `factory` - Compose the factory image
//! - `show` - Display configuration, version or layouts
//! - `clean` - Remove generated artifacts
//! - `preflight` - Run preflight checks

pub mod clean;
pub mod factory;
mod preflight;
pub mod show;
pub mod version;

pub use clean::cmd_clean;
pub use factory::cmd_factory;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
pub use version::cmd_version;
