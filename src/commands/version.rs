//! Version command - resolves the build version and writes the constants.

use anyhow::Result;

use crate::config::Config;
use crate::report::{Reporter, Verbosity};
use crate::version::{self, constants, GitCli, VersionRequest};

/// How the constants are handed to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
    /// Generated C source, registered as a build input.
    Source,
    /// `-D` flags on stdout.
    Flags,
}

pub fn request_from_config(config: &Config) -> VersionRequest {
    VersionRequest {
        build_name: config.env_name.clone(),
        board_id: config.board.clone(),
        ci_ref_name: config.ci_ref_name.clone(),
    }
}

/// Execute the version command.
pub fn cmd_version(config: &Config, format: VersionFormat, verbosity: Verbosity) -> Result<()> {
    let reporter = Reporter::new("version", verbosity);
    let git = GitCli::new(&config.base_dir);

    let info = version::resolve(&git, &request_from_config(config), &reporter)?;
    reporter.status(format!("Firmware revision: {}", info.version_string));

    match format {
        VersionFormat::Source => {
            let build_dir = config.build_dir();
            let artifacts = version::write_artifacts(&info, &build_dir)?;
            if version::register_build_input(&build_dir, &artifacts.source)? {
                reporter.detail(format!(
                    "Registered {} in {}",
                    artifacts.source.display(),
                    constants::BUILD_INPUTS_FILE
                ));
            }
            reporter.detail(format!("Metadata: {}", artifacts.metadata.display()));
            reporter.table(artifacts.source.display().to_string());
        }
        VersionFormat::Flags => {
            reporter.table(constants::render_build_flags(&info));
        }
    }
    Ok(())
}
