//! Recovery ("safeboot") image acquisition.
//!
//! Resolution order, first configured source wins:
//! 1. `FW_SAFEBOOT_FILE` - explicit file, used as-is
//! 2. `FW_SAFEBOOT_PROJECT` - sibling project, built for the current board
//! 3. `FW_SAFEBOOT_URL` - downloaded once into the build directory
//!
//! Nothing configured means the factory image carries no recovery image.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::download::{fetch_cached, Fetcher};
use crate::error::BuildError;
use crate::process::Cmd;
use crate::report::Reporter;

/// Build output of the recovery project, relative to its root.
pub const PROJECT_OUTPUT: &str = ".pio/build/safeboot/safeboot.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootloaderSource {
    None,
    LocalFile(PathBuf),
    BuiltFromProject(PathBuf),
    DownloadedFromUrl(String),
}

/// Builds a sibling firmware project for a board.
pub trait ProjectBuilder {
    fn build(&self, project_dir: &Path, board: &str) -> Result<()>;
}

/// `pio run -d <project>` with the board passed through `SAFEBOOT_BOARD`.
#[derive(Debug, Clone, Default)]
pub struct PioBuilder;

impl ProjectBuilder for PioBuilder {
    fn build(&self, project_dir: &Path, board: &str) -> Result<()> {
        Cmd::new("pio")
            .args(["run", "-d"])
            .arg_path(project_dir)
            .env("SAFEBOOT_BOARD", board)
            .error_msg(format!(
                "Building recovery project {} failed",
                project_dir.display()
            ))
            .run_interactive()?;
        Ok(())
    }
}

/// Inputs shared by the resolvers.
pub struct AcquireContext<'a> {
    pub board: &'a str,
    /// Where a downloaded image is cached.
    pub cache_path: &'a Path,
    pub builder: &'a dyn ProjectBuilder,
    pub fetcher: &'a dyn Fetcher,
    pub reporter: &'a Reporter,
}

impl BootloaderSource {
    /// Pick the highest-priority source present in configuration.
    pub fn from_config(config: &Config) -> Self {
        if let Some(file) = &config.safeboot_file {
            BootloaderSource::LocalFile(file.clone())
        } else if let Some(project) = &config.safeboot_project {
            BootloaderSource::BuiltFromProject(project.clone())
        } else if let Some(url) = &config.safeboot_url {
            BootloaderSource::DownloadedFromUrl(url.clone())
        } else {
            BootloaderSource::None
        }
    }

    pub fn describe(&self) -> String {
        match self {
            BootloaderSource::None => "none".to_string(),
            BootloaderSource::LocalFile(path) => format!("file {}", path.display()),
            BootloaderSource::BuiltFromProject(dir) => format!("project {}", dir.display()),
            BootloaderSource::DownloadedFromUrl(url) => format!("url {}", url),
        }
    }

    /// Resolve to an image path, or `None` when there is no recovery image.
    pub fn resolve(&self, ctx: &AcquireContext<'_>) -> Result<Option<PathBuf>> {
        match self {
            BootloaderSource::None => Ok(None),
            BootloaderSource::LocalFile(path) => Ok(Some(resolve_local(path))),
            BootloaderSource::BuiltFromProject(dir) => resolve_project(dir, ctx).map(Some),
            BootloaderSource::DownloadedFromUrl(url) => resolve_url(url, ctx).map(Some),
        }
    }
}

/// The named file is final; a missing file is reported when the section list
/// is built.
fn resolve_local(path: &Path) -> PathBuf {
    path.to_path_buf()
}

fn resolve_project(dir: &Path, ctx: &AcquireContext<'_>) -> Result<PathBuf> {
    ctx.reporter.status(format!(
        "Building recovery image for board {} in {}",
        ctx.board,
        dir.display()
    ));
    ctx.builder.build(dir, ctx.board)?;

    let image = dir.join(PROJECT_OUTPUT);
    if !image.is_file() {
        return Err(BuildError::FileNotFound {
            what: "Recovery image after project build".to_string(),
            path: image,
        }
        .into());
    }
    Ok(image)
}

fn resolve_url(url: &str, ctx: &AcquireContext<'_>) -> Result<PathBuf> {
    fetch_cached(ctx.fetcher, url, ctx.cache_path, ctx.reporter)?;
    if !ctx.cache_path.is_file() {
        return Err(BuildError::FileNotFound {
            what: "Recovery image after download".to_string(),
            path: ctx.cache_path.to_path_buf(),
        }
        .into());
    }
    Ok(ctx.cache_path.to_path_buf())
}
