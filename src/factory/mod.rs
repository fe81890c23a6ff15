//! Factory image composition.
//!
//! Combines the recovery image, the application and the filesystem image
//! (plus any board-declared extra sections) into one image flashable at
//! offset 0. Either a complete image is produced or nothing is.
//!
//! Steps:
//! 0. Remove the image and manifest of any earlier build
//! 1. Look up the partition layout (unknown table -> error)
//! 2. Check the application against the board's maximum size
//! 3. Acquire the recovery image, if one is configured
//! 4. Build the section list and print it
//! 5. Merge into a temporary file
//! 6. Write the manifest, then move the image into place

pub mod board;
pub mod bootloader;
pub mod layout;
pub mod manifest;
pub mod merge;
pub mod sections;

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::download::Fetcher;
use crate::error::BuildError;
use crate::report::Reporter;

use board::{Board, BoardManifest};
use bootloader::{AcquireContext, BootloaderSource, ProjectBuilder};
use manifest::FactoryManifest;
use merge::{ImageMerger, MergeRequest};
use sections::{parse_extra_section, ImageSection, SectionList};

/// Everything needed to compose one factory image.
#[derive(Debug, Clone)]
pub struct FactoryJob {
    pub board_id: String,
    pub board: Board,
    /// Partition table identifier, e.g. `partitions-4MB.csv`.
    pub partitions: String,
    pub app_image: PathBuf,
    pub fs_image: PathBuf,
    pub output: PathBuf,
    /// Board extra sections, `"<offset> <path>"`.
    pub extra_sections: Vec<String>,
    /// Base for relative extra-section paths.
    pub base_dir: PathBuf,
    pub recovery: BootloaderSource,
    pub recovery_cache: PathBuf,
    pub recovery_offset: Option<u32>,
    pub app_offset: Option<u32>,
}

impl FactoryJob {
    pub fn from_config(config: &Config) -> Result<Self> {
        let manifest = match &config.board_file {
            Some(path) => BoardManifest::load(path)?,
            None => BoardManifest::default(),
        };
        let board = Board::resolve(&manifest, &config.board_overrides)
            .with_context(|| format!("Board '{}'", config.board))?;

        let Some(partitions) = config.partitions.clone() else {
            bail!("FW_PARTITIONS is not set, cannot determine filesystem offset");
        };

        Ok(Self {
            board_id: config.board.clone(),
            board,
            partitions,
            app_image: config.app_image(),
            fs_image: config.fs_image(),
            output: config.factory_image(),
            extra_sections: config.extra_images.clone(),
            base_dir: config.base_dir.clone(),
            recovery: BootloaderSource::from_config(config),
            recovery_cache: config.safeboot_cache(),
            recovery_offset: config.safeboot_offset,
            app_offset: config.app_offset,
        })
    }
}

/// External tools the composer drives.
pub struct Tools<'a> {
    pub builder: &'a dyn ProjectBuilder,
    pub fetcher: &'a dyn Fetcher,
    pub merger: &'a dyn ImageMerger,
}

/// A finished factory image.
#[derive(Debug, Clone)]
pub struct FactoryImage {
    pub image: PathBuf,
    pub manifest: PathBuf,
    pub sections: Vec<ImageSection>,
}

/// Application size, failing if it exceeds `max`.
pub fn check_app_size(app_image: &Path, max: u64) -> Result<u64> {
    if !app_image.is_file() {
        return Err(BuildError::FileNotFound {
            what: "Application image".to_string(),
            path: app_image.to_path_buf(),
        }
        .into());
    }
    let size = fs::metadata(app_image)
        .with_context(|| format!("Failed to stat {}", app_image.display()))?
        .len();
    if size > max {
        return Err(BuildError::ImageTooLarge { size, max }.into());
    }
    Ok(size)
}

/// Build the section list in merge order: extras, recovery, application,
/// filesystem (only if it was built).
pub fn build_sections(
    job: &FactoryJob,
    recovery: Option<&Path>,
    reporter: &Reporter,
) -> Result<SectionList> {
    let layout = layout::lookup(&job.partitions)?;
    let plan = layout.plan(recovery.is_some(), job.recovery_offset, job.app_offset);
    reporter.detail(format!(
        "Layout {} ({}): app {:#x}, fs {:#x}",
        layout.table, layout.flash_size, plan.app, plan.fs
    ));

    let mut list = SectionList::new();

    for entry in &job.extra_sections {
        let (offset, path) = parse_extra_section(entry, &job.base_dir)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.clone());
        list.push(&label, offset, &path)?;
    }

    if let (Some(image), Some(offset)) = (recovery, plan.recovery) {
        list.push("safeboot", offset, image)?;
    }

    list.push("app", plan.app, &job.app_image)?;

    if job.fs_image.is_file() {
        list.push("fs", plan.fs, &job.fs_image)?;
    } else {
        reporter.detail(format!(
            "No filesystem image at {}, skipping",
            job.fs_image.display()
        ));
    }

    Ok(list)
}

/// Compose the factory image described by `job`.
pub fn compose(job: &FactoryJob, tools: &Tools<'_>, reporter: &Reporter) -> Result<FactoryImage> {
    reporter.status("Generating factory image for serial flashing");

    // A failed run must not leave an image from an earlier build behind.
    let manifest_path = FactoryManifest::path_for(&job.output);
    remove_stale(&job.output)?;
    remove_stale(&manifest_path)?;

    // Fail on configuration before any build, download or merge work.
    layout::lookup(&job.partitions)?;
    let app_size = check_app_size(&job.app_image, job.board.max_app_size)?;
    reporter.detail(format!(
        "Application {} bytes (max {})",
        app_size, job.board.max_app_size
    ));

    reporter.detail(format!("Recovery image source: {}", job.recovery.describe()));
    let ctx = AcquireContext {
        board: &job.board_id,
        cache_path: &job.recovery_cache,
        builder: tools.builder,
        fetcher: tools.fetcher,
        reporter,
    };
    let recovery = job.recovery.resolve(&ctx)?;

    let list = build_sections(job, recovery.as_deref(), reporter)?;
    reporter.detail(format!("Merging {} sections", list.len()));

    reporter.table("    Offset | File");
    for section in list.sorted() {
        reporter.table(format!(
            " - {:>8} | {}",
            format!("{:#x}", section.offset),
            section.path.display()
        ));
    }

    let sections = list.into_vec();
    let staging = staging_path(&job.output);
    if let Some(parent) = job.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let _ = fs::remove_file(&staging);

    let request = MergeRequest {
        flash: &job.board.flash,
        output: &staging,
        sections: &sections,
    };
    let published = tools
        .merger
        .merge(&request)
        .and_then(|()| publish(job, &staging, &manifest_path, &sections));
    if let Err(e) = published {
        let _ = fs::remove_file(&staging);
        let _ = fs::remove_file(&job.output);
        let _ = fs::remove_file(&manifest_path);
        return Err(e);
    }

    reporter.status(format!("Factory image generated: {}", job.output.display()));
    Ok(FactoryImage {
        image: job.output.clone(),
        manifest: manifest_path,
        sections,
    })
}

/// Write the manifest for the staged image, then move the image into place.
fn publish(
    job: &FactoryJob,
    staging: &Path,
    manifest_path: &Path,
    sections: &[ImageSection],
) -> Result<()> {
    if !staging.is_file() {
        bail!("Merge tool reported success but wrote no image at {}", staging.display());
    }
    let mut manifest = FactoryManifest::describe(staging, &job.board.flash, sections)?;
    manifest.image = job.output.clone();
    manifest.write(manifest_path)?;
    fs::rename(staging, &job.output).with_context(|| {
        format!("Failed to move {} to {}", staging.display(), job.output.display())
    })
}

/// Remove `path`; a file that is already gone is fine.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove stale {}", path.display())),
    }
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    output.with_file_name(name)
}
