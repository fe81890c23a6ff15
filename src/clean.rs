//! Generated artifact cleaning.
//!
//! Only removes what fwforge itself writes; compiled firmware images in the
//! build directory are left alone.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::factory::manifest::FactoryManifest;
use crate::version::constants::{BUILD_INPUTS_FILE, CONSTANTS_FILE, METADATA_FILE};

/// Remove the generated constants, metadata and build-input list.
pub fn clean_version(config: &Config) -> Result<usize> {
    let build_dir = config.build_dir();
    remove_files(&[
        build_dir.join(CONSTANTS_FILE),
        build_dir.join(METADATA_FILE),
        build_dir.join(BUILD_INPUTS_FILE),
    ])
}

/// Remove the factory image and its manifest.
pub fn clean_factory(config: &Config) -> Result<usize> {
    let image = config.factory_image();
    remove_files(&[FactoryManifest::path_for(&image), image])
}

/// Remove the cached recovery image download.
pub fn clean_cache(config: &Config) -> Result<usize> {
    remove_files(&[config.safeboot_cache()])
}

/// Remove everything fwforge generated.
pub fn clean_all(config: &Config) -> Result<usize> {
    Ok(clean_version(config)? + clean_factory(config)? + clean_cache(config)?)
}

fn remove_files(paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        if remove_if_exists(path)? {
            removed += 1;
        }
    }
    Ok(removed)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    println!("Removing {}...", path.display());
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(true)
}
