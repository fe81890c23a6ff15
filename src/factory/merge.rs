//! Binary merge step.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::board::FlashParams;
use super::sections::ImageSection;
use crate::process::Cmd;

/// One merge invocation.
#[derive(Debug, Clone)]
pub struct MergeRequest<'a> {
    pub flash: &'a FlashParams,
    pub output: &'a Path,
    pub sections: &'a [ImageSection],
}

impl MergeRequest<'_> {
    /// Arguments in `esptool merge_bin` form.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--chip".to_string(),
            self.flash.chip.clone(),
            "merge_bin".to_string(),
            "-o".to_string(),
            self.output.to_string_lossy().into_owned(),
            "--flash_mode".to_string(),
            self.flash.mode.clone(),
            "--flash_freq".to_string(),
            self.flash.freq.clone(),
            "--flash_size".to_string(),
            self.flash.size.clone(),
        ];
        for section in self.sections {
            args.push(format!("{:#x}", section.offset));
            args.push(section.path.to_string_lossy().into_owned());
        }
        args
    }
}

/// Combines sections into one flash image.
pub trait ImageMerger {
    fn merge(&self, request: &MergeRequest<'_>) -> Result<()>;
}

/// `esptool.py merge_bin`.
#[derive(Debug, Clone)]
pub struct Esptool {
    program: PathBuf,
}

impl Esptool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ImageMerger for Esptool {
    fn merge(&self, request: &MergeRequest<'_>) -> Result<()> {
        let cmd = Cmd::new(self.program.to_string_lossy()).args(request.args());
        tracing::debug!("Using esptool arguments: {}", cmd.display());
        cmd.error_msg("esptool merge_bin failed").run_interactive()?;
        Ok(())
    }
}
