//! Board manifest parsing and flash parameter normalization.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::BoardOverrides;
use crate::error::BuildError;

pub const DEFAULT_FLASH_MODE: &str = "dio";
pub const DEFAULT_FLASH_FREQ: &str = "40m";
pub const DEFAULT_MEMORY_TYPE: &str = "qio_qspi";
/// Tells the merge tool to keep the size recorded in the bootloader header.
pub const DEFAULT_FLASH_SIZE: &str = "keep";

/// PlatformIO-style board manifest. Only the fields the composer reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    pub mcu: Option<String>,
    pub f_flash: Option<String>,
    pub flash_mode: Option<String>,
    #[serde(default)]
    pub arduino: ArduinoSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArduinoSection {
    pub memory_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSection {
    pub flash_size: Option<String>,
    pub maximum_size: Option<u64>,
}

impl BoardManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read board manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse board manifest {}", path.display()))
    }
}

/// Flash parameters handed to the merge tool, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashParams {
    pub chip: String,
    pub mode: String,
    pub freq: String,
    pub size: String,
}

/// What the composer needs to know about the target board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub flash: FlashParams,
    pub max_app_size: u64,
}

impl Board {
    /// Merge the manifest with configuration overrides and normalize.
    pub fn resolve(manifest: &BoardManifest, overrides: &BoardOverrides) -> Result<Self> {
        let chip = overrides
            .mcu
            .clone()
            .or_else(|| manifest.build.mcu.clone())
            .ok_or(BuildError::MissingBoardField("build.mcu"))?;

        let max_app_size = overrides
            .max_app_size
            .or(manifest.upload.maximum_size)
            .ok_or(BuildError::MissingBoardField("upload.maximum_size"))?;

        let mode = overrides
            .flash_mode
            .as_deref()
            .or(manifest.build.flash_mode.as_deref())
            .unwrap_or(DEFAULT_FLASH_MODE);
        let memory_type = overrides
            .memory_type
            .as_deref()
            .or(manifest.build.arduino.memory_type.as_deref())
            .unwrap_or(DEFAULT_MEMORY_TYPE);
        let freq = overrides
            .flash_freq
            .as_deref()
            .or(manifest.build.f_flash.as_deref())
            .unwrap_or(DEFAULT_FLASH_FREQ);
        let size = overrides
            .flash_size
            .clone()
            .or_else(|| manifest.upload.flash_size.clone())
            .unwrap_or_else(|| DEFAULT_FLASH_SIZE.to_string());

        Ok(Self {
            flash: FlashParams {
                chip: chip.to_lowercase(),
                mode: normalize_flash_mode(mode, memory_type),
                freq: normalize_flash_freq(freq),
                size,
            },
            max_app_size,
        })
    }
}

/// Quad modes are written as `dio` in the merged image; octal-flash boards
/// need `dout`.
pub fn normalize_flash_mode(mode: &str, memory_type: &str) -> String {
    let mode = mode.trim().to_lowercase();
    let mode = match mode.as_str() {
        "qio" | "qout" => DEFAULT_FLASH_MODE.to_string(),
        _ => mode,
    };
    match memory_type.trim().to_lowercase().as_str() {
        "opi_opi" | "opi_qspi" => "dout".to_string(),
        _ => mode,
    }
}

/// `80000000L` -> `80m`. Values already in short form pass through.
pub fn normalize_flash_freq(freq: &str) -> String {
    freq.trim().replace("000000L", "m")
}
