//! Configuration management for fwforge.
//!
//! Reads configuration from a `.env` file and environment variables.
//! Environment variables take precedence over `.env`; CLI flags (applied in
//! `main`) take precedence over both.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::factory::sections::parse_offset;

/// Default CI variable holding the branch or tag being built.
pub const DEFAULT_CI_REF_VAR: &str = "GITHUB_REF_NAME";

/// Default merge tool.
pub const DEFAULT_ESPTOOL: &str = "esptool.py";

pub const DEFAULT_RESTART_PATH: &str = "/safeboot";

/// Board fields that can be forced from configuration instead of the manifest.
#[derive(Debug, Clone, Default)]
pub struct BoardOverrides {
    pub mcu: Option<String>,
    pub flash_size: Option<String>,
    pub flash_freq: Option<String>,
    pub flash_mode: Option<String>,
    pub memory_type: Option<String>,
    pub max_app_size: Option<u64>,
}

/// fwforge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; relative paths are resolved against it.
    pub base_dir: PathBuf,
    build_dir: Option<PathBuf>,
    /// Build target / environment name (embedded as the build name).
    pub env_name: String,
    pub board: String,
    pub board_file: Option<PathBuf>,
    pub progname: String,
    pub partitions: Option<String>,
    pub safeboot_file: Option<PathBuf>,
    pub safeboot_project: Option<PathBuf>,
    pub safeboot_url: Option<String>,
    pub safeboot_offset: Option<u32>,
    pub app_offset: Option<u32>,
    /// HTTP path that reboots a device into recovery mode. Only carried for the
    /// upload-trigger hook; nothing here calls it.
    pub safeboot_restart_path: String,
    /// Raw `"<offset> <path>"` entries.
    pub extra_images: Vec<String>,
    pub board_overrides: BoardOverrides,
    pub esptool: String,
    pub ci_ref_var: String,
    /// Value of `ci_ref_var` at load time, if non-empty.
    pub ci_ref_name: Option<String>,
}

impl Config {
    /// Load configuration from `<base_dir>/.env` and the process environment.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let mut vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            let iter = dotenvy::from_path_iter(&env_path)
                .with_context(|| format!("Failed to read {}", env_path.display()))?;
            for item in iter {
                let (key, value) =
                    item.with_context(|| format!("Malformed line in {}", env_path.display()))?;
                vars.insert(key, value);
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }

        Self::from_vars(base_dir, &vars)
    }

    /// Build a configuration from an explicit key/value map.
    ///
    /// Surrounding whitespace is dropped from every value; a blank value is unset.
    pub fn from_vars(base_dir: &Path, vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let path = |key: &str| get(key).map(|s| resolve_path(base_dir, &s));
        let offset = |key: &str| -> Result<Option<u32>> {
            get(key)
                .map(|s| parse_offset(&s).with_context(|| format!("Invalid {}: '{}'", key, s)))
                .transpose()
        };

        let max_app_size = get("FW_MAX_APP_SIZE")
            .map(|s| {
                s.parse::<u64>()
                    .with_context(|| format!("Invalid FW_MAX_APP_SIZE: '{}'", s))
            })
            .transpose()?;

        let extra_images = get("FW_EXTRA_IMAGES")
            .map(|s| {
                s.split(';')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let ci_ref_var = get("FW_CI_REF_VAR").unwrap_or_else(|| DEFAULT_CI_REF_VAR.to_string());
        let ci_ref_name = get(&ci_ref_var);

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            build_dir: path("FW_BUILD_DIR"),
            env_name: get("FW_ENV").unwrap_or_else(|| "default".to_string()),
            board: get("FW_BOARD").unwrap_or_else(|| "esp32dev".to_string()),
            board_file: path("FW_BOARD_FILE"),
            progname: get("FW_PROGNAME").unwrap_or_else(|| "firmware".to_string()),
            partitions: get("FW_PARTITIONS"),
            safeboot_file: path("FW_SAFEBOOT_FILE"),
            safeboot_project: path("FW_SAFEBOOT_PROJECT"),
            safeboot_url: get("FW_SAFEBOOT_URL"),
            safeboot_offset: offset("FW_SAFEBOOT_OFFSET")?,
            app_offset: offset("FW_APP_OFFSET")?,
            safeboot_restart_path: get("FW_SAFEBOOT_RESTART_PATH")
                .unwrap_or_else(|| DEFAULT_RESTART_PATH.to_string()),
            extra_images,
            board_overrides: BoardOverrides {
                mcu: get("FW_MCU"),
                flash_size: get("FW_FLASH_SIZE"),
                flash_freq: get("FW_FLASH_FREQ"),
                flash_mode: get("FW_FLASH_MODE"),
                memory_type: get("FW_MEMORY_TYPE"),
                max_app_size,
            },
            esptool: get("FW_ESPTOOL").unwrap_or_else(|| DEFAULT_ESPTOOL.to_string()),
            ci_ref_var,
            ci_ref_name,
        })
    }

    /// Build output directory (default: `.pio/build/<env>`).
    pub fn build_dir(&self) -> PathBuf {
        self.build_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(".pio/build").join(&self.env_name))
    }

    pub fn set_build_dir(&mut self, dir: &Path) {
        self.build_dir = Some(resolve_path(&self.base_dir, &dir.to_string_lossy()));
    }

    pub fn app_image(&self) -> PathBuf {
        self.build_dir().join(format!("{}.bin", self.progname))
    }

    pub fn fs_image(&self) -> PathBuf {
        self.build_dir().join("littlefs.bin")
    }

    pub fn factory_image(&self) -> PathBuf {
        self.build_dir().join(format!("{}.factory.bin", self.progname))
    }

    /// Where a downloaded recovery image is cached between builds.
    pub fn safeboot_cache(&self) -> PathBuf {
        self.build_dir().join("safeboot.bin")
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        let opt = |v: Option<String>| v.unwrap_or_else(|| "(unset)".to_string());
        let opt_path = |v: &Option<PathBuf>| opt(v.as_ref().map(|p| p.display().to_string()));
        let opt_hex = |v: Option<u32>| opt(v.map(|o| format!("{:#x}", o)));

        println!("Configuration:");
        println!("  FW_BUILD_DIR: {}", self.build_dir().display());
        println!("  FW_ENV: {}", self.env_name);
        println!("  FW_BOARD: {}", self.board);
        println!("  FW_BOARD_FILE: {}", opt_path(&self.board_file));
        println!("  FW_PROGNAME: {}", self.progname);
        println!("  FW_PARTITIONS: {}", opt(self.partitions.clone()));
        println!("  FW_SAFEBOOT_FILE: {}", opt_path(&self.safeboot_file));
        println!("  FW_SAFEBOOT_PROJECT: {}", opt_path(&self.safeboot_project));
        println!("  FW_SAFEBOOT_URL: {}", opt(self.safeboot_url.clone()));
        println!("  FW_SAFEBOOT_OFFSET: {}", opt_hex(self.safeboot_offset));
        println!("  FW_APP_OFFSET: {}", opt_hex(self.app_offset));
        println!("  FW_SAFEBOOT_RESTART_PATH: {}", self.safeboot_restart_path);
        println!("  FW_EXTRA_IMAGES: {}", self.extra_images.join("; "));
        println!("  FW_ESPTOOL: {}", self.esptool);
        println!(
            "  {}: {}",
            self.ci_ref_var,
            opt(self.ci_ref_name.clone())
        );
    }
}

fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
