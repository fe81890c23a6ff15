//! Shared test utilities for fwforge tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use fwforge::download::Fetcher;
use fwforge::factory::bootloader::{ProjectBuilder, PROJECT_OUTPUT};
use fwforge::factory::merge::{ImageMerger, MergeRequest};
use fwforge::version::Vcs;

/// Temporary project with a build directory.
pub struct TestEnv {
    /// Kept alive for the lifetime of the TestEnv
    pub _temp_dir: TempDir,
    pub base_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        let build_dir = base_dir.join(".pio/build/esp32dev");
        fs::create_dir_all(&build_dir).expect("Failed to create build dir");
        Self {
            _temp_dir: temp_dir,
            base_dir,
            build_dir,
        }
    }

    /// Write `size` bytes of 0xFF at `rel` under the base directory.
    pub fn image(&self, rel: &str, size: usize) -> PathBuf {
        let path = self.base_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create image dir");
        }
        fs::write(&path, vec![0xFFu8; size]).expect("Failed to write image");
        path
    }

    pub fn board_file(&self, max_size: u64) -> PathBuf {
        let path = self.base_dir.join("boards/esp32dev.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            format!(
                r#"{{
  "name": "Espressif ESP32 Dev Module",
  "build": {{ "mcu": "esp32", "f_flash": "40000000L", "flash_mode": "qio" }},
  "upload": {{ "flash_size": "4MB", "maximum_size": {} }}
}}"#,
                max_size
            ),
        )
        .unwrap();
        path
    }
}

/// Scripted checkout state.
pub struct FakeVcs {
    pub hash: Option<String>,
    pub branch: Option<String>,
    pub dirty: Option<bool>,
    pub dirty_checked: Cell<bool>,
}

impl FakeVcs {
    pub fn new(hash: &str, branch: &str, dirty: bool) -> Self {
        Self {
            hash: Some(hash.to_string()),
            branch: Some(branch.to_string()),
            dirty: Some(dirty),
            dirty_checked: Cell::new(false),
        }
    }

    /// Every query fails, as outside a checkout.
    pub fn broken() -> Self {
        Self {
            hash: None,
            branch: None,
            dirty: None,
            dirty_checked: Cell::new(false),
        }
    }
}

impl Vcs for FakeVcs {
    fn head_hash(&self) -> Result<String> {
        self.hash.clone().ok_or_else(|| anyhow!("not a git repository"))
    }

    fn current_branch(&self) -> Result<String> {
        self.branch.clone().ok_or_else(|| anyhow!("HEAD is detached"))
    }

    fn is_dirty(&self) -> Result<bool> {
        self.dirty_checked.set(true);
        self.dirty.ok_or_else(|| anyhow!("not a git repository"))
    }
}

/// Records merge calls and writes the concatenated sections as output.
#[derive(Default)]
pub struct FakeMerger {
    pub calls: RefCell<Vec<Vec<String>>>,
    pub fail: bool,
}

impl ImageMerger for FakeMerger {
    fn merge(&self, request: &MergeRequest<'_>) -> Result<()> {
        self.calls.borrow_mut().push(request.args());
        if self.fail {
            fs::write(request.output, b"partial")?;
            return Err(anyhow!("esptool merge_bin failed (exit code 2)"));
        }
        let mut out = Vec::new();
        for section in request.sections {
            out.extend(fs::read(&section.path)?);
        }
        fs::write(request.output, out)?;
        Ok(())
    }
}

impl FakeMerger {
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

/// Serves a fixed body and status.
pub struct FakeFetcher {
    pub status: u16,
    pub body: Vec<u8>,
    pub calls: Cell<usize>,
}

impl FakeFetcher {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            calls: Cell::new(0),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"not found".to_vec(),
            calls: Cell::new(0),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn get(&self, _url: &str, dest: &Path) -> Result<u16> {
        self.calls.set(self.calls.get() + 1);
        fs::write(dest, &self.body)?;
        Ok(self.status)
    }
}

/// Pretends to build the recovery project, optionally producing output.
pub struct FakeBuilder {
    pub produce: bool,
    pub boards: RefCell<Vec<String>>,
}

impl FakeBuilder {
    pub fn producing() -> Self {
        Self {
            produce: true,
            boards: RefCell::new(Vec::new()),
        }
    }

    pub fn silent_failure() -> Self {
        Self {
            produce: false,
            boards: RefCell::new(Vec::new()),
        }
    }
}

impl ProjectBuilder for FakeBuilder {
    fn build(&self, project_dir: &Path, board: &str) -> Result<()> {
        self.boards.borrow_mut().push(board.to_string());
        if self.produce {
            let out = project_dir.join(PROJECT_OUTPUT);
            fs::create_dir_all(out.parent().unwrap())?;
            fs::write(out, vec![0xAAu8; 256])?;
        }
        Ok(())
    }
}
