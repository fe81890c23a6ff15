//! Configuration checks (board manifest, partition table, build directory).

use crate::config::Config;
use crate::factory::board::{Board, BoardManifest};
use crate::factory::layout;

use super::types::CheckResult;

pub fn check_configuration(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let manifest = match &config.board_file {
        Some(path) => match BoardManifest::load(path) {
            Ok(manifest) => {
                results.push(CheckResult::pass_with("board manifest", &path.display().to_string()));
                Some(manifest)
            }
            Err(e) => {
                results.push(CheckResult::fail("board manifest", &format!("{:#}", e)));
                None
            }
        },
        None => {
            results.push(CheckResult::warn(
                "board manifest",
                "FW_BOARD_FILE not set, board fields must come from FW_* overrides",
            ));
            Some(BoardManifest::default())
        }
    };

    if let Some(manifest) = manifest {
        match Board::resolve(&manifest, &config.board_overrides) {
            Ok(board) => results.push(CheckResult::pass_with(
                "board parameters",
                &format!(
                    "{} {} {} {}, max app {} bytes",
                    board.flash.chip,
                    board.flash.mode,
                    board.flash.freq,
                    board.flash.size,
                    board.max_app_size
                ),
            )),
            Err(e) => results.push(CheckResult::fail("board parameters", &e.to_string())),
        }
    }

    match config.partitions.as_deref() {
        Some(table) => match layout::lookup(table) {
            Ok(layout) => results.push(CheckResult::pass_with(
                "partition table",
                &format!("{} (fs at {:#x})", layout.table, layout.fs_offset),
            )),
            Err(e) => results.push(CheckResult::fail("partition table", &e.to_string())),
        },
        None => results.push(CheckResult::fail("partition table", "FW_PARTITIONS not set")),
    }

    if let Some(file) = &config.safeboot_file {
        if file.is_file() {
            results.push(CheckResult::pass_with("recovery image", &file.display().to_string()));
        } else {
            results.push(CheckResult::fail(
                "recovery image",
                &format!("FW_SAFEBOOT_FILE does not exist: {}", file.display()),
            ));
        }
    }

    let build_dir = config.build_dir();
    match std::fs::create_dir_all(&build_dir) {
        Ok(()) => results.push(CheckResult::pass_with(
            "build directory",
            &build_dir.display().to_string(),
        )),
        Err(e) => results.push(CheckResult::fail(
            "build directory",
            &format!("Cannot create {}: {}", build_dir.display(), e),
        )),
    }

    results
}
