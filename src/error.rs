//! Typed build errors.
//!
//! Operations return `anyhow::Result`; the variants here are the conditions
//! callers may want to tell apart (via `downcast_ref`) from plain I/O or
//! process failures.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Partition table identifier with no known filesystem offset.
    #[error("Unknown partition table '{0}', cannot determine filesystem offset")]
    UnknownPartitionTable(String),

    #[error("Resolved branch name is empty, nothing to embed as a version")]
    EmptyBranch,

    #[error("{what} not found: {}", path.display())]
    FileNotFound { what: String, path: PathBuf },

    #[error("Firmware binary too large: {size} > {max}")]
    ImageTooLarge { size: u64, max: u64 },

    #[error("Download of {url} failed with HTTP status {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Board configuration is missing '{0}'")]
    MissingBoardField(&'static str),

    #[error("Invalid flash section '{0}' (expected '<offset> <path>')")]
    InvalidSection(String),

    #[error("Section {new} at {new_offset:#x} overlaps {existing} at {existing_offset:#x}")]
    SectionOverlap {
        new: String,
        new_offset: u32,
        existing: String,
        existing_offset: u32,
    },
}
