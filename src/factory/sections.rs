//! The ordered list of images that go into a factory image.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// One image at one flash offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSection {
    pub label: String,
    pub offset: u32,
    pub path: PathBuf,
    pub size: u64,
}

impl ImageSection {
    /// First byte past the end of the section.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + self.size
    }

    fn overlaps(&self, other: &ImageSection) -> bool {
        u64::from(self.offset) < other.end() && u64::from(other.offset) < self.end()
    }
}

/// Sections in insertion order. Every pushed image must exist and must not
/// overlap an image already in the list.
#[derive(Debug, Clone, Default)]
pub struct SectionList {
    sections: Vec<ImageSection>,
}

impl SectionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, reading its size from disk.
    pub fn push(&mut self, label: &str, offset: u32, path: &Path) -> Result<&ImageSection> {
        if !path.is_file() {
            return Err(BuildError::FileNotFound {
                what: label.to_string(),
                path: path.to_path_buf(),
            }
            .into());
        }
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();

        let section = ImageSection {
            label: label.to_string(),
            offset,
            path: path.to_path_buf(),
            size,
        };

        if let Some(existing) = self.sections.iter().find(|s| s.overlaps(&section)) {
            return Err(BuildError::SectionOverlap {
                new: section.label.clone(),
                new_offset: section.offset,
                existing: existing.label.clone(),
                existing_offset: existing.offset,
            }
            .into());
        }

        self.sections.push(section);
        Ok(&self.sections[self.sections.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageSection> {
        self.sections.iter()
    }

    /// Sections in ascending offset order, for reporting.
    pub fn sorted(&self) -> Vec<&ImageSection> {
        let mut sorted: Vec<_> = self.sections.iter().collect();
        sorted.sort_by_key(|s| s.offset);
        sorted
    }

    pub fn into_vec(self) -> Vec<ImageSection> {
        self.sections
    }
}

/// Parse a flash offset: `0x`-prefixed hex or plain decimal.
pub fn parse_offset(value: &str) -> Result<u32> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.with_context(|| format!("Invalid flash offset '{}'", value))
}

/// Parse a board extra-image entry, `"<offset> <path>"`.
///
/// Relative paths resolve against `base_dir`.
pub fn parse_extra_section(entry: &str, base_dir: &Path) -> Result<(u32, PathBuf)> {
    let entry = entry.trim();
    let Some((offset, path)) = entry.split_once(char::is_whitespace) else {
        bail!(BuildError::InvalidSection(entry.to_string()));
    };
    let path = path.trim();
    if path.is_empty() {
        bail!(BuildError::InvalidSection(entry.to_string()));
    }
    let offset = parse_offset(offset)
        .map_err(|_| BuildError::InvalidSection(entry.to_string()))?;

    let path = PathBuf::from(path);
    let path = if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    };
    Ok((offset, path))
}
