//! Factory image manifest, written next to the image.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::board::FlashParams;
use super::sections::ImageSection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSection {
    pub label: String,
    /// Hex, as passed to the merge tool.
    pub offset: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryManifest {
    pub image: PathBuf,
    pub size: u64,
    pub sha256: String,
    pub chip: String,
    pub flash_mode: String,
    pub flash_freq: String,
    pub flash_size: String,
    pub sections: Vec<ManifestSection>,
}

impl FactoryManifest {
    /// Describe a finished image. Sections are listed by ascending offset.
    pub fn describe(image: &Path, flash: &FlashParams, sections: &[ImageSection]) -> Result<Self> {
        let bytes =
            fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        let mut sorted: Vec<&ImageSection> = sections.iter().collect();
        sorted.sort_by_key(|s| s.offset);

        Ok(Self {
            image: image.to_path_buf(),
            size: bytes.len() as u64,
            sha256,
            chip: flash.chip.clone(),
            flash_mode: flash.mode.clone(),
            flash_freq: flash.freq.clone(),
            flash_size: flash.size.clone(),
            sections: sorted
                .into_iter()
                .map(|s| ManifestSection {
                    label: s.label.clone(),
                    offset: format!("{:#x}", s.offset),
                    path: s.path.clone(),
                    size: s.size,
                })
                .collect(),
        })
    }

    /// `firmware.factory.bin` -> `firmware.factory.json`.
    pub fn path_for(image: &Path) -> PathBuf {
        image.with_extension("json")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        fs::write(path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_and_write() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("firmware.factory.bin");
        fs::write(&image, b"abc").unwrap();

        let flash = FlashParams {
            chip: "esp32".to_string(),
            mode: "dio".to_string(),
            freq: "40m".to_string(),
            size: "4MB".to_string(),
        };
        let sections = vec![
            ImageSection {
                label: "app".to_string(),
                offset: 0x10000,
                path: temp.path().join("firmware.bin"),
                size: 2,
            },
            ImageSection {
                label: "bootloader".to_string(),
                offset: 0x1000,
                path: temp.path().join("bootloader.bin"),
                size: 1,
            },
        ];

        let manifest = FactoryManifest::describe(&image, &flash, &sections).unwrap();
        assert_eq!(
            manifest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(manifest.size, 3);
        assert_eq!(manifest.sections[0].offset, "0x1000");
        assert_eq!(manifest.sections[1].label, "app");

        let path = FactoryManifest::path_for(&image);
        assert_eq!(path, temp.path().join("firmware.factory.json"));
        manifest.write(&path).unwrap();
        let back: FactoryManifest =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, manifest);
    }
}
