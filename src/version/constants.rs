//! Generated build artifacts: the C constants file, the build-flag form and
//! the JSON metadata.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::VersionInfo;

/// File name of the generated constants source.
pub const CONSTANTS_FILE: &str = "__compiled_constants.c";

pub const METADATA_FILE: &str = "build_info.json";

/// List of extra sources the host build system compiles in.
pub const BUILD_INPUTS_FILE: &str = ".fwforge-inputs";

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub source: PathBuf,
    pub metadata: PathBuf,
}

/// `(constant name, define name, value)` for every embedded field.
fn fields(info: &VersionInfo) -> [(&'static str, &'static str, &str); 6] {
    [
        ("__COMPILED_APP_VERSION__", "APP_VERSION", info.version_string.as_str()),
        ("__COMPILED_BUILD_BRANCH__", "BUILD_BRANCH", info.branch.as_str()),
        ("__COMPILED_BUILD_HASH__", "BUILD_HASH", info.commit_hash_short.as_str()),
        ("__COMPILED_BUILD_NAME__", "BUILD_NAME", info.build_name.as_str()),
        ("__COMPILED_BUILD_TIMESTAMP__", "BUILD_TIMESTAMP", info.timestamp_utc.as_str()),
        ("__COMPILED_BUILD_BOARD__", "BUILD_BOARD", info.board_id.as_str()),
    ]
}

/// Render the constants as a C translation unit.
pub fn render_c_source(info: &VersionInfo) -> String {
    let mut out = String::new();
    for (name, _, value) in fields(info) {
        out.push_str(&format!("const char* {} = \"{}\";\n", name, c_escape(value)));
    }
    out
}

/// Render the constants as `-D` preprocessor flags.
pub fn render_build_flags(info: &VersionInfo) -> String {
    fields(info)
        .iter()
        .map(|(_, define, value)| format!("-D {}=\\\"{}\\\"", define, c_escape(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write the constants source and JSON metadata into `build_dir`.
///
/// Always rewrites both files.
pub fn write_artifacts(info: &VersionInfo, build_dir: &Path) -> Result<GeneratedArtifacts> {
    fs::create_dir_all(build_dir)
        .with_context(|| format!("Failed to create build dir: {}", build_dir.display()))?;

    let source = build_dir.join(CONSTANTS_FILE);
    fs::write(&source, render_c_source(info))
        .with_context(|| format!("Failed to write {}", source.display()))?;

    let metadata = build_dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(info).context("Failed to serialize build info")?;
    fs::write(&metadata, json + "\n")
        .with_context(|| format!("Failed to write {}", metadata.display()))?;

    Ok(GeneratedArtifacts { source, metadata })
}

/// Add `source` to the build-input list in `build_dir`, once.
///
/// Returns `true` if the entry was new.
pub fn register_build_input(build_dir: &Path, source: &Path) -> Result<bool> {
    let list = build_dir.join(BUILD_INPUTS_FILE);
    let entry = source.to_string_lossy();

    let mut content = if list.exists() {
        fs::read_to_string(&list).with_context(|| format!("Failed to read {}", list.display()))?
    } else {
        String::new()
    };

    if content.lines().any(|line| line.trim() == entry) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&entry);
    content.push('\n');
    fs::write(&list, content).with_context(|| format!("Failed to write {}", list.display()))?;
    Ok(true)
}

fn c_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VersionInfo {
        VersionInfo {
            raw_branch: "main".to_string(),
            branch: "main".to_string(),
            commit_hash_full: "abcdef1234567".to_string(),
            commit_hash_short: "abcdef1".to_string(),
            is_tag: false,
            is_dirty: false,
            version_string: "main_abcdef1".to_string(),
            timestamp_utc: "2024-05-01T10:00:00Z".to_string(),
            build_name: "esp32dev".to_string(),
            board_id: "esp32dev".to_string(),
        }
    }

    #[test]
    fn test_c_source_has_every_constant() {
        let source = render_c_source(&sample());
        assert!(source.contains("const char* __COMPILED_APP_VERSION__ = \"main_abcdef1\";\n"));
        assert!(source.contains("const char* __COMPILED_BUILD_BRANCH__ = \"main\";\n"));
        assert!(source.contains("const char* __COMPILED_BUILD_HASH__ = \"abcdef1\";\n"));
        assert!(source.contains("const char* __COMPILED_BUILD_NAME__ = \"esp32dev\";\n"));
        assert!(source
            .contains("const char* __COMPILED_BUILD_TIMESTAMP__ = \"2024-05-01T10:00:00Z\";\n"));
        assert!(source.contains("const char* __COMPILED_BUILD_BOARD__ = \"esp32dev\";\n"));
        assert_eq!(source.lines().count(), 6);
    }

    #[test]
    fn test_c_escape() {
        assert_eq!(c_escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(c_escape("x\ny"), "x\\ny");
        assert_eq!(c_escape("\u{1}"), "\\x01");
    }

    #[test]
    fn test_build_flags() {
        let flags = render_build_flags(&sample());
        assert!(flags.starts_with("-D APP_VERSION=\\\"main_abcdef1\\\" -D BUILD_BRANCH=\\\"main\\\""));
        assert!(flags.contains("-D BUILD_HASH=\\\"abcdef1\\\""));
    }

    #[test]
    fn test_write_artifacts_overwrites() {
        let temp = TempDir::new().unwrap();
        let build_dir = temp.path().join("build");

        let mut info = sample();
        write_artifacts(&info, &build_dir).unwrap();
        info.version_string = "3.1.0".to_string();
        let artifacts = write_artifacts(&info, &build_dir).unwrap();

        let source = fs::read_to_string(&artifacts.source).unwrap();
        assert!(source.contains("\"3.1.0\""));
        assert!(!source.contains("main_abcdef1"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.metadata).unwrap()).unwrap();
        assert_eq!(json["commit_hash_full"], "abcdef1234567");
        assert_eq!(json["version_string"], "3.1.0");
    }

    #[test]
    fn test_register_build_input_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join(CONSTANTS_FILE);

        assert!(register_build_input(temp.path(), &source).unwrap());
        assert!(!register_build_input(temp.path(), &source).unwrap());

        let list = fs::read_to_string(temp.path().join(BUILD_INPUTS_FILE)).unwrap();
        assert_eq!(list.lines().count(), 1);
    }
}
