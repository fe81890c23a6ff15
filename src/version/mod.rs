//! Build version resolution.
//!
//! Turns checkout state (plus an optional CI reference name) into the version
//! string and metadata that get compiled into the firmware:
//!
//! - tag builds (`v3.1.0`, `v2.40.2-rc1`) become `3.1.0`, `2.40.2-rc1`
//! - branch builds become `<branch>_<short hash>` (`main_abcdef1`)
//! - local builds with uncommitted changes get `_modified` appended

pub mod constants;
pub mod vcs;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::error::BuildError;
use crate::report::Reporter;

pub use constants::{register_build_input, write_artifacts, GeneratedArtifacts};
pub use vcs::{GitCli, Vcs};

/// Length of the abbreviated commit hash.
pub const SHORT_HASH_LEN: usize = 7;

/// Suffix for builds from a dirty working tree.
pub const MODIFIED_SUFFIX: &str = "_modified";

/// Everything embedded into one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Branch or reference name before normalization.
    pub raw_branch: String,
    /// Branch as embedded (`BUILD_BRANCH`).
    pub branch: String,
    pub commit_hash_full: String,
    pub commit_hash_short: String,
    pub is_tag: bool,
    pub is_dirty: bool,
    pub version_string: String,
    pub timestamp_utc: String,
    pub build_name: String,
    pub board_id: String,
}

/// Build-specific inputs that don't come from the checkout.
#[derive(Debug, Clone, Default)]
pub struct VersionRequest {
    /// Build target / environment name.
    pub build_name: String,
    pub board_id: String,
    /// CI-provided branch or tag name. When set, used verbatim and the
    /// working tree is assumed clean.
    pub ci_ref_name: Option<String>,
}

/// Resolve the version for this build, stamped with the current time.
pub fn resolve(vcs: &dyn Vcs, request: &VersionRequest, reporter: &Reporter) -> Result<VersionInfo> {
    resolve_at(vcs, request, Utc::now(), reporter)
}

/// Resolve the version with an explicit timestamp.
pub fn resolve_at(
    vcs: &dyn Vcs,
    request: &VersionRequest,
    now: DateTime<Utc>,
    reporter: &Reporter,
) -> Result<VersionInfo> {
    let commit_hash_full = match vcs.head_hash() {
        Ok(hash) => hash,
        Err(e) => {
            reporter.warn(format!("Cannot read commit hash, embedding empty hash: {:#}", e));
            String::new()
        }
    };
    let commit_hash_short = short_hash(&commit_hash_full);

    let ci_ref = request
        .ci_ref_name
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let (raw_branch, branch) = match ci_ref {
        Some(reference) => {
            reporter.detail(format!("Using CI reference name '{}'", reference));
            (reference.to_string(), reference.to_string())
        }
        None => {
            let raw = match vcs.current_branch() {
                Ok(b) => b,
                Err(e) => {
                    reporter.warn(format!("Cannot read branch name: {:#}", e));
                    String::new()
                }
            };
            let normalized = normalize_branch(&raw);
            (raw, normalized)
        }
    };

    if branch.is_empty() {
        return Err(BuildError::EmptyBranch.into());
    }

    let is_tag = is_release_tag(&branch);

    // CI checkouts are clean by convention; only local builds are checked.
    let is_dirty = if ci_ref.is_some() {
        false
    } else {
        match vcs.is_dirty() {
            Ok(dirty) => dirty,
            Err(e) => {
                reporter.warn(format!("Cannot check working tree, assuming clean: {:#}", e));
                false
            }
        }
    };

    let version_string = compose_version(&branch, &commit_hash_short, is_tag, is_dirty);

    Ok(VersionInfo {
        raw_branch,
        branch,
        commit_hash_full,
        commit_hash_short,
        is_tag,
        is_dirty,
        version_string,
        timestamp_utc: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        build_name: request.build_name.clone(),
        board_id: request.board_id.clone(),
    })
}

/// Strip `/`, `-` and `_` so a branch name is usable as an identifier
/// fragment.
pub fn normalize_branch(branch: &str) -> String {
    branch
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_'))
        .collect()
}

/// `v<major>.<minor>.<patch>` with an optional `-suffix` or `_suffix`,
/// anchored on the whole string.
pub fn is_release_tag(name: &str) -> bool {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+([_-][A-Za-z0-9]+)?$").expect("tag pattern is valid")
    })
    .is_match(name)
}

/// First seven characters of the hash, or all of it when shorter.
pub fn short_hash(full: &str) -> String {
    full.chars().take(SHORT_HASH_LEN).collect()
}

pub fn compose_version(branch: &str, short_hash: &str, is_tag: bool, is_dirty: bool) -> String {
    let mut version = if is_tag {
        branch.strip_prefix('v').unwrap_or(branch).to_string()
    } else {
        format!("{}_{}", branch, short_hash)
    };
    if is_dirty {
        version.push_str(MODIFIED_SUFFIX);
    }
    version
}
