//! Version-control queries.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::process::Cmd;

/// The three questions the version resolver asks of the checkout.
///
/// Implementations return errors freely; the resolver decides which failures
/// degrade to defaults.
pub trait Vcs {
    /// Full commit hash of HEAD.
    fn head_hash(&self) -> Result<String>;

    /// Short symbolic name of the checked-out branch.
    fn current_branch(&self) -> Result<String>;

    /// Whether the working tree differs from HEAD.
    fn is_dirty(&self) -> Result<bool>;
}

/// `git` on PATH, run inside a checkout.
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: &Path) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
        }
    }

    fn git(&self) -> Cmd {
        Cmd::new("git").dir(&self.repo_dir)
    }
}

impl Vcs for GitCli {
    fn head_hash(&self) -> Result<String> {
        let result = self
            .git()
            .args(["rev-parse", "HEAD"])
            .error_msg("git rev-parse HEAD failed")
            .run()?;
        Ok(result.stdout_trimmed().to_string())
    }

    fn current_branch(&self) -> Result<String> {
        // Fails on a detached HEAD, which is normal for tag checkouts.
        let result = self
            .git()
            .args(["symbolic-ref", "--short", "HEAD"])
            .error_msg("git symbolic-ref failed")
            .run()?;
        Ok(result.stdout_trimmed().to_string())
    }

    /// Exit 1 means dirty. Anything other than 0 or 1 (no commits yet, not a
    /// checkout) is an error, which the resolver reports and treats as clean.
    fn is_dirty(&self) -> Result<bool> {
        let result = self
            .git()
            .args(["diff-index", "--quiet", "HEAD", "--"])
            .allow_fail()
            .run()?;
        match result.code() {
            0 => Ok(false),
            1 => Ok(true),
            code => bail!(
                "git diff-index failed (exit code {}): {}",
                code,
                result.stderr_trimmed()
            ),
        }
    }
}
