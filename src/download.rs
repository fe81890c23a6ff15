//! HTTP downloads with a presence-keyed cache.
//!
//! A cached file is reused as long as it exists; there is no freshness or
//! checksum check. Downloads land in a `.part` file first, so a failed fetch
//! never leaves something that looks like a cache hit.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::process::Cmd;
use crate::report::Reporter;

/// Performs one HTTP GET.
pub trait Fetcher {
    /// Write the response body to `dest` and return the HTTP status code.
    ///
    /// Transport failures (DNS, refused connection) are errors; a non-2xx
    /// status is not, the caller decides.
    fn get(&self, url: &str, dest: &Path) -> Result<u16>;
}

/// `curl` on PATH.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher;

impl Fetcher for CurlFetcher {
    fn get(&self, url: &str, dest: &Path) -> Result<u16> {
        let result = Cmd::new("curl")
            .args(["-sS", "-L", "-o"])
            .arg_path(dest)
            .args(["-w", "%{http_code}", url])
            .error_msg(format!("curl failed to fetch {}", url))
            .run()?;

        let code = result.stdout_trimmed();
        code.parse::<u16>()
            .with_context(|| format!("Unexpected curl status output '{}'", code))
    }
}

/// Where the cached file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Reused,
    Downloaded,
}

/// Make sure `url` is available at `dest`, fetching only when absent.
pub fn fetch_cached(
    fetcher: &dyn Fetcher,
    url: &str,
    dest: &Path,
    reporter: &Reporter,
) -> Result<CacheOutcome> {
    if dest.exists() {
        reporter.status(format!("Using cached {}", dest.display()));
        return Ok(CacheOutcome::Reused);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let part = part_path(dest);
    reporter.status(format!("Downloading {}", url));

    let status = match fetcher.get(url, &part) {
        Ok(status) => status,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    if !(200..300).contains(&status) {
        let _ = fs::remove_file(&part);
        return Err(BuildError::DownloadFailed {
            url: url.to_string(),
            status,
        }
        .into());
    }

    fs::rename(&part, dest).with_context(|| {
        format!("Failed to move {} to {}", part.display(), dest.display())
    })?;
    reporter.status(format!("Downloaded to {}", dest.display()));
    Ok(CacheOutcome::Downloaded)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
