//! Build log output.
//!
//! Verbosity is a plain value handed to each component instead of a
//! process-wide flag, so two invocations in one process (tests, mostly)
//! never see each other's settings.

use tracing_subscriber::EnvFilter;

/// How chatty the build hooks are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Install the global `tracing` subscriber for the CLI.
///
/// `RUST_LOG` wins over the verbosity flags when set.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Per-component reporter.
#[derive(Debug, Clone)]
pub struct Reporter {
    component: &'static str,
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(component: &'static str, verbosity: Verbosity) -> Self {
        Self {
            component,
            verbosity,
        }
    }

    /// Progress message, dropped when quiet.
    pub fn status(&self, msg: impl AsRef<str>) {
        if self.verbosity != Verbosity::Quiet {
            tracing::info!("[{}] {}", self.component, msg.as_ref());
        }
    }

    /// Extra detail, only with `--verbose`.
    pub fn detail(&self, msg: impl AsRef<str>) {
        if self.verbosity == Verbosity::Verbose {
            tracing::debug!("[{}] {}", self.component, msg.as_ref());
        }
    }

    /// Degraded-but-survivable condition. Always emitted.
    pub fn warn(&self, msg: impl AsRef<str>) {
        tracing::warn!("[{}] {}", self.component, msg.as_ref());
    }

    /// Audit output (section tables, generated paths). Always printed to stdout.
    pub fn table(&self, line: impl AsRef<str>) {
        println!("{}", line.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(Verbosity::default().default_directive(), "info");
        assert_eq!(Verbosity::Quiet.default_directive(), "warn");
        assert_eq!(Verbosity::Verbose.default_directive(), "debug");
    }
}
