//! fwforge - firmware build hooks.
//!
//! - `fwforge version` writes the compiled version constants before a build
//! - `fwforge factory` merges safeboot, application and filesystem images
//!   into one flashable factory image after a build

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fwforge::commands;
use fwforge::config::Config;
use fwforge::report::{self, Verbosity};

#[derive(Parser)]
#[command(name = "fwforge")]
#[command(about = "Firmware version stamping and factory image assembly")]
#[command(
    after_help = "QUICK START:\n  fwforge preflight  Check tools and configuration\n  fwforge version    Generate version constants (pre-build)\n  fwforge factory    Build the factory image (post-build)\n  fwforge clean      Remove generated artifacts"
)]
struct Cli {
    /// Project root (default: current directory). `.env` is read from here.
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Build output directory (default: .pio/build/<env>)
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,

    /// Build target / environment name
    #[arg(long = "env", global = true)]
    env_name: Option<String>,

    /// Board identifier
    #[arg(long, global = true)]
    board: Option<String>,

    /// Only print warnings and audit output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print extra detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the build version and write the compiled constants
    Version {
        #[arg(long, value_enum, default_value = "source")]
        format: Format,
    },

    /// Compose the factory image from the built images
    Factory {
        /// Board manifest (JSON)
        #[arg(long)]
        board_file: Option<PathBuf>,
        /// Partition table identifier (e.g. partitions-4MB.csv)
        #[arg(long)]
        partitions: Option<String>,
        /// Use this recovery image as-is
        #[arg(long)]
        safeboot_file: Option<PathBuf>,
        /// Build the recovery image from this project
        #[arg(long)]
        safeboot_project: Option<PathBuf>,
        /// Download the recovery image from this URL (cached)
        #[arg(long)]
        safeboot_url: Option<String>,
        /// Merge tool program
        #[arg(long)]
        esptool: Option<String>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Remove generated artifacts (default: everything fwforge wrote)
    Clean {
        #[command(subcommand)]
        what: Option<CleanTarget>,
    },

    /// Check host tools and configuration
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Generated C source registered as a build input
    Source,
    /// Preprocessor -D flags on stdout
    Flags,
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Resolve and print the version without writing anything
    Version,
    /// Show known partition layouts
    Layouts,
}

#[derive(Subcommand)]
enum CleanTarget {
    /// Version constants and metadata
    Version,
    /// Factory image and manifest
    Factory,
    /// Cached recovery image download
    Cache,
    /// Everything
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    report::init_tracing(verbosity);

    let base_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };
    let mut config = Config::load(&base_dir)?;
    if let Some(env_name) = cli.env_name {
        config.env_name = env_name;
    }
    if let Some(board) = cli.board {
        config.board = board;
    }
    if let Some(build_dir) = cli.build_dir {
        config.set_build_dir(&build_dir);
    }

    match cli.command {
        Commands::Version { format } => {
            let format = match format {
                Format::Source => commands::version::VersionFormat::Source,
                Format::Flags => commands::version::VersionFormat::Flags,
            };
            commands::cmd_version(&config, format, verbosity)?;
        }

        Commands::Factory {
            board_file,
            partitions,
            safeboot_file,
            safeboot_project,
            safeboot_url,
            esptool,
        } => {
            if board_file.is_some() {
                config.board_file = board_file.map(|p| config.base_dir.join(p));
            }
            if partitions.is_some() {
                config.partitions = partitions;
            }
            // An explicit source on the command line replaces the configured one.
            if safeboot_file.is_some() || safeboot_project.is_some() || safeboot_url.is_some() {
                config.safeboot_file = safeboot_file.map(|p| config.base_dir.join(p));
                config.safeboot_project = safeboot_project.map(|p| config.base_dir.join(p));
                config.safeboot_url = safeboot_url;
            }
            if let Some(esptool) = esptool {
                config.esptool = esptool;
            }
            commands::cmd_factory(&config, verbosity)?;
        }

        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Version => commands::show::ShowTarget::Version,
                ShowTarget::Layouts => commands::show::ShowTarget::Layouts,
            };
            commands::cmd_show(&config, target, verbosity)?;
        }

        Commands::Clean { what } => {
            let target = match what {
                None | Some(CleanTarget::All) => commands::clean::CleanTarget::All,
                Some(CleanTarget::Version) => commands::clean::CleanTarget::Version,
                Some(CleanTarget::Factory) => commands::clean::CleanTarget::Factory,
                Some(CleanTarget::Cache) => commands::clean::CleanTarget::Cache,
            };
            commands::cmd_clean(&config, target)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }
    }

    Ok(())
}
