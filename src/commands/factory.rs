//! Factory command - composes the factory image.

use anyhow::Result;

use crate::config::Config;
use crate::download::CurlFetcher;
use crate::factory::bootloader::PioBuilder;
use crate::factory::merge::Esptool;
use crate::factory::{self, FactoryJob, Tools};
use crate::report::{Reporter, Verbosity};
use crate::timing::Timer;

/// Execute the factory command.
pub fn cmd_factory(config: &Config, verbosity: Verbosity) -> Result<()> {
    let reporter = Reporter::new("factory", verbosity);
    let job = FactoryJob::from_config(config)?;

    let esptool = Esptool::new(&config.esptool);
    let tools = Tools {
        builder: &PioBuilder,
        fetcher: &CurlFetcher,
        merger: &esptool,
    };

    let timer = Timer::start("Factory image");
    let image = factory::compose(&job, &tools, &reporter)?;
    timer.finish(&reporter);

    reporter.detail(format!("Manifest: {}", image.manifest.display()));
    Ok(())
}
