use anyhow::Context;
use std::env;
use tracing::info;

mod background;
mod cli;
mod config;
mod driver;
mod logging;
mod raster;
mod term;

use background::AuroraBackground;
use config::{Config, MAX_SEED};
use driver::AnimationDriver;
use term::TerminalHost;

fn main() -> anyhow::Result<()> {
    let options = match cli::parse(env::args().skip(1)) {
        Ok(cli::Command::Run(options)) => options,
        Ok(cli::Command::Help) => {
            cli::print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            cli::print_usage();
            std::process::exit(1);
        }
    };

    let mut config = Config::locate(options.config.as_deref()).context("loading configuration")?;
    options.apply(&mut config);
    config.validate()?;

    if options.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    logging::init(config.logging.file.as_deref())?;

    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..=MAX_SEED));
    info!(
        seed,
        fps = config.fps,
        stars = config.star_count,
        bands = config.bands.len(),
        background = %config.background,
        "starting termaurora"
    );

    let mut rng = fastrand::Rng::with_seed(seed);
    let scene = AuroraBackground::from_config(&config, &mut rng);

    let mut host = TerminalHost::new(&config.terminal, config.fps);
    // No terminal to draw on: nothing to do, and nothing to complain about
    let Some(mut driver) = AnimationDriver::mount(scene, &mut host) else {
        return Ok(());
    };

    host.enter().context("entering alternate screen")?;
    let result = host.run(&mut driver);
    driver.unmount(&mut host);
    host.leave().context("restoring terminal")?;

    info!(frames = driver.frames_drawn(), "stopped");
    result.context("animation loop failed")
}
