use std::path::PathBuf;

use crate::config::{Config, HexColor, MAX_FPS, MAX_SEED};

pub fn print_usage() {
    eprintln!("termaurora - Aurora ribbons and twinkling stars for your terminal");
    eprintln!();
    eprintln!("Usage: termaurora [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --seed N           Seed the star field (same seed, same sky)");
    eprintln!("  --stars N          Number of stars (default 75)");
    eprintln!("  --fps N            Frame rate cap, 1-{MAX_FPS} (default 60)");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!("  --config PATH      Read settings from PATH instead of the default config file");
    eprintln!("  --log-file PATH    Write logs to PATH (filter with RUST_LOG)");
    eprintln!("  --print-config     Print the effective configuration and exit");
    eprintln!("  -h, --help         Show this help");
    eprintln!();
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgsError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Invalid value for {flag}: {value}")]
    InvalidValue { flag: &'static str, value: String },

    #[error("Invalid hex color: {0}\nExpected format: RRGGBB (e.g., 1a1b26)")]
    InvalidColor(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

/// Command line overrides. Anything left `None` keeps the config file value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub seed: Option<u64>,
    pub stars: Option<usize>,
    pub fps: Option<u32>,
    pub bg_color: Option<HexColor>,
    pub config: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub print_config: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Options),
    Help,
}

pub fn parse<I>(args: I) -> Result<Command, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &'static str| args.next().ok_or(ArgsError::MissingValue(flag));
        match arg.as_str() {
            "--seed" => options.seed = Some(seed(value("--seed")?)?),
            "--stars" => options.stars = Some(number("--stars", value("--stars")?)?),
            "--fps" => options.fps = Some(number("--fps", value("--fps")?)?),
            "--bg-color" => {
                let raw = value("--bg-color")?;
                let color = HexColor::parse(&raw).ok_or(ArgsError::InvalidColor(raw))?;
                options.bg_color = Some(color);
            }
            "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "--log-file" => options.log_file = Some(PathBuf::from(value("--log-file")?)),
            "--print-config" => options.print_config = true,
            "help" | "--help" | "-h" => return Ok(Command::Help),
            other => return Err(ArgsError::UnknownOption(other.to_string())),
        }
    }

    Ok(Command::Run(options))
}

fn number<T: std::str::FromStr>(flag: &'static str, value: String) -> Result<T, ArgsError> {
    value
        .parse()
        .map_err(|_| ArgsError::InvalidValue { flag, value })
}

fn seed(value: String) -> Result<u64, ArgsError> {
    match value.parse::<u64>() {
        Ok(seed) if seed <= MAX_SEED => Ok(seed),
        _ => Err(ArgsError::InvalidValue { flag: "--seed", value }),
    }
}

impl Options {
    pub fn apply(&self, config: &mut Config) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(stars) = self.stars {
            config.star_count = stars;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(color) = self.bg_color {
            config.background = color;
        }
        if let Some(path) = &self.log_file {
            config.logging.file = Some(path.clone());
        }
    }
}
