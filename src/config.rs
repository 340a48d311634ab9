use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::background::band::{self, BandConfig};
use crate::background::stars;
use crate::background::viewport::ViewportSettings;

pub const MAX_FPS: u32 = 240;
pub const MAX_STARS: usize = 10_000;
/// TOML integers are signed 64-bit, so larger seeds could not be written back.
pub const MAX_SEED: u64 = i64::MAX as u64;

/// An `RRGGBB` color as written in the config file and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const fn new(rgb: [u8; 3]) -> Self {
        Self(rgb)
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Self([r, g, b]))
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid hex color {value:?}, expected RRGGBB"))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{r:02x}{g:02x}{b:02x}")
    }
}

/// Terminal geometry used when the terminal does not report pixel sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    pub cell_width: f64,
    pub cell_height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            cell_width: 8.0,
            cell_height: 16.0,
            device_pixel_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Logging is off unless a file is given; the terminal itself is busy
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Star field seed; random when unset
    pub seed: Option<u64>,
    pub fps: u32,
    pub star_count: usize,
    pub speed_multiplier: f64,
    pub background: HexColor,
    pub viewport: ViewportSettings,
    pub terminal: TerminalSettings,
    pub logging: LoggingSettings,
    pub bands: Vec<BandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            fps: 60,
            star_count: stars::REFERENCE_COUNT,
            speed_multiplier: band::SPEED_MULTIPLIER,
            background: HexColor::new([10, 10, 10]),
            viewport: ViewportSettings::default(),
            terminal: TerminalSettings::default(),
            logging: LoggingSettings::default(),
            bands: band::reference_bands(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Default config file path (~/.config/termaurora/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("termaurora").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// An explicit path must exist. The default path is optional: no file
    /// there just means defaults.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_default(&path),
            _ => Ok(Self::default()),
        }
    }

    fn load_default(path: &Path) -> Result<Self, ConfigError> {
        Self::load(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "default config file is unusable");
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.fps == 0 || self.fps > MAX_FPS {
            return invalid(format!("fps must be between 1 and {MAX_FPS}, got {}", self.fps));
        }
        if let Some(seed) = self.seed.filter(|s| *s > MAX_SEED) {
            return invalid(format!("seed must be at most {MAX_SEED}, got {seed}"));
        }
        if self.star_count > MAX_STARS {
            return invalid(format!("star_count must be at most {MAX_STARS}, got {}", self.star_count));
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier < 0.0 {
            return invalid(format!("speed_multiplier must be a non-negative number, got {}", self.speed_multiplier));
        }
        if self.bands.is_empty() {
            return invalid("at least one band is required".to_string());
        }
        for (i, band) in self.bands.iter().enumerate() {
            if !(band.alpha > 0.0 && band.alpha <= 1.0) {
                return invalid(format!("band {i}: alpha must be in (0, 1], got {}", band.alpha));
            }
            if !(band.width > 0.0) {
                return invalid(format!("band {i}: width must be positive, got {}", band.width));
            }
        }

        let v = &self.viewport;
        if !(v.compact_scale > 0.0 && v.max_scale > 0.0) {
            return invalid("viewport scales must be positive".to_string());
        }
        let t = &self.terminal;
        if !(t.cell_width > 0.0 && t.cell_height > 0.0 && t.device_pixel_ratio > 0.0) {
            return invalid("terminal cell size and device_pixel_ratio must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.bands.len(), 5);
        assert_eq!(config.star_count, 75);
        assert_eq!(config.background.rgb(), [10, 10, 10]);
    }

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let config = Config::from_toml(
            r#"
            fps = 30
            background = "1a1b26"

            [viewport]
            compact_breakpoint = 600.0
            "#,
        )
        .unwrap();

        assert_eq!(config.fps, 30);
        assert_eq!(config.background.rgb(), [0x1a, 0x1b, 0x26]);
        assert_eq!(config.viewport.compact_breakpoint, 600.0);
        assert_eq!(config.viewport.compact_scale, 1.5);
        assert_eq!(config.bands, band::reference_bands());
    }

    #[test]
    fn custom_bands_replace_the_reference_set() {
        let config = Config::from_toml(
            r#"
            [[bands]]
            color1 = [255, 0, 0]
            color2 = [0, 0, 255]
            alpha = 0.2
            speed = 0.5
            y_offset = 0.5
            amplitude = 60.0
            frequency = 0.003
            width = 200.0
            phase = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.bands.len(), 1);
        assert_eq!(config.bands[0].color2, [0, 0, 255]);
    }

    #[test]
    fn bad_hex_is_a_parse_error() {
        let err = Config::from_toml(r#"background = "nothex""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn survives_a_round_trip_through_toml() {
        let config = Config { seed: Some(42), ..Config::default() };
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn largest_seed_survives_print_and_reload() {
        let config = Config { seed: Some(MAX_SEED), ..Config::default() };
        config.validate().unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap().seed, Some(MAX_SEED));
    }

    #[test]
    fn broken_default_file_is_reported() {
        let path = std::env::temp_dir().join(format!("termaurora-broken-{}.toml", std::process::id()));
        std::fs::write(&path, "fps = \"fast\"").unwrap();
        let result = Config::load_default(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            Config { fps: 0, ..Config::default() },
            Config { fps: 1000, ..Config::default() },
            Config { star_count: MAX_STARS + 1, ..Config::default() },
            Config { seed: Some(MAX_SEED + 1), ..Config::default() },
            Config { speed_multiplier: f64::NAN, ..Config::default() },
            Config { bands: Vec::new(), ..Config::default() },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }

        let mut config = Config::default();
        config.bands[2].alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.terminal.cell_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!(HexColor::parse("#0a0a0a"), Some(HexColor::new([10, 10, 10])));
        assert_eq!(HexColor::parse("FFFFFF"), Some(HexColor::new([255, 255, 255])));
        assert_eq!(HexColor::parse("fff"), None);
        assert_eq!(HexColor::parse("zzzzzz"), None);
        assert_eq!(HexColor::new([26, 27, 38]).to_string(), "1a1b26");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::locate(Some(Path::new("/nonexistent/termaurora.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
