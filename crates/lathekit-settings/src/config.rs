//! Configuration and settings management for LatheKit
//!
//! Supports JSON and TOML files; the default location is
//! `<platform config dir>/lathekit/config.toml`.
//!
//! Configuration is organized into logical sections:
//! - Import settings (tessellation, external normalizer)
//! - Generation defaults (feed, spindle, scale, retract height, units)
//! - Simulation playback (tick interval, speed)
//!
//! Missing sections and fields fall back to their defaults, so a config file
//! only needs the values it changes.

use lathekit_core::{ConfigError, Error, Result, Units, DEFAULT_SEGMENTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Segments per circle, arc, ellipse, or spline, shared by every decoder
    pub segments: usize,
    /// Explicit normalizer script; the `LATHEKIT_NORMALIZER` variable wins over this
    pub normalizer_script: Option<PathBuf>,
    /// Interpreter names tried in order
    pub interpreters: Vec<String>,
    /// Normalizer wall-clock limit in seconds
    pub normalizer_timeout_secs: u64,
    /// Ask the normalizer to explode block references
    pub explode_inserts: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            segments: DEFAULT_SEGMENTS,
            normalizer_script: None,
            interpreters: vec!["python3".to_string(), "python".to_string(), "py".to_string()],
            normalizer_timeout_secs: 120,
            explode_inserts: true,
        }
    }
}

impl ImportSettings {
    pub fn normalizer_timeout(&self) -> Duration {
        Duration::from_secs(self.normalizer_timeout_secs)
    }
}

/// G-code generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Feed rate for tools without their own
    pub default_feed: f64,
    /// Spindle RPM for tools without their own
    pub default_spindle: f64,
    /// Geometry-to-machine scale factor
    pub scale: f64,
    /// Retract height
    pub safe_z: f64,
    pub depth_per_pass: f64,
    pub units: Units,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_feed: 0.2,
            default_spindle: 1000.0,
            scale: 1.0,
            safe_z: 5.0,
            depth_per_pass: 0.5,
            units: Units::Mm,
        }
    }
}

/// Simulation playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Delay between positions at speed 1.0, in milliseconds
    pub base_interval_ms: u64,
    pub default_speed: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            base_interval_ms: 20,
            default_speed: 1.0,
        }
    }
}

impl SimulationSettings {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub import: ImportSettings,
    pub generation: GenerationSettings,
    pub simulation: SimulationSettings,
}

#[derive(Clone, Copy)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Result<Format> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(ConfigError::UnknownFormat {
            path: path.to_path_buf(),
        }
        .into()),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/lathekit/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lathekit").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid JSON config: {}", e)))?,
            Format::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid TOML config: {}", e)))?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or the default location when `path` is `None`. A missing
    /// file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if path.is_file() {
            Self::load_from_file(&path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.import.segments == 0 {
            return Err(invalid("import.segments", "must be > 0"));
        }
        if self.import.normalizer_timeout_secs == 0 {
            return Err(invalid("import.normalizer_timeout_secs", "must be > 0"));
        }
        if self.import.interpreters.iter().any(|i| i.trim().is_empty()) {
            return Err(invalid("import.interpreters", "names must not be empty"));
        }

        let g = &self.generation;
        for (name, value) in [
            ("generation.default_feed", g.default_feed),
            ("generation.default_spindle", g.default_spindle),
            ("generation.scale", g.scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, "must be a finite number > 0"));
            }
        }
        if !g.safe_z.is_finite() {
            return Err(invalid("generation.safe_z", "must be finite"));
        }
        if !(g.depth_per_pass.is_finite() && g.depth_per_pass > 0.0) {
            return Err(invalid("generation.depth_per_pass", "must be > 0"));
        }

        if self.simulation.base_interval_ms == 0 {
            return Err(invalid("simulation.base_interval_ms", "must be > 0"));
        }
        let speed = self.simulation.default_speed;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(invalid("simulation.default_speed", "must be > 0"));
        }

        Ok(())
    }
}

fn invalid(setting: &str, reason: &str) -> Error {
    ConfigError::invalid(setting, reason).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.import.segments, DEFAULT_SEGMENTS);
        assert_eq!(config.import.normalizer_timeout(), Duration::from_secs(120));
        assert_eq!(config.simulation.base_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_validate_rejects_non_positive_values() {
        let mut config = Config::new();
        config.import.segments = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = Config::new();
        config.generation.scale = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("generation.scale"));

        let mut config = Config::new();
        config.simulation.base_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.generation.default_feed = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[generation]
units = "inch"
safe_z = 0.25
"#,
        )
        .unwrap();
        assert_eq!(config.generation.units, Units::Inch);
        assert_eq!(config.generation.safe_z, 0.25);
        assert_eq!(config.generation.default_spindle, 1000.0);
        assert_eq!(config.import, ImportSettings::default());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = Config::new()
            .save_to_file(Path::new("settings.yaml"))
            .unwrap_err();
        assert!(err.is_config_error());
    }
}
