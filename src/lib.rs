//! # LatheKit
//!
//! Turns 2D line-art into lathe G-code and previews the resulting motion.
//!
//! ## Architecture
//!
//! LatheKit is organized as a workspace with multiple crates:
//!
//! 1. **lathekit-core** - Geometry model, transforms, tessellation, tools, errors
//! 2. **lathekit-import** - SVG/DXF decoders and the fallback resolver
//! 3. **lathekit-camtools** - Lathe turning G-code generation
//! 4. **lathekit-visualizer** - G-code motion parsing and toolpath playback
//! 5. **lathekit-settings** - Persistent configuration
//! 6. **lathekit** - This crate: logging setup, glue, and the CLI binary
//!
//! ## Pipeline
//!
//! file path → [`ImportResolver`] → [`GeometryModel`] → [`LatheTurningGenerator`]
//! → G-code text → [`ToolpathSimulator`] → (X, Z) positions

pub use lathekit_camtools::{format_number, generate, LatheTurningGenerator, TurningParameters};
pub use lathekit_core::{
    Affine2, Bounds, ConfigError, CurveTessellator, Error, GeometryModel, ImportError,
    JobDefinition, Point2, Polyline, Result, Tool, Units,
};
pub use lathekit_import::{
    Diagnostics, ImportOptions, ImportReport, ImportResolver, ImportTier, NormalizerConfig,
};
pub use lathekit_settings::Config;
pub use lathekit_visualizer::{parse_waypoints, ToolpathSimulator, Waypoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, leaving stdout for command results
/// - RUST_LOG environment variable support
/// - INFO as the default level
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with(LogFormat::Pretty)
}

/// Initialize logging in the given format.
pub fn init_logging_with(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}

/// Import options from the `[import]` config section.
pub fn import_options(config: &Config) -> ImportOptions {
    let import = &config.import;
    ImportOptions {
        segments: import.segments,
        normalizer: NormalizerConfig {
            script_override: import.normalizer_script.clone(),
            interpreters: import.interpreters.clone(),
            timeout: import.normalizer_timeout(),
            segments: import.segments,
            explode_inserts: import.explode_inserts,
            ..NormalizerConfig::default()
        },
    }
}

/// Generator parameters from the `[generation]` config section.
pub fn turning_parameters(config: &Config) -> TurningParameters {
    TurningParameters {
        default_feed: config.generation.default_feed,
        default_spindle: config.generation.default_spindle,
        scale: config.generation.scale,
    }
}

/// A job using the configured units and heights with the given tools.
pub fn job_definition(config: &Config, tools: Vec<Tool>) -> JobDefinition {
    JobDefinition::new(
        config.generation.units,
        config.generation.safe_z,
        config.generation.depth_per_pass,
        tools,
    )
}

/// Parse a tool spec of the form `NUMBER[:NAME[:DIAMETER[:FEED[:SPINDLE]]]]`.
///
/// Omitted feed and spindle are left at zero so the generator defaults apply.
pub fn parse_tool_spec(spec: &str) -> Result<Tool> {
    let mut parts = spec.split(':');
    let number = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::other(format!("empty tool spec '{}'", spec)))?
        .parse::<u32>()
        .map_err(|e| Error::other(format!("invalid tool number in '{}': {}", spec, e)))?;
    let name = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Tool {}", number));

    let mut numbers = [0.0f64; 3];
    for (slot, field) in numbers.iter_mut().zip(["diameter", "feed", "spindle"]) {
        if let Some(text) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            *slot = text.parse::<f64>().map_err(|e| {
                Error::other(format!("invalid {} in tool spec '{}': {}", field, spec, e))
            })?;
        }
    }
    if parts.next().is_some() {
        return Err(Error::other(format!("too many fields in tool spec '{}'", spec)));
    }

    Ok(Tool::new(number, name, numbers[0], numbers[1], numbers[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_tool_spec() {
        let tool = parse_tool_spec("2:Finishing:3.5:0.05:1800").unwrap();
        assert_eq!(tool, Tool::new(2, "Finishing", 3.5, 0.05, 1800.0));
        assert_eq!(tool.tool_word(), "T02");
    }

    #[test]
    fn test_parse_short_tool_spec() {
        let tool = parse_tool_spec("7").unwrap();
        assert_eq!(tool.number, 7);
        assert_eq!(tool.name, "Tool 7");
        assert_eq!(tool.feed_rate, 0.0);
    }

    #[test]
    fn test_parse_bad_tool_specs() {
        assert!(parse_tool_spec("").is_err());
        assert!(parse_tool_spec("x:Rough").is_err());
        assert!(parse_tool_spec("1:Rough:abc").is_err());
        assert!(parse_tool_spec("1:a:1:2:3:4").is_err());
    }

    #[test]
    fn test_config_mapping() {
        let mut config = Config::default();
        config.import.segments = 64;
        config.generation.units = Units::Inch;

        let options = import_options(&config);
        assert_eq!(options.segments, 64);
        assert_eq!(options.normalizer.segments, 64);

        let job = job_definition(&config, vec![Tool::new(1, "T", 1.0, 0.1, 500.0)]);
        assert_eq!(job.units, Units::Inch);
        assert_eq!(job.safe_z, config.generation.safe_z);
        assert_eq!(turning_parameters(&config).scale, 1.0);
    }
}
