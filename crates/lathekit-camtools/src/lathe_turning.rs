//! Lathe turning toolpath generation.
//!
//! Output is deterministic and uses only `G20/G21`, `G90`, `T`, `M6`, `S`,
//! `M3`, `G0`, `G1`, `M5`, and `M30` with `X`, `Z`, and `F` words.

use lathekit_core::{GeometryModel, JobDefinition, Polyline, Tool};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, info, warn};

/// Parameters for the Lathe Turning generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurningParameters {
    /// Feed rate used when a tool has none of its own
    pub default_feed: f64,
    /// Spindle speed (RPM) used when a tool has none of its own
    pub default_spindle: f64,
    /// Geometry-to-machine scale applied to X and Z
    pub scale: f64,
}

impl Default for TurningParameters {
    fn default() -> Self {
        Self {
            default_feed: 0.2,
            default_spindle: 1000.0,
            scale: 1.0,
        }
    }
}

/// Generator for lathe turning G-Code
#[derive(Debug, Clone, Default)]
pub struct LatheTurningGenerator {
    params: TurningParameters,
}

impl LatheTurningGenerator {
    pub fn new(params: TurningParameters) -> Self {
        Self { params }
    }

    /// Generate the program for `model` using every tool in `job`, in order.
    pub fn generate(&self, model: &GeometryModel, job: &JobDefinition) -> String {
        let suspicious = job.suspicious_tool_numbers();
        if !suspicious.is_empty() {
            warn!("Job has zero or duplicate tool numbers: {:?}", suspicious);
        }

        let mut gcode = String::new();

        // Header
        gcode.push_str("; LatheKit turning toolpath\n");
        let _ = writeln!(
            gcode,
            "; Polylines: {}, Tools: {}",
            model.polyline_count(),
            job.tools.len()
        );
        gcode.push_str(job.units.gcode());
        gcode.push('\n');
        gcode.push_str("G90\n");

        for tool in &job.tools {
            self.emit_tool(&mut gcode, model, job, tool);
        }

        gcode.push_str("M30\n");

        info!(
            "Generated {} lines of G-code for {} polylines and {} tools",
            gcode.lines().count(),
            model.polyline_count(),
            job.tools.len()
        );
        gcode
    }

    fn emit_tool(
        &self,
        gcode: &mut String,
        model: &GeometryModel,
        job: &JobDefinition,
        tool: &Tool,
    ) {
        let p = &self.params;
        let feed = if tool.feed_rate > 0.0 {
            tool.feed_rate
        } else {
            p.default_feed
        };
        let spindle = if tool.spindle_speed > 0.0 {
            tool.spindle_speed
        } else {
            p.default_spindle
        };
        let safe_z = format_number(job.safe_z);
        debug!(
            "Tool {} ({}): feed {}, spindle {}",
            tool.number, tool.name, feed, spindle
        );

        let _ = writeln!(gcode, "{}", tool.tool_word());
        gcode.push_str("M6\n");
        let _ = writeln!(gcode, "S{:.0}", spindle.round());
        gcode.push_str("M3\n");
        let _ = writeln!(gcode, "G0 Z{}", safe_z);

        for polyline in model.polylines.iter().filter(|p| !p.is_empty()) {
            self.emit_pass(gcode, polyline, feed, &safe_z);
        }

        gcode.push_str("M5\n");
    }

    /// Rapid to the first point, feed through every point, retract.
    fn emit_pass(&self, gcode: &mut String, polyline: &Polyline, feed: f64, safe_z: &str) {
        let scale = self.params.scale;
        let Some(first) = polyline.first() else {
            return;
        };
        let _ = writeln!(
            gcode,
            "G0 X{} Z{}",
            format_number(first.x * scale),
            format_number(first.y * scale)
        );
        let feed = format_number(feed);
        for point in &polyline.points {
            let _ = writeln!(
                gcode,
                "G1 X{} Z{} F{}",
                format_number(point.x * scale),
                format_number(point.y * scale),
                feed
            );
        }
        let _ = writeln!(gcode, "G0 Z{}", safe_z);
    }
}

/// Compile `model` and `job` into G-code text.
pub fn generate(
    model: &GeometryModel,
    job: &JobDefinition,
    default_feed: f64,
    default_spindle: f64,
    scale: f64,
) -> String {
    LatheTurningGenerator::new(TurningParameters {
        default_feed,
        default_spindle,
        scale,
    })
    .generate(model, job)
}

/// Invariant decimal rendering: at most four decimals, trailing zeros
/// trimmed, and no negative zero.
pub fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
