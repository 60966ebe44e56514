//! Lathe tools and job definitions

use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cutting tool mounted on the lathe turret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Turret position, rendered as a two-digit `T` word
    pub number: u32,
    pub name: String,
    /// Tip diameter in job units
    pub diameter: f64,
    /// Feed rate (`F` word); non-positive means "use the job default"
    pub feed_rate: f64,
    /// Spindle speed in RPM; non-positive means "use the job default"
    pub spindle_speed: f64,
}

impl Tool {
    /// Creates a new tool.
    pub fn new(
        number: u32,
        name: impl Into<String>,
        diameter: f64,
        feed_rate: f64,
        spindle_speed: f64,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            diameter,
            feed_rate,
            spindle_speed,
        }
    }

    /// Tool-select word, e.g. `T01`.
    pub fn tool_word(&self) -> String {
        format!("T{:02}", self.number)
    }
}

/// Parameters for one G-code compilation
///
/// Immutable for the duration of a compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub units: Units,
    /// Retract height used for every rapid clear move
    pub safe_z: f64,
    /// Reserved for multi-pass roughing; the single-pass generator ignores it
    pub depth_per_pass: f64,
    /// Tools in the order they are used
    pub tools: Vec<Tool>,
}

impl Default for JobDefinition {
    fn default() -> Self {
        Self {
            units: Units::Mm,
            safe_z: 5.0,
            depth_per_pass: 0.5,
            tools: Vec::new(),
        }
    }
}

impl JobDefinition {
    pub fn new(units: Units, safe_z: f64, depth_per_pass: f64, tools: Vec<Tool>) -> Self {
        Self {
            units,
            safe_z,
            depth_per_pass,
            tools,
        }
    }

    /// Tool numbers that are zero or appear more than once.
    ///
    /// Such jobs are still accepted; callers may warn about them.
    pub fn suspicious_tool_numbers(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut flagged = Vec::new();
        for tool in &self.tools {
            let duplicate = !seen.insert(tool.number);
            if (tool.number == 0 || duplicate) && !flagged.contains(&tool.number) {
                flagged.push(tool.number);
            }
        }
        flagged
    }
}
