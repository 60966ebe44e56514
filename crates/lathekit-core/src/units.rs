//! Units of measure
//!
//! A job is programmed either in millimeters or inches; the choice selects
//! the `G21`/`G20` directive at the top of the program.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Program units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters (G21)
    #[default]
    Mm,
    /// Inches (G20)
    Inch,
}

impl Units {
    /// The G-code directive selecting these units.
    pub fn gcode(&self) -> &'static str {
        match self {
            Self::Mm => "G21",
            Self::Inch => "G20",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm => write!(f, "mm"),
            Self::Inch => write!(f, "inch"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "metric" | "millimeter" | "millimeters" => Ok(Self::Mm),
            "inch" | "in" | "imperial" | "inches" => Ok(Self::Inch),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}
