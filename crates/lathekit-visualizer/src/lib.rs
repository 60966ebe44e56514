//! # LatheKit Visualizer
//!
//! Re-reads generated G-code as a sequence of (X, Z) waypoints and replays
//! them at a chosen speed for preview. Rendering is left to the caller; the
//! simulator only reports positions.

pub mod gcode;
pub mod simulator;

pub use gcode::{parse_waypoints, Waypoint};
pub use simulator::{ToolpathSimulator, DEFAULT_BASE_INTERVAL};
