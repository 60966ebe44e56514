//! G-code motion parsing

pub mod parser;

pub use parser::{parse_waypoints, Waypoint};
