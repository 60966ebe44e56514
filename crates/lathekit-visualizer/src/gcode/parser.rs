//! Motion-line parser
//!
//! Only `G0`/`G1` lines count as motion. Each one yields exactly one
//! waypoint; an axis the line omits keeps its last value. Everything else,
//! including malformed lines, is skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Tool position in machine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub z: f64,
}

impl Waypoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

fn comment_regex() -> &'static Regex {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    COMMENT_REGEX.get_or_init(|| Regex::new(r"[;(].*").expect("invalid regex pattern"))
}

fn motion_regex() -> &'static Regex {
    static MOTION_REGEX: OnceLock<Regex> = OnceLock::new();
    MOTION_REGEX
        .get_or_init(|| Regex::new(r"^\s*G0?[01](?:\D|$)").expect("invalid regex pattern"))
}

fn axis_regex(axis: char) -> &'static Regex {
    static X_REGEX: OnceLock<Regex> = OnceLock::new();
    static Z_REGEX: OnceLock<Regex> = OnceLock::new();
    let cell = if axis == 'X' { &X_REGEX } else { &Z_REGEX };
    cell.get_or_init(|| {
        Regex::new(&format!(r"{}\s*([-+]?(?:\d+\.?\d*|\.\d+))", axis))
            .expect("invalid regex pattern")
    })
}

fn axis_value(line: &str, axis: char) -> Option<f64> {
    axis_regex(axis)
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Extract the waypoint path from G-code text. The running position starts
/// at the origin.
pub fn parse_waypoints(gcode: &str) -> Vec<Waypoint> {
    let mut position = Waypoint::default();
    let mut path = Vec::new();

    for raw in gcode.lines() {
        let upper = raw.to_ascii_uppercase();
        let line = comment_regex().replace(&upper, "");
        if !motion_regex().is_match(&line) {
            continue;
        }
        if let Some(x) = axis_value(&line, 'X') {
            position.x = x;
        }
        if let Some(z) = axis_value(&line, 'Z') {
            position.z = z;
        }
        path.push(position);
    }

    debug!("Parsed {} waypoints", path.len());
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rapid_and_feed_lines_are_motion() {
        let gcode = "G21\nG90\nT01\nM6\nS1200\nM3\nG0 Z5\nG0 X1 Z2\nG1 X3 F0.2\nG2 X9 Z9\nM5\nM30\n";
        let path = parse_waypoints(gcode);
        assert_eq!(
            path,
            vec![
                Waypoint::new(0.0, 5.0),
                Waypoint::new(1.0, 2.0),
                Waypoint::new(3.0, 2.0),
            ]
        );
    }

    #[test]
    fn test_leading_zero_lowercase_and_comments() {
        let gcode = "g00 x1.5 z-2 ; rapid\nG01X.5Z+3(feed)\n; G1 X99\n(G0 Z99)\nG10 L2 X7\n";
        let path = parse_waypoints(gcode);
        assert_eq!(
            path,
            vec![Waypoint::new(1.5, -2.0), Waypoint::new(0.5, 3.0)]
        );
    }

    #[test]
    fn test_motion_line_without_axes_repeats_position() {
        let path = parse_waypoints("G0 X1 Z1\nG1 F100\n");
        assert_eq!(path, vec![Waypoint::new(1.0, 1.0), Waypoint::new(1.0, 1.0)]);
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse_waypoints("").is_empty());
        assert!(parse_waypoints("hello\n%\nX5 Z5\n").is_empty());
    }
}
