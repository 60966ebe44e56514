//! SVG path decoding.
//!
//! Reads the `d` attribute of every `<path>` element and keeps only the
//! move-to and line-to commands (absolute `M`/`L` and relative `m`/`l`).
//! Curves and every other command are skipped together with their arguments,
//! though the pen still follows them.

use super::decoder::{Diagnostics, GeometryDecoder, ImportTier};
use lathekit_core::{GeometryModel, ImportError, Point2, Polyline};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// SVG `<path>` decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgDecoder;

impl SvgDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode every `<path d="...">` in an SVG document, in document order.
    pub fn decode_str(&self, svg_content: &str) -> GeometryModel {
        static PATH_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PATH_REGEX.get_or_init(|| {
            Regex::new(r#"(?s)<path\b[^>]*?\sd\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("invalid regex pattern")
        });

        let mut model = GeometryModel::new();
        for caps in regex.captures_iter(svg_content) {
            let Some(d) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            model.extend(decode_path_data(d.as_str()));
        }
        model
    }
}

impl GeometryDecoder for SvgDecoder {
    fn tier(&self) -> ImportTier {
        ImportTier::Svg
    }

    fn decode(
        &self,
        path: &Path,
        _diagnostics: &mut Diagnostics,
    ) -> Result<GeometryModel, ImportError> {
        let content = std::fs::read_to_string(path)?;
        let model = self.decode_str(&content);
        info!(
            "SVG decoded {} polylines from {}",
            model.polyline_count(),
            path.display()
        );
        Ok(model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

/// Tokenize SVG path data into commands and numbers
fn tokenize(path_data: &str) -> Vec<Token> {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"[MmLlHhVvCcSsQqTtAaZz]|[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?")
            .expect("invalid regex pattern")
    });

    regex
        .find_iter(path_data)
        .filter_map(|m| {
            let text = m.as_str();
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some(Token::Command(c)),
                _ => text.parse::<f64>().ok().map(Token::Number),
            }
        })
        .collect()
}

/// Number of arguments a path command consumes per repetition.
fn arity(command: char) -> usize {
    match command.to_ascii_uppercase() {
        'H' | 'V' => 1,
        'M' | 'L' | 'T' => 2,
        'S' | 'Q' => 4,
        'C' => 6,
        'A' => 7,
        _ => 0,
    }
}

/// Where the pen ends up after one full set of arguments.
fn endpoint(command: char, args: &[f64], position: Point2) -> Point2 {
    let (x, y) = match command.to_ascii_uppercase() {
        'H' => (Some(args[0]), None),
        'V' => (None, Some(args[0])),
        _ => {
            let n = args.len();
            (Some(args[n - 2]), Some(args[n - 1]))
        }
    };
    if command.is_ascii_lowercase() {
        Point2::new(
            position.x + x.unwrap_or(0.0),
            position.y + y.unwrap_or(0.0),
        )
    } else {
        Point2::new(x.unwrap_or(position.x), y.unwrap_or(position.y))
    }
}

/// Decode one `d` attribute. Each move-to starts a new polyline.
///
/// Skipped commands still move the pen, so a relative command after a curve
/// is measured from the curve's end.
fn decode_path_data(path_data: &str) -> GeometryModel {
    let tokens = tokenize(path_data);
    let mut model = GeometryModel::new();
    let mut current: Vec<Point2> = Vec::new();
    let mut position = Point2::default();
    let mut subpath_start = Point2::default();
    let mut command: Option<char> = None;
    let mut args: Vec<f64> = Vec::with_capacity(7);

    for token in tokens {
        match token {
            Token::Command(c) => {
                args.clear();
                match c {
                    'Z' | 'z' => {
                        // Closing is not drawn, but the pen returns to the subpath start.
                        position = subpath_start;
                        command = None;
                    }
                    _ => command = Some(c),
                }
            }
            Token::Number(value) => {
                let Some(cmd) = command else { continue };
                args.push(value);
                if args.len() < arity(cmd) {
                    continue;
                }
                let target = endpoint(cmd, &args, position);
                args.clear();

                match cmd {
                    'M' | 'm' => {
                        model.push(Polyline::new(std::mem::take(&mut current)));
                        subpath_start = target;
                        current.push(target);
                        // Further pairs after a move-to are implicit line-tos.
                        command = Some(if cmd == 'm' { 'l' } else { 'L' });
                    }
                    'L' | 'l' => current.push(target),
                    _ => {}
                }
                position = target;
            }
        }
    }

    model.push(Polyline::new(current));
    debug!("SVG path data produced {} polylines", model.polyline_count());
    model
}
