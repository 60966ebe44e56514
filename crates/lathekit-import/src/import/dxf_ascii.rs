//! Last-resort DXF scanner over raw group-code/value line pairs.
//!
//! Only LINE, LWPOLYLINE, POLYLINE, CIRCLE, and ARC are recognized. Blocks,
//! inserts, and every other entity are ignored. Entities found here go
//! through the same [`EntityDecoder`] rules as the native tier.

use super::decoder::{Diagnostics, GeometryDecoder, ImportTier};
use super::dxf_model::{DxfDocument, DxfEntity, EntityDecoder};
use lathekit_core::{CurveTessellator, GeometryModel, ImportError, Point2};
use std::path::Path;
use tracing::{debug, info, warn};

const ENTITY_HEADERS: [&str; 5] = ["LINE", "LWPOLYLINE", "POLYLINE", "CIRCLE", "ARC"];

#[derive(Debug, Clone, Copy)]
struct Group<'a> {
    code: i32,
    value: &'a str,
}

/// Group-code scanner for simple legacy DXF
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiDxfDecoder {
    entities: EntityDecoder,
}

impl AsciiDxfDecoder {
    pub fn new(tessellator: CurveTessellator) -> Self {
        Self {
            entities: EntityDecoder::new(tessellator),
        }
    }

    /// Decode DXF text.
    pub fn decode_str(&self, content: &str) -> GeometryModel {
        let groups = parse_groups(content);
        let document = DxfDocument {
            entities: scan_entities(&groups),
            ..Default::default()
        };
        debug!(
            "ASCII DXF: {} groups, {} recognized entities",
            groups.len(),
            document.entities.len()
        );
        self.entities.decode_document(&document)
    }
}

impl GeometryDecoder for AsciiDxfDecoder {
    fn tier(&self) -> ImportTier {
        ImportTier::AsciiDxf
    }

    fn decode(
        &self,
        path: &Path,
        _diagnostics: &mut Diagnostics,
    ) -> Result<GeometryModel, ImportError> {
        let bytes = std::fs::read(path)?;
        // Legacy files are frequently not valid UTF-8 (code-page text).
        let content = String::from_utf8_lossy(&bytes);
        let model = self.decode_str(&content);
        info!(
            "ASCII DXF decoded {} polylines from {}",
            model.polyline_count(),
            path.display()
        );
        Ok(model)
    }
}

/// Pair up lines as (group code, value). Pairs whose code is not an integer
/// are dropped, as is a trailing unpaired line.
fn parse_groups(input: &str) -> Vec<Group<'_>> {
    let lines: Vec<&str> = input.lines().collect();
    lines
        .chunks_exact(2)
        .filter_map(|pair| {
            let code = pair[0].trim().parse::<i32>().ok()?;
            Some(Group {
                code,
                value: pair[1].trim(),
            })
        })
        .collect()
}

fn scan_entities(groups: &[Group<'_>]) -> Vec<DxfEntity> {
    let mut entities = Vec::new();
    let mut in_blocks = false;
    let mut i = 0usize;

    while i < groups.len() {
        let g = groups[i];
        if g.code != 0 {
            i += 1;
            continue;
        }

        match g.value {
            "SECTION" => {
                in_blocks = groups
                    .get(i + 1)
                    .is_some_and(|name| name.code == 2 && name.value == "BLOCKS");
                i += 1;
                continue;
            }
            "ENDSEC" => {
                in_blocks = false;
                i += 1;
                continue;
            }
            _ => {}
        }

        let kind = g.value;
        i += 1;
        let start = i;
        while i < groups.len() && groups[i].code != 0 {
            i += 1;
        }
        let body = &groups[start..i];

        if in_blocks || !ENTITY_HEADERS.contains(&kind) {
            continue;
        }

        // Old-style POLYLINE keeps its vertices in VERTEX records up to SEQEND.
        let mut vertices = Vec::new();
        if kind == "POLYLINE" {
            while i < groups.len() && groups[i].code == 0 && groups[i].value == "VERTEX" {
                i += 1;
                let vstart = i;
                while i < groups.len() && groups[i].code != 0 {
                    i += 1;
                }
                match point_of(&groups[vstart..i], 10, 20) {
                    Ok(p) => vertices.push(p),
                    Err(reason) => warn!("Skipping malformed VERTEX: {}", reason),
                }
            }
        }

        match build_entity(kind, body, vertices) {
            Ok(entity) => entities.push(entity),
            Err(reason) => warn!("Skipping malformed {}: {}", kind, reason),
        }
    }

    entities
}

fn build_entity(
    kind: &str,
    body: &[Group<'_>],
    vertices: Vec<Point2>,
) -> Result<DxfEntity, String> {
    match kind {
        "LINE" => Ok(DxfEntity::Line {
            start: point_of(body, 10, 20)?,
            end: point_of(body, 11, 21)?,
        }),
        "LWPOLYLINE" => Ok(DxfEntity::Polyline {
            vertices: lw_vertices(body)?,
            closed: closed_flag(body),
        }),
        "POLYLINE" => Ok(DxfEntity::Polyline {
            vertices,
            closed: closed_flag(body),
        }),
        "CIRCLE" => Ok(DxfEntity::Circle {
            center: point_of(body, 10, 20)?,
            radius: number(body, 40)?,
        }),
        "ARC" => Ok(DxfEntity::Arc {
            center: point_of(body, 10, 20)?,
            radius: number(body, 40)?,
            start_angle: number(body, 50)?,
            end_angle: number(body, 51)?,
        }),
        other => Err(format!("unsupported entity {}", other)),
    }
}

/// LWPOLYLINE vertices: each 10 (X) is completed by the next 20 (Y).
fn lw_vertices(body: &[Group<'_>]) -> Result<Vec<Point2>, String> {
    let mut vertices = Vec::new();
    let mut pending_x: Option<f64> = None;
    for g in body {
        match g.code {
            10 => pending_x = Some(parse_f64(g)?),
            20 => {
                if let Some(x) = pending_x.take() {
                    vertices.push(Point2::new(x, parse_f64(g)?));
                }
            }
            _ => {}
        }
    }
    Ok(vertices)
}

fn closed_flag(body: &[Group<'_>]) -> bool {
    body.iter()
        .find(|g| g.code == 70)
        .and_then(|g| g.value.parse::<i32>().ok())
        .is_some_and(|flags| flags & 1 != 0)
}

/// Missing coordinates default to zero, as DXF readers conventionally do.
fn point_of(body: &[Group<'_>], x_code: i32, y_code: i32) -> Result<Point2, String> {
    Ok(Point2::new(
        optional(body, x_code)?.unwrap_or(0.0),
        optional(body, y_code)?.unwrap_or(0.0),
    ))
}

fn number(body: &[Group<'_>], code: i32) -> Result<f64, String> {
    optional(body, code)?.ok_or_else(|| format!("missing group {}", code))
}

fn optional(body: &[Group<'_>], code: i32) -> Result<Option<f64>, String> {
    body.iter()
        .find(|g| g.code == code)
        .map(parse_f64)
        .transpose()
}

fn parse_f64(g: &Group<'_>) -> Result<f64, String> {
    g.value
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{}' for group {}", g.value, g.code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dxf(pairs: &[(i32, &str)]) -> String {
        pairs
            .iter()
            .map(|(c, v)| format!("{}\n{}\n", c, v))
            .collect()
    }

    #[test]
    fn test_single_line_entity() {
        let content = dxf(&[
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "LINE"),
            (8, "0"),
            (10, "0"),
            (20, "0"),
            (11, "10"),
            (21, "0"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        assert_eq!(model.polyline_count(), 1);
        assert_eq!(
            model.polylines[0].points,
            vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]
        );
    }

    #[test]
    fn test_bare_entity_without_sections() {
        let content = dxf(&[
            (0, "LINE"),
            (10, "1.5"),
            (20, "2.5"),
            (11, "3"),
            (21, "4"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        assert_eq!(
            model.polylines[0].points,
            vec![Point2::new(1.5, 2.5), Point2::new(3.0, 4.0)]
        );
    }

    #[test]
    fn test_lwpolyline_closed() {
        let content = dxf(&[
            (0, "LWPOLYLINE"),
            (90, "3"),
            (70, "1"),
            (10, "0"),
            (20, "0"),
            (10, "5"),
            (20, "0"),
            (10, "5"),
            (20, "5"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        let points = &model.polylines[0].points;
        assert_eq!(points.len(), 4);
        assert_eq!(points[3], Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_old_style_polyline_vertices() {
        let content = dxf(&[
            (0, "POLYLINE"),
            (66, "1"),
            (10, "0"),
            (20, "0"),
            (0, "VERTEX"),
            (10, "1"),
            (20, "1"),
            (0, "VERTEX"),
            (10, "2"),
            (20, "3"),
            (0, "SEQEND"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        assert_eq!(
            model.polylines[0].points,
            vec![Point2::new(1.0, 1.0), Point2::new(2.0, 3.0)]
        );
    }

    #[test]
    fn test_circle_and_wrapping_arc() {
        let content = dxf(&[
            (0, "CIRCLE"),
            (10, "0"),
            (20, "0"),
            (40, "2"),
            (0, "ARC"),
            (10, "0"),
            (20, "0"),
            (40, "1"),
            (50, "350"),
            (51, "10"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::new(CurveTessellator::new(20)).decode_str(&content);
        assert_eq!(model.polyline_count(), 2);
        assert_eq!(model.polylines[0].len(), 21);
        let arc = &model.polylines[1];
        assert!((arc.points[10].x - 1.0).abs() < 1e-9);
        assert!(arc.points[10].y.abs() < 1e-9);
    }

    #[test]
    fn test_blocks_and_unknown_entities_are_ignored() {
        let content = dxf(&[
            (0, "SECTION"),
            (2, "BLOCKS"),
            (0, "BLOCK"),
            (2, "B"),
            (0, "LINE"),
            (10, "0"),
            (20, "0"),
            (11, "1"),
            (21, "1"),
            (0, "ENDBLK"),
            (0, "ENDSEC"),
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "INSERT"),
            (2, "B"),
            (10, "5"),
            (20, "5"),
            (0, "TEXT"),
            (1, "hello"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        assert!(model.is_empty());
    }

    #[test]
    fn test_malformed_entity_is_skipped() {
        let content = dxf(&[
            (0, "CIRCLE"),
            (10, "0"),
            (20, "0"),
            (40, "not-a-number"),
            (0, "LINE"),
            (10, "0"),
            (20, "0"),
            (11, "2"),
            (21, "0"),
            (0, "EOF"),
        ]);
        let model = AsciiDxfDecoder::default().decode_str(&content);
        assert_eq!(model.polyline_count(), 1);
    }
}
