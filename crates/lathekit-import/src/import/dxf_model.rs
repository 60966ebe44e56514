//! Library-independent DXF entity model and its point rules.
//!
//! Each DXF reader (the `dxf` crate adapter and the ASCII scanner) lowers its
//! input into a [`DxfDocument`]. The [`EntityDecoder`] then turns every
//! entity into polylines, threading an [`Affine2`] through block references.

use lathekit_core::{Affine2, CurveTessellator, GeometryModel, ImportError, Point2, Polyline};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Deepest chain of nested block references that will be expanded.
pub const MAX_INSERT_DEPTH: usize = 16;

/// The entity kinds the importer understands
#[derive(Debug, Clone, PartialEq)]
pub enum DxfEntity {
    Line {
        start: Point2,
        end: Point2,
    },
    /// LWPOLYLINE and 2D/3D POLYLINE; only X/Y are kept
    Polyline {
        vertices: Vec<Point2>,
        closed: bool,
    },
    Circle {
        center: Point2,
        radius: f64,
    },
    /// Angles in degrees
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    /// Parameters in radians; `major_axis` is relative to the center
    Ellipse {
        center: Point2,
        major_axis: Point2,
        ratio: f64,
        start_param: f64,
        end_param: f64,
    },
    Spline {
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point2>,
        fit_points: Vec<Point2>,
    },
    /// Block reference
    Insert {
        block: String,
        position: Point2,
        scale_x: f64,
        scale_y: f64,
        /// Degrees, counter-clockwise
        rotation: f64,
    },
}

impl DxfEntity {
    pub fn kind(&self) -> &'static str {
        match self {
            DxfEntity::Line { .. } => "LINE",
            DxfEntity::Polyline { .. } => "POLYLINE",
            DxfEntity::Circle { .. } => "CIRCLE",
            DxfEntity::Arc { .. } => "ARC",
            DxfEntity::Ellipse { .. } => "ELLIPSE",
            DxfEntity::Spline { .. } => "SPLINE",
            DxfEntity::Insert { .. } => "INSERT",
        }
    }
}

/// A block definition: its base point and entities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDefinition {
    pub base_point: Point2,
    pub entities: Vec<DxfEntity>,
}

/// Top-level entities plus the block table they may reference
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DxfDocument {
    pub entities: Vec<DxfEntity>,
    pub blocks: HashMap<String, BlockDefinition>,
}

impl DxfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(
        &mut self,
        name: impl Into<String>,
        base_point: Point2,
        entities: Vec<DxfEntity>,
    ) {
        self.blocks.insert(
            name.into(),
            BlockDefinition {
                base_point,
                entities,
            },
        );
    }
}

/// Applies the per-kind point rules to a [`DxfDocument`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityDecoder {
    tessellator: CurveTessellator,
}

impl EntityDecoder {
    pub fn new(tessellator: CurveTessellator) -> Self {
        Self { tessellator }
    }

    /// Decode every top-level entity. An entity that fails is skipped.
    pub fn decode_document(&self, document: &DxfDocument) -> GeometryModel {
        let mut model = GeometryModel::new();
        for entity in &document.entities {
            match self.decode_entity(entity, document, &Affine2::identity(), 0) {
                Ok(polylines) => polylines.into_iter().for_each(|p| model.push(p)),
                Err(e) => warn!("Skipping {} entity: {}", entity.kind(), e),
            }
        }
        model
    }

    /// Decode one entity under `transform`, expanding block references.
    pub fn decode_entity(
        &self,
        entity: &DxfEntity,
        document: &DxfDocument,
        transform: &Affine2,
        depth: usize,
    ) -> Result<Vec<Polyline>, ImportError> {
        let local = match entity {
            DxfEntity::Line { start, end } => Polyline::new(vec![*start, *end]),
            DxfEntity::Polyline { vertices, closed } => {
                if *closed {
                    Polyline::closed(vertices.clone())
                } else {
                    Polyline::new(vertices.clone())
                }
            }
            DxfEntity::Circle { center, radius } => {
                check_radius(*radius)?;
                self.tessellator.circle(*center, *radius)
            }
            DxfEntity::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                check_radius(*radius)?;
                self.tessellator
                    .arc(*center, *radius, *start_angle, *end_angle)
            }
            DxfEntity::Ellipse {
                center,
                major_axis,
                ratio,
                start_param,
                end_param,
            } => {
                if !(*ratio > 0.0) || !major_axis.is_finite() {
                    return Err(ImportError::decode("entity", "degenerate ellipse"));
                }
                self.tessellator
                    .ellipse(*center, *major_axis, *ratio, *start_param, *end_param)
            }
            DxfEntity::Spline {
                degree,
                knots,
                control_points,
                fit_points,
            } => self.spline_points(*degree, knots, control_points, fit_points),
            DxfEntity::Insert {
                block,
                position,
                scale_x,
                scale_y,
                rotation,
            } => {
                return self.expand_insert(
                    block, *position, *scale_x, *scale_y, *rotation, document, transform, depth,
                );
            }
        };

        if !local.points.iter().all(Point2::is_finite) {
            return Err(ImportError::decode(
                "entity",
                format!("{} has non-finite coordinates", entity.kind()),
            ));
        }

        let polyline = if transform.is_identity() {
            local
        } else {
            local.transformed(transform)
        };
        Ok(vec![polyline])
    }

    fn spline_points(
        &self,
        degree: usize,
        knots: &[f64],
        control_points: &[Point2],
        fit_points: &[Point2],
    ) -> Polyline {
        if fit_points.len() >= 2 {
            return Polyline::new(fit_points.to_vec());
        }
        match self.tessellator.bspline(degree, knots, control_points) {
            Some(curve) => curve,
            None => {
                debug!(
                    "Spline (degree {}, {} knots) not evaluable, using control polygon",
                    degree,
                    knots.len()
                );
                Polyline::new(control_points.to_vec())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_insert(
        &self,
        block: &str,
        position: Point2,
        scale_x: f64,
        scale_y: f64,
        rotation: f64,
        document: &DxfDocument,
        transform: &Affine2,
        depth: usize,
    ) -> Result<Vec<Polyline>, ImportError> {
        if depth >= MAX_INSERT_DEPTH {
            return Err(ImportError::decode(
                "entity",
                format!("block '{}' nested deeper than {}", block, MAX_INSERT_DEPTH),
            ));
        }
        let definition = document.blocks.get(block).ok_or_else(|| {
            ImportError::decode("entity", format!("block '{}' not found", block))
        })?;

        let insert = Affine2::block_insert(position, scale_x, scale_y, rotation).then_inner(
            &Affine2::translation(-definition.base_point.x, -definition.base_point.y),
        );
        let combined = transform.then_inner(&insert);

        debug!(
            "Expanding INSERT '{}' at ({}, {}) scale=({}, {}) rot={} depth={}",
            block, position.x, position.y, scale_x, scale_y, rotation, depth
        );

        let mut polylines = Vec::new();
        for child in &definition.entities {
            match self.decode_entity(child, document, &combined, depth + 1) {
                Ok(mut decoded) => polylines.append(&mut decoded),
                Err(e) => warn!("Skipping {} in block '{}': {}", child.kind(), block, e),
            }
        }
        Ok(polylines)
    }
}

fn check_radius(radius: f64) -> Result<(), ImportError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(ImportError::decode("entity", format!("invalid radius {}", radius)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(p: Point2, x: f64, y: f64) -> bool {
        (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9
    }

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> DxfEntity {
        DxfEntity::Line {
            start: Point2::new(x1, y1),
            end: Point2::new(x2, y2),
        }
    }

    fn insert(block: &str, x: f64, y: f64, s: f64, rot: f64) -> DxfEntity {
        DxfEntity::Insert {
            block: block.to_string(),
            position: Point2::new(x, y),
            scale_x: s,
            scale_y: s,
            rotation: rot,
        }
    }

    #[test]
    fn test_closed_polyline_appends_first_vertex() {
        let mut doc = DxfDocument::new();
        doc.entities.push(DxfEntity::Polyline {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 2.0),
            ],
            closed: true,
        });
        let model = EntityDecoder::default().decode_document(&doc);
        assert_eq!(model.polylines[0].len(), 4);
        assert_eq!(model.polylines[0].points[3], Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_block_insert_scale_rotate_translate() {
        let mut doc = DxfDocument::new();
        doc.add_block("UNIT", Point2::default(), vec![line(0.0, 0.0, 1.0, 0.0)]);
        doc.entities.push(insert("UNIT", 10.0, 10.0, 2.0, 90.0));

        let model = EntityDecoder::default().decode_document(&doc);
        assert_eq!(model.polyline_count(), 1);
        let points = &model.polylines[0].points;
        assert!(approx(points[0], 10.0, 10.0));
        assert!(approx(points[1], 10.0, 12.0));
    }

    #[test]
    fn test_nested_inserts_compose() {
        let mut doc = DxfDocument::new();
        doc.add_block("INNER", Point2::default(), vec![line(0.0, 0.0, 1.0, 0.0)]);
        doc.add_block(
            "OUTER",
            Point2::default(),
            vec![insert("INNER", 5.0, 0.0, 1.0, 0.0)],
        );
        doc.entities.push(insert("OUTER", 0.0, 100.0, 2.0, 0.0));

        let model = EntityDecoder::default().decode_document(&doc);
        let points = &model.polylines[0].points;
        // Inner puts the line at x=5..6, outer doubles it and lifts it by 100.
        assert!(approx(points[0], 10.0, 100.0));
        assert!(approx(points[1], 12.0, 100.0));
    }

    #[test]
    fn test_block_base_point_is_origin_of_insert() {
        let mut doc = DxfDocument::new();
        doc.add_block("B", Point2::new(1.0, 1.0), vec![line(1.0, 1.0, 2.0, 1.0)]);
        doc.entities.push(insert("B", 0.0, 0.0, 1.0, 0.0));

        let model = EntityDecoder::default().decode_document(&doc);
        assert!(approx(model.polylines[0].points[0], 0.0, 0.0));
        assert!(approx(model.polylines[0].points[1], 1.0, 0.0));
    }

    #[test]
    fn test_bad_entities_are_skipped_not_fatal() {
        let mut doc = DxfDocument::new();
        doc.entities.push(DxfEntity::Circle {
            center: Point2::default(),
            radius: -1.0,
        });
        doc.entities.push(insert("MISSING", 0.0, 0.0, 1.0, 0.0));
        doc.entities.push(line(f64::NAN, 0.0, 1.0, 0.0));
        doc.entities.push(line(0.0, 0.0, 3.0, 0.0));

        let model = EntityDecoder::default().decode_document(&doc);
        assert_eq!(model.polyline_count(), 1);
        assert_eq!(model.polylines[0].points[1], Point2::new(3.0, 0.0));
    }

    #[test]
    fn test_self_referencing_block_stops_at_depth_limit() {
        let mut doc = DxfDocument::new();
        doc.add_block(
            "LOOP",
            Point2::default(),
            vec![line(0.0, 0.0, 1.0, 0.0), insert("LOOP", 1.0, 0.0, 1.0, 0.0)],
        );
        doc.entities.push(insert("LOOP", 0.0, 0.0, 1.0, 0.0));

        let model = EntityDecoder::default().decode_document(&doc);
        assert_eq!(model.polyline_count(), MAX_INSERT_DEPTH);
    }

    #[test]
    fn test_spline_prefers_fit_points_then_evaluation_then_control_polygon() {
        let decoder = EntityDecoder::new(CurveTessellator::new(4));
        let doc = DxfDocument::new();
        let control = vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0)];

        let fit = DxfEntity::Spline {
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            control_points: control.clone(),
            fit_points: vec![Point2::new(9.0, 9.0), Point2::new(8.0, 8.0)],
        };
        let out = decoder
            .decode_entity(&fit, &doc, &Affine2::identity(), 0)
            .unwrap();
        assert_eq!(out[0].points, vec![Point2::new(9.0, 9.0), Point2::new(8.0, 8.0)]);

        let evaluated = DxfEntity::Spline {
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            control_points: control.clone(),
            fit_points: vec![],
        };
        let out = decoder
            .decode_entity(&evaluated, &doc, &Affine2::identity(), 0)
            .unwrap();
        assert_eq!(out[0].len(), 5);

        let polygon = DxfEntity::Spline {
            degree: 3,
            knots: vec![],
            control_points: control.clone(),
            fit_points: vec![],
        };
        let out = decoder
            .decode_entity(&polygon, &doc, &Affine2::identity(), 0)
            .unwrap();
        assert_eq!(out[0].points, control);
    }
}
