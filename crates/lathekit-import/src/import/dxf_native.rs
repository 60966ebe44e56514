//! In-process DXF decoding through the `dxf` crate.
//!
//! The adapter below is the only place that knows the crate's object model;
//! it lowers a `dxf::Drawing` into a [`DxfDocument`] and leaves every point
//! rule to the shared [`EntityDecoder`].

use super::decoder::{Diagnostics, GeometryDecoder, ImportTier};
use super::dxf_model::{DxfDocument, DxfEntity, EntityDecoder};
use dxf::entities::EntityType;
use dxf::Drawing;
use lathekit_core::{CurveTessellator, GeometryModel, ImportError, Point2};
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info};

/// Native DXF decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDxfDecoder {
    entities: EntityDecoder,
}

impl NativeDxfDecoder {
    pub fn new(tessellator: CurveTessellator) -> Self {
        Self {
            entities: EntityDecoder::new(tessellator),
        }
    }

    /// Decode an already loaded drawing.
    pub fn decode_drawing(&self, drawing: &Drawing) -> GeometryModel {
        let document = lower_drawing(drawing);
        debug!(
            "Native DXF: {} entities, {} blocks",
            document.entities.len(),
            document.blocks.len()
        );
        self.entities.decode_document(&document)
    }
}

impl GeometryDecoder for NativeDxfDecoder {
    fn tier(&self) -> ImportTier {
        ImportTier::NativeDxf
    }

    fn decode(
        &self,
        path: &Path,
        _diagnostics: &mut Diagnostics,
    ) -> Result<GeometryModel, ImportError> {
        // A panic inside the reader counts as a tier failure.
        let mut file = File::open(path)?;
        let loaded = panic::catch_unwind(AssertUnwindSafe(|| Drawing::load(&mut file)))
            .map_err(|_| ImportError::decode(self.tier().name(), "DXF reader panicked"))?;
        let drawing = loaded.map_err(|e| ImportError::decode(self.tier().name(), e.to_string()))?;

        let model = self.decode_drawing(&drawing);
        info!(
            "Native DXF decoded {} polylines from {}",
            model.polyline_count(),
            path.display()
        );
        Ok(model)
    }
}

/// Lower a drawing's entities and block table into the closed entity model.
pub(crate) fn lower_drawing(drawing: &Drawing) -> DxfDocument {
    let mut document = DxfDocument::new();
    document.entities = drawing
        .entities()
        .filter_map(|e| lower_entity(&e.specific))
        .collect();

    for block in drawing.blocks() {
        let entities = block
            .entities
            .iter()
            .filter_map(|e| lower_entity(&e.specific))
            .collect();
        document.add_block(
            block.name.clone(),
            Point2::new(block.base_point.x, block.base_point.y),
            entities,
        );
    }
    document
}

fn lower_entity(specific: &EntityType) -> Option<DxfEntity> {
    let entity = match specific {
        EntityType::Line(line) => DxfEntity::Line {
            start: Point2::new(line.p1.x, line.p1.y),
            end: Point2::new(line.p2.x, line.p2.y),
        },
        EntityType::LwPolyline(polyline) => DxfEntity::Polyline {
            vertices: polyline
                .vertices
                .iter()
                .map(|v| Point2::new(v.x, v.y))
                .collect(),
            // Bit 0 (value 1) indicates closed
            closed: polyline.flags & 1 != 0,
        },
        EntityType::Polyline(polyline) => DxfEntity::Polyline {
            vertices: polyline
                .vertices()
                .map(|v| Point2::new(v.location.x, v.location.y))
                .collect(),
            closed: polyline.flags & 1 != 0,
        },
        EntityType::Circle(circle) => DxfEntity::Circle {
            center: Point2::new(circle.center.x, circle.center.y),
            radius: circle.radius,
        },
        EntityType::Arc(arc) => DxfEntity::Arc {
            center: Point2::new(arc.center.x, arc.center.y),
            radius: arc.radius,
            start_angle: arc.start_angle,
            end_angle: arc.end_angle,
        },
        EntityType::Ellipse(ellipse) => DxfEntity::Ellipse {
            center: Point2::new(ellipse.center.x, ellipse.center.y),
            major_axis: Point2::new(ellipse.major_axis.x, ellipse.major_axis.y),
            ratio: ellipse.minor_axis_ratio,
            start_param: ellipse.start_parameter,
            end_param: ellipse.end_parameter,
        },
        EntityType::Spline(spline) => DxfEntity::Spline {
            degree: usize::try_from(spline.degree_of_curve).unwrap_or(0),
            knots: spline.knot_values.clone(),
            control_points: spline
                .control_points
                .iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect(),
            fit_points: spline
                .fit_points
                .iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect(),
        },
        EntityType::Insert(insert) => DxfEntity::Insert {
            block: insert.name.clone(),
            position: Point2::new(insert.location.x, insert.location.y),
            scale_x: insert.x_scale_factor,
            scale_y: insert.y_scale_factor,
            rotation: insert.rotation,
        },
        _ => return None,
    };
    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf::entities::{Circle, Entity, Insert, Line};
    use dxf::{Block, Point};

    #[test]
    fn test_lower_line_and_circle() {
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::new(EntityType::Line(Line::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(10.0, 0.0, 0.0),
        ))));
        drawing.add_entity(Entity::new(EntityType::Circle(Circle::new(
            Point::new(5.0, 5.0, 0.0),
            2.0,
        ))));

        let document = lower_drawing(&drawing);
        assert_eq!(document.entities.len(), 2);
        assert_eq!(
            document.entities[0],
            DxfEntity::Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(10.0, 0.0),
            }
        );

        let model = NativeDxfDecoder::new(CurveTessellator::new(12)).decode_drawing(&drawing);
        assert_eq!(model.polyline_count(), 2);
        assert_eq!(model.polylines[1].len(), 13);
    }

    #[test]
    fn test_block_reference_is_expanded() {
        let mut drawing = Drawing::new();
        let block = Block {
            name: "TOOTH".to_string(),
            entities: vec![Entity::new(EntityType::Line(Line::new(
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
            )))],
            ..Default::default()
        };
        drawing.add_block(block);

        let insert = Insert {
            name: "TOOTH".to_string(),
            location: Point::new(10.0, 10.0, 0.0),
            x_scale_factor: 2.0,
            y_scale_factor: 2.0,
            rotation: 90.0,
            ..Default::default()
        };
        drawing.add_entity(Entity::new(EntityType::Insert(insert)));

        let model = NativeDxfDecoder::default().decode_drawing(&drawing);
        assert_eq!(model.polyline_count(), 1);
        let points = &model.polylines[0].points;
        assert!(points[0].distance_to(&Point2::new(10.0, 10.0)) < 1e-9);
        assert!(points[1].distance_to(&Point2::new(10.0, 12.0)) < 1e-9);
    }
}
