//! Canonical geometry model
//!
//! Every importer produces a [`GeometryModel`]: an ordered list of polylines,
//! each an ordered list of 2D points in drawing units. No layer, color, or
//! entity metadata survives import. Closed source entities repeat their first
//! point as the last one.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// A point in drawing space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// True when both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of points joined by straight segments
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point2>,
}

impl Polyline {
    /// Creates a polyline from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Creates a closed polyline by appending the first point again.
    pub fn closed(mut points: Vec<Point2>) -> Self {
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point2> {
        self.points.first()
    }

    /// Applies a transform to every point, returning a new polyline.
    pub fn transformed(&self, transform: &Affine2) -> Polyline {
        Polyline {
            points: self.points.iter().map(|p| transform.apply(*p)).collect(),
        }
    }

    /// Sum of segment lengths.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }
}

impl From<Vec<Point2>> for Polyline {
    fn from(points: Vec<Point2>) -> Self {
        Self { points }
    }
}

/// Axis-aligned bounding box of a geometry model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point2,
    pub max: Point2,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Ordered collection of polylines produced by one import
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryModel {
    pub polylines: Vec<Polyline>,
}

impl GeometryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a polyline. Empty polylines are dropped.
    pub fn push(&mut self, polyline: Polyline) {
        if !polyline.is_empty() {
            self.polylines.push(polyline);
        }
    }

    /// Appends every non-empty polyline from another model.
    pub fn extend(&mut self, other: GeometryModel) {
        for polyline in other.polylines {
            self.push(polyline);
        }
    }

    /// True when the model holds no non-empty polyline.
    ///
    /// This is the failure signal for a decoder tier.
    pub fn is_empty(&self) -> bool {
        self.polylines.iter().all(Polyline::is_empty)
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    pub fn point_count(&self) -> usize {
        self.polylines.iter().map(Polyline::len).sum()
    }

    /// Bounding box over every point, or `None` for an empty model.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.polylines.iter().flat_map(|p| p.points.iter());
        let first = *points.next()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for p in points {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }
}

impl FromIterator<Polyline> for GeometryModel {
    fn from_iter<I: IntoIterator<Item = Polyline>>(iter: I) -> Self {
        let mut model = GeometryModel::new();
        for polyline in iter {
            model.push(polyline);
        }
        model
    }
}

/// 2D affine transform in homogeneous coordinates
///
/// Composition follows matrix multiplication: `a.then_inner(&b)` applies `b`
/// first and `a` second, which is how nested block references stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    matrix: Matrix3<f64>,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine2 {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// Counter-clockwise rotation in degrees.
    pub fn rotation_degrees(angle: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self {
            matrix: Matrix3::new(cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// Transform of a block reference: scale, then rotate, then translate.
    pub fn block_insert(
        position: Point2,
        scale_x: f64,
        scale_y: f64,
        rotation_degrees: f64,
    ) -> Self {
        Self::translation(position.x, position.y)
            .then_inner(&Self::rotation_degrees(rotation_degrees))
            .then_inner(&Self::scale(scale_x, scale_y))
    }

    /// Returns `self * inner`: `inner` is applied to points first.
    pub fn then_inner(&self, inner: &Affine2) -> Affine2 {
        Affine2 {
            matrix: self.matrix * inner.matrix,
        }
    }

    pub fn apply(&self, point: Point2) -> Point2 {
        let v = self.matrix * Vector3::new(point.x, point.y, 1.0);
        Point2::new(v.x, v.y)
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix3::identity()
    }
}
