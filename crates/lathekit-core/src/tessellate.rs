//! Curve tessellation
//!
//! Turns circles, arcs, ellipses, and splines into point sequences with a
//! fixed number of segments. Every decoder tier goes through the same
//! tessellator so that one drawing always yields the same point counts.

use crate::geometry::{Point2, Polyline};
use std::f64::consts::TAU;
use tracing::debug;

/// Segment count used when nothing else is configured.
pub const DEFAULT_SEGMENTS: usize = 48;

/// Fixed-segment curve tessellator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveTessellator {
    segments: usize,
}

impl Default for CurveTessellator {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENTS)
    }
}

impl CurveTessellator {
    /// Creates a tessellator. A segment count of zero is raised to one.
    pub fn new(segments: usize) -> Self {
        Self {
            segments: segments.max(1),
        }
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Full circle: `segments` points around the circumference, then the
    /// first point again to close it.
    pub fn circle(&self, center: Point2, radius: f64) -> Polyline {
        let points = (0..self.segments)
            .map(|i| {
                let t = TAU * i as f64 / self.segments as f64;
                Point2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect();
        Polyline::closed(points)
    }

    /// Arc from `start_deg` to `end_deg`, always sweeping counter-clockwise.
    ///
    /// When the end angle is below the start angle a full turn is added to
    /// the end, so `350..10` sweeps 20 degrees rather than -340.
    pub fn arc(&self, center: Point2, radius: f64, start_deg: f64, end_deg: f64) -> Polyline {
        let start = start_deg.to_radians();
        let mut end = end_deg.to_radians();
        if end < start {
            end += TAU;
        }
        let sweep = end - start;
        let points = (0..=self.segments)
            .map(|i| {
                let t = start + sweep * (i as f64 / self.segments as f64);
                Point2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect();
        Polyline::new(points)
    }

    /// Ellipse given its center, the major-axis vector (relative to the
    /// center), the minor/major ratio, and start/end parameters in radians.
    ///
    /// A parameter span of a full turn yields a closed polyline.
    pub fn ellipse(
        &self,
        center: Point2,
        major_axis: Point2,
        ratio: f64,
        start_param: f64,
        end_param: f64,
    ) -> Polyline {
        let major_len = (major_axis.x.powi(2) + major_axis.y.powi(2)).sqrt();
        let minor_len = major_len * ratio;
        let angle = major_axis.y.atan2(major_axis.x);
        let (sin_a, cos_a) = angle.sin_cos();

        let mut end = end_param;
        if end <= start_param {
            end += TAU;
        }
        let sweep = end - start_param;
        let full_turn = (sweep - TAU).abs() < 1e-9;

        let count = if full_turn {
            self.segments
        } else {
            self.segments + 1
        };
        let points: Vec<Point2> = (0..count)
            .map(|i| {
                let t = start_param + sweep * (i as f64 / self.segments as f64);
                let (lx, ly) = (major_len * t.cos(), minor_len * t.sin());
                Point2::new(
                    center.x + lx * cos_a - ly * sin_a,
                    center.y + lx * sin_a + ly * cos_a,
                )
            })
            .collect();

        if full_turn {
            Polyline::closed(points)
        } else {
            Polyline::new(points)
        }
    }

    /// Evaluates a (non-rational) B-spline at `segments + 1` evenly spaced
    /// parameters across its valid domain.
    ///
    /// Returns `None` when the degree, knot vector, and control points are
    /// inconsistent; callers then fall back to the control polygon.
    pub fn bspline(&self, degree: usize, knots: &[f64], control: &[Point2]) -> Option<Polyline> {
        if degree == 0 || control.len() <= degree || knots.len() != control.len() + degree + 1 {
            debug!(
                "Spline rejected: degree {}, {} knots, {} control points",
                degree,
                knots.len(),
                control.len()
            );
            return None;
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            debug!("Spline rejected: knot vector is decreasing");
            return None;
        }

        let t_start = knots[degree];
        let t_end = knots[control.len()];
        if !(t_end > t_start) {
            return None;
        }

        let points = (0..=self.segments)
            .map(|i| {
                let t = t_start + (t_end - t_start) * (i as f64 / self.segments as f64);
                de_boor(degree, knots, control, t)
            })
            .collect();
        Some(Polyline::new(points))
    }
}

/// De Boor's algorithm for a single parameter value.
fn de_boor(degree: usize, knots: &[f64], control: &[Point2], t: f64) -> Point2 {
    // Knot span k with knots[k] <= t < knots[k + 1], clamped to the last span.
    let last_span = control.len() - 1;
    let mut k = degree;
    while k < last_span && t >= knots[k + 1] {
        k += 1;
    }

    let mut d: Vec<Point2> = (0..=degree).map(|j| control[j + k - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = j + k - degree;
            let denom = knots[i + degree + 1 - r] - knots[i];
            let alpha = if denom.abs() < f64::EPSILON {
                0.0
            } else {
                (t - knots[i]) / denom
            };
            d[j] = Point2::new(
                (1.0 - alpha) * d[j - 1].x + alpha * d[j].x,
                (1.0 - alpha) * d[j - 1].y + alpha * d[j].y,
            );
        }
    }
    d[degree]
}
