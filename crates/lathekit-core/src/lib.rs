//! # LatheKit Core
//!
//! Core types shared by every stage of the LatheKit pipeline:
//! - The canonical geometry model (ordered polylines of 2D points)
//! - 2D affine transforms used when expanding block references
//! - Curve tessellation for circles, arcs, ellipses, and splines
//! - Units, tools, and job definitions consumed by the G-code generator
//! - The layered error taxonomy

pub mod data;
pub mod error;
pub mod geometry;
pub mod tessellate;
pub mod units;

pub use data::{JobDefinition, Tool};
pub use error::{ConfigError, Error, ImportError, Result};
pub use geometry::{Affine2, Bounds, GeometryModel, Point2, Polyline};
pub use tessellate::{CurveTessellator, DEFAULT_SEGMENTS};
pub use units::Units;
