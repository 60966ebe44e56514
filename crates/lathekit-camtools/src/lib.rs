//! # LatheKit CAM Tools
//!
//! G-code generation for lathe (turning) work.
//!
//! ## Generators
//!
//! - **Lathe Turning**: one feed pass per imported polyline, per tool, with
//!   geometry X on machine X and geometry Y on machine Z

pub mod lathe_turning;

pub use lathe_turning::{format_number, generate, LatheTurningGenerator, TurningParameters};
