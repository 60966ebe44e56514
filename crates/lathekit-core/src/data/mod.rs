//! Job and tooling data
//!
//! Defines the cutting tools and the job definition handed to the G-code
//! generator. A job is built fresh for every generation request.

pub mod tools;

pub use tools::{JobDefinition, Tool};
