//! LatheKit Settings Crate
//!
//! Handles persistent configuration for import, generation, and simulation.

pub mod config;

pub use config::{Config, GenerationSettings, ImportSettings, SimulationSettings};
