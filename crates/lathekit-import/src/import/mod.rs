//! # File Import Module
//!
//! Provides the decoder tiers and the resolver that chains them.
//!
//! Supports:
//! - File type routing by extension
//! - SVG path decoding (move/line commands)
//! - DXF entity decoding (lines, polylines, circles, arcs, ellipses, splines, inserts)
//! - Out-of-process normalization with diagnostic artifacts
//! - A last-resort group-code scanner for legacy DXF

mod decoder;
mod dxf_ascii;
mod dxf_model;
mod dxf_native;
mod normalizer;
mod resolver;
mod svg;

pub use decoder::{Diagnostics, GeometryDecoder, ImportTier};
pub use dxf_ascii::AsciiDxfDecoder;
pub use dxf_model::{DxfDocument, DxfEntity, EntityDecoder, MAX_INSERT_DEPTH};
pub use dxf_native::NativeDxfDecoder;
pub use normalizer::{
    decode_normalizer_json, ExternalNormalizerAdapter, NormalizerConfig, NORMALIZER_ENV_VAR,
};
pub use resolver::{ImportOptions, ImportReport, ImportResolver};
pub use svg::SvgDecoder;
