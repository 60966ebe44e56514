//! # LatheKit Import
//!
//! Turns drawing files into the canonical [`GeometryModel`](lathekit_core::GeometryModel).
//!
//! ## Decoder tiers
//!
//! - **SVG**: `M`/`L` path commands from every `<path d="...">`
//! - **Native DXF**: in-process decoding through the `dxf` crate, including
//!   block references expanded with affine transforms
//! - **External normalizer**: an out-of-process script that reads DXF
//!   versions the native tier cannot, reporting canonical JSON
//! - **ASCII DXF**: a dependency-free group-code scanner used as the last
//!   resort for simple legacy files
//!
//! The [`ImportResolver`] routes by extension and walks the DXF tiers in
//! order until one returns geometry.

pub mod import;

pub use import::{
    decode_normalizer_json, AsciiDxfDecoder, Diagnostics, DxfDocument, DxfEntity, EntityDecoder,
    ExternalNormalizerAdapter, GeometryDecoder, ImportOptions, ImportReport, ImportResolver,
    ImportTier, NativeDxfDecoder, NormalizerConfig, SvgDecoder, NORMALIZER_ENV_VAR,
};
