//! The decoder seam shared by every import tier.

use lathekit_core::{GeometryModel, ImportError};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies which decoder produced (or failed to produce) geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportTier {
    Svg,
    NativeDxf,
    Normalizer,
    AsciiDxf,
}

impl ImportTier {
    pub fn name(&self) -> &'static str {
        match self {
            ImportTier::Svg => "svg",
            ImportTier::NativeDxf => "native-dxf",
            ImportTier::Normalizer => "normalizer",
            ImportTier::AsciiDxf => "ascii-dxf",
        }
    }
}

impl fmt::Display for ImportTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Troubleshooting artifacts left behind by the external normalizer
///
/// Both paths stay `None` unless the normalizer tier actually ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// JSON written by the normalizer script
    pub normalizer_json: Option<PathBuf>,
    /// Adapter log plus the script's stdout and stderr
    pub normalizer_log: Option<PathBuf>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.normalizer_json.is_none() && self.normalizer_log.is_none()
    }
}

/// A source of geometry for one file
///
/// Implemented by the in-process decoders and by the subprocess-backed
/// normalizer, so the resolver can be driven by fakes in tests.
pub trait GeometryDecoder: Send + Sync {
    /// Which tier this decoder represents.
    fn tier(&self) -> ImportTier;

    /// Decode `path` into geometry.
    ///
    /// Decoders that leave artifacts on disk record them in `diagnostics`
    /// even when they return an error or an empty model.
    fn decode(
        &self,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<GeometryModel, ImportError>;
}
