//! Import orchestration.
//!
//! SVG files go straight to the SVG decoder. DXF files are tried against
//! each tier in order (native, normalizer, ASCII) and the first non-empty
//! model wins. Tier errors are logged and swallowed; only a missing file or
//! an unsupported extension reaches the caller.

use super::decoder::{Diagnostics, GeometryDecoder, ImportTier};
use super::dxf_ascii::AsciiDxfDecoder;
use super::dxf_native::NativeDxfDecoder;
use super::normalizer::{ExternalNormalizerAdapter, NormalizerConfig};
use super::svg::SvgDecoder;
use lathekit_core::{CurveTessellator, GeometryModel, ImportError, DEFAULT_SEGMENTS};
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for building the default decoder chain
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Tessellation segments used by every tier
    pub segments: usize,
    pub normalizer: NormalizerConfig,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            segments: DEFAULT_SEGMENTS,
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// Outcome of one import call
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub geometry: GeometryModel,
    /// Tier that produced the geometry; `None` when nothing decoded
    pub tier: Option<ImportTier>,
    pub diagnostics: Diagnostics,
}

impl ImportReport {
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

/// Routes a file to the right decoder(s)
pub struct ImportResolver {
    svg: Box<dyn GeometryDecoder>,
    dxf_tiers: Vec<Box<dyn GeometryDecoder>>,
    last_diagnostics: Diagnostics,
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

impl ImportResolver {
    /// Standard chain: native DXF, external normalizer, ASCII scanner.
    pub fn new(options: ImportOptions) -> Self {
        let tessellator = CurveTessellator::new(options.segments);
        let normalizer = NormalizerConfig {
            segments: tessellator.segments(),
            ..options.normalizer
        };
        Self::with_decoders(
            Box::new(SvgDecoder::new()),
            vec![
                Box::new(NativeDxfDecoder::new(tessellator)),
                Box::new(ExternalNormalizerAdapter::new(normalizer)),
                Box::new(AsciiDxfDecoder::new(tessellator)),
            ],
        )
    }

    /// Custom chain. DXF tiers are tried in the order given.
    pub fn with_decoders(
        svg: Box<dyn GeometryDecoder>,
        dxf_tiers: Vec<Box<dyn GeometryDecoder>>,
    ) -> Self {
        Self {
            svg,
            dxf_tiers,
            last_diagnostics: Diagnostics::default(),
        }
    }

    /// Diagnostics from the most recent DXF import.
    pub fn last_diagnostics(&self) -> &Diagnostics {
        &self.last_diagnostics
    }

    /// Import a drawing.
    ///
    /// An empty model is a normal outcome when no decoder produced anything.
    pub fn import(&mut self, path: &Path) -> Result<ImportReport, ImportError> {
        if !path.is_file() {
            return Err(ImportError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "svg" => Ok(self.import_svg(path)),
            "dxf" => Ok(self.import_dxf(path)),
            _ => Err(ImportError::UnsupportedFormat { extension }),
        }
    }

    fn import_svg(&self, path: &Path) -> ImportReport {
        let mut diagnostics = Diagnostics::default();
        let geometry = match self.svg.decode(path, &mut diagnostics) {
            Ok(model) => model,
            Err(e) => {
                warn!("SVG import of {} failed: {}", path.display(), e);
                GeometryModel::new()
            }
        };
        let tier = (!geometry.is_empty()).then(|| self.svg.tier());
        ImportReport {
            geometry,
            tier,
            diagnostics,
        }
    }

    fn import_dxf(&mut self, path: &Path) -> ImportReport {
        let mut diagnostics = Diagnostics::default();
        let mut result = None;

        for decoder in &self.dxf_tiers {
            let tier = decoder.tier();
            debug!("Trying {} tier for {}", tier, path.display());
            match decoder.decode(path, &mut diagnostics) {
                Ok(model) if !model.is_empty() => {
                    info!(
                        "Imported {} polylines from {} via {} tier",
                        model.polyline_count(),
                        path.display(),
                        tier
                    );
                    result = Some((model, tier));
                    break;
                }
                Ok(_) => debug!("{} tier produced no geometry", tier),
                Err(e) => warn!("{} tier failed for {}: {}", tier, path.display(), e),
            }
        }

        if result.is_none() {
            warn!("No tier produced geometry for {}", path.display());
        }
        self.last_diagnostics = diagnostics.clone();

        let (geometry, tier) = match result {
            Some((model, tier)) => (model, Some(tier)),
            None => (GeometryModel::new(), None),
        };
        ImportReport {
            geometry,
            tier,
            diagnostics,
        }
    }
}
