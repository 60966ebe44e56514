//! Error handling for LatheKit
//!
//! Provides error types for the layers of the pipeline:
//! - Import errors (file routing, decoder tiers, the external normalizer)
//! - Configuration errors (loading and validating settings)
//!
//! Only `NotFound` and `UnsupportedFormat` ever reach the caller of an import.
//! Every other import error is recovered inside the fallback chain and logged.
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Import error type
///
/// Represents failures while turning a drawing file into a geometry model.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The input file does not exist
    #[error("Input file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The file extension is not handled by the importer
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat {
        /// The offending extension (lowercase, without the dot).
        extension: String,
    },

    /// A single decoder tier failed
    #[error("{tier} decoder failed: {reason}")]
    DecodeFailure {
        /// Name of the tier that failed.
        tier: String,
        /// The reason the tier failed.
        reason: String,
    },

    /// The normalizer script or an interpreter for it could not be found
    #[error("External normalizer unavailable: {reason}")]
    SubprocessUnavailable {
        /// What was missing.
        reason: String,
    },

    /// The normalizer produced no artifact, or one that could not be read
    #[error("Malformed normalizer artifact: {reason}")]
    MalformedArtifact {
        /// The reason the artifact was rejected.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Create a decode failure for the named tier
    pub fn decode(tier: impl Into<String>, reason: impl Into<String>) -> Self {
        ImportError::DecodeFailure {
            tier: tier.into(),
            reason: reason.into(),
        }
    }

    /// Check whether the fallback chain may swallow this error and move on
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ImportError::NotFound { .. } | ImportError::UnsupportedFormat { .. }
        )
    }
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting has a value outside its valid range
    #[error("Invalid setting value for {setting}: {reason}")]
    InvalidValue {
        /// The setting with the invalid value.
        setting: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The config file extension is neither `.toml` nor `.json`
    #[error("Config file must be .json or .toml: {}", path.display())]
    UnknownFormat {
        /// The rejected path.
        path: PathBuf,
    },

    /// The config file could not be parsed or serialized
    #[error("Invalid config file: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            setting: setting.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for LatheKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Import error
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is an import error
    pub fn is_import_error(&self) -> bool {
        matches!(self, Error::Import(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_display() {
        let err = ImportError::UnsupportedFormat {
            extension: "png".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported file type: png");

        let err = ImportError::decode("native-dxf", "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "native-dxf decoder failed: unexpected end of file"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(!ImportError::NotFound {
            path: PathBuf::from("missing.dxf")
        }
        .is_recoverable());
        assert!(!ImportError::UnsupportedFormat {
            extension: "stl".to_string()
        }
        .is_recoverable());
        assert!(ImportError::decode("ascii-dxf", "bad").is_recoverable());
        assert!(ImportError::SubprocessUnavailable {
            reason: "no interpreter".to_string()
        }
        .is_recoverable());
        assert!(ImportError::MalformedArtifact {
            reason: "empty".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ImportError::decode("svg", "oops").into();
        assert!(err.is_import_error());

        let err: Error = ConfigError::invalid("segments", "must be > 0").into();
        assert!(err.is_config_error());
        assert_eq!(
            err.to_string(),
            "Invalid setting value for segments: must be > 0"
        );

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
