//! Failure taxonomy for validation runs.

use std::path::PathBuf;

use thiserror::Error;

/// The lint configuration for a file could not be loaded or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The analyzer itself failed while linting a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AnalyzerError {
    message: String,
}

impl AnalyzerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why a validation produced no result.
///
/// In every case the document's previously published diagnostics are left
/// in place.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Cannot read lint configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("'{source}' while validating {}", .path.display())]
    Analyzer {
        path: PathBuf,
        #[source]
        source: AnalyzerError,
    },
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl ValidationError {
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
