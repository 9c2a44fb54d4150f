//! The pluggable lint engine and the settings provider.
//!
//! Both traits return boxed futures so they stay object-safe and can be
//! shared as `Arc<dyn ...>` between the server and its validation tasks.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use globset::GlobSet;
use serde::Deserialize;
use url::Url;

use lintd_config::{LintSettings, compile_globs};
use lintd_types::RuleId;

use crate::error::{AnalyzerError, ConfigurationError};
use crate::protocol::RawFinding;
use crate::scope_cache::Resolution;

/// Future returned by [`Analyzer::run`]; may borrow the analyzer.
pub type AnalyzerFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, AnalyzerError>> + Send + 'a>>;

/// A resolved lint configuration for one file.
#[derive(Debug, Clone)]
pub struct LintConfiguration {
    is_default: bool,
    exclude: GlobSet,
    raw: serde_json::Value,
}

impl LintConfiguration {
    /// `is_default` marks a configuration synthesized because no config file
    /// was found. `exclude_patterns` come from the configuration's own
    /// exclusion list.
    pub fn new(
        is_default: bool,
        exclude_patterns: &[String],
        raw: serde_json::Value,
    ) -> Result<Self, ConfigurationError> {
        let exclude = compile_globs(exclude_patterns)
            .map_err(|e| ConfigurationError::new(e.to_string()))?;
        Ok(Self {
            is_default,
            exclude,
            raw,
        })
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    #[must_use]
    pub fn excludes(&self, path: &Path) -> bool {
        self.exclude.is_match(path)
    }

    /// The configuration as the analyzer understands it.
    #[must_use]
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }
}

/// Everything the analyzer needs for one run. Owned, so the run is not tied
/// to the server's document state.
#[derive(Debug, Clone)]
pub struct AnalyzerInput {
    pub file_path: PathBuf,
    pub contents: String,
    pub configuration: LintConfiguration,
    pub rules_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerReport {
    pub findings: Vec<RawFinding>,
    /// Problems with the analyzer's own setup, e.g. a missing rule.
    #[serde(default)]
    pub warnings: Vec<String>,
}

pub trait Analyzer: Send + Sync {
    /// Short tool name, used as the diagnostic source.
    fn name(&self) -> &'static str {
        "tslint"
    }

    /// Locate and load the configuration that applies to `file_path`.
    ///
    /// The returned future must not borrow `self`: it is cached and may
    /// outlive the call.
    fn resolve_config(
        &self,
        file_path: &Path,
        config_file: Option<&Path>,
    ) -> Resolution<LintConfiguration, ConfigurationError>;

    fn run(&self, input: AnalyzerInput) -> AnalyzerFut<'_, AnalyzerReport>;

    /// Line comment that suppresses `rule` on the following line.
    fn disable_comment(&self, rule: &RuleId) -> String {
        format!("// tslint:disable-next-line:{rule}\n")
    }
}

/// Per-document settings, for hosts whose configuration is scoped to a
/// resource.
pub trait SettingsSource: Send + Sync {
    fn settings_for(&self, uri: &Url) -> Resolution<LintSettings, ConfigurationError>;
}

/// Returns the same settings for every document.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub LintSettings);

impl SettingsSource for StaticSettings {
    fn settings_for(&self, _uri: &Url) -> Resolution<LintSettings, ConfigurationError> {
        let settings = self.0.clone();
        Box::pin(async move { Ok(settings) })
    }
}
