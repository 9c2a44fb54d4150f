//! One validation run for one document snapshot.
//!
//! A run never touches server state. It reads settings and configuration
//! through the shared caches, calls the analyzer, and returns an
//! [`Outcome`] that the server applies only if the run is still current.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use url::Url;

use lintd_config::LintSettings;
use lintd_types::{Diagnostic, DocumentId};

use crate::analyzer::{Analyzer, AnalyzerInput, LintConfiguration, SettingsSource};
use crate::error::{ConfigurationError, ValidationError};
use crate::fixes::DocumentFixes;
use crate::protocol::{self, LineIndex, RawFinding};
use crate::reconcile;
use crate::scope_cache::{Resolution, ScopeCache};

/// State shared between the server and its in-flight validations.
pub(crate) struct ValidationContext {
    analyzer: Arc<dyn Analyzer>,
    scoped_settings: Option<Arc<dyn SettingsSource>>,
    global_settings: RwLock<LintSettings>,
    settings_cache: ScopeCache<Url, LintSettings, ConfigurationError>,
    config_cache: ScopeCache<PathBuf, LintConfiguration, ConfigurationError>,
}

impl ValidationContext {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        scoped_settings: Option<Arc<dyn SettingsSource>>,
        settings: LintSettings,
    ) -> Self {
        Self {
            analyzer,
            scoped_settings,
            global_settings: RwLock::new(settings),
            settings_cache: ScopeCache::new("settings"),
            config_cache: ScopeCache::new("lint-config"),
        }
    }

    pub fn analyzer(&self) -> &dyn Analyzer {
        self.analyzer.as_ref()
    }

    /// The host-wide settings, used when no scoped source is installed.
    pub fn global_settings(&self) -> LintSettings {
        self.global_settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_global_settings(&self, settings: LintSettings) {
        *self
            .global_settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Drop both cached scopes.
    pub fn flush(&self) {
        self.settings_cache.flush();
        self.config_cache.flush();
    }

    pub fn flush_configuration(&self) {
        self.config_cache.flush();
    }

    pub async fn settings_for(&self, uri: &Url) -> Result<LintSettings, ScopeFailure> {
        let (attempt, result) = self
            .settings_cache
            .lookup(uri, |uri| match &self.scoped_settings {
                Some(source) => source.settings_for(uri),
                None => {
                    let settings = self.global_settings();
                    let ready: Resolution<LintSettings, ConfigurationError> =
                        Box::pin(async move { Ok(settings) });
                    ready
                }
            })
            .await;
        result.map_err(|error| ScopeFailure {
            attempt: Attempt::Settings(attempt),
            error,
        })
    }

    pub async fn configuration_for(
        &self,
        path: &Path,
        config_file: Option<&Path>,
    ) -> Result<LintConfiguration, ScopeFailure> {
        let (attempt, result) = self
            .config_cache
            .lookup(&path.to_path_buf(), |path| {
                self.analyzer.resolve_config(path, config_file)
            })
            .await;
        result.map_err(|error| ScopeFailure {
            attempt: Attempt::Configuration(attempt),
            error,
        })
    }
}

/// One resolution attempt of one of the cached scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    Settings(u64),
    Configuration(u64),
}

/// A configuration failure and the resolution attempt that produced it.
#[derive(Debug, Clone)]
pub(crate) struct ScopeFailure {
    pub attempt: Attempt,
    pub error: ConfigurationError,
}

/// A failed validation. `attempt` is set when the failure came out of a
/// cached scope, so repeats of it can be recognized.
#[derive(Debug)]
pub(crate) struct Failure {
    pub error: ValidationError,
    pub attempt: Option<Attempt>,
}

impl From<ValidationError> for Failure {
    fn from(error: ValidationError) -> Self {
        Self {
            error,
            attempt: None,
        }
    }
}

impl From<ScopeFailure> for Failure {
    fn from(failure: ScopeFailure) -> Self {
        Self {
            error: ValidationError::Configuration(failure.error),
            attempt: Some(failure.attempt),
        }
    }
}

/// A snapshot of one document, taken when validation was requested.
#[derive(Debug, Clone)]
pub(crate) struct ValidationJob {
    pub document: DocumentId,
    pub language_id: String,
    pub text: String,
}

/// Why a document was not linted. Skipping clears its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    NotOnDisk,
    Disabled,
    ExcludedBySettings,
    LanguageDisabled,
    NoConfiguration,
    ExcludedByConfiguration,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotOnDisk => "document is not a file on disk",
            Self::Disabled => "linting is disabled",
            Self::ExcludedBySettings => "file matches an exclude pattern",
            Self::LanguageDisabled => "language is not enabled",
            Self::NoConfiguration => "no lint configuration found",
            Self::ExcludedByConfiguration => "file is excluded by the lint configuration",
        })
    }
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Completed {
        diagnostics: Vec<Diagnostic>,
        fixes: DocumentFixes,
        warnings: Vec<String>,
    },
    Skipped(SkipReason),
    Failed(Failure),
}

pub(crate) async fn run(context: &ValidationContext, job: &ValidationJob) -> Outcome {
    match validate(context, job).await {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Failed(err),
    }
}

async fn validate(context: &ValidationContext, job: &ValidationJob) -> Result<Outcome, Failure> {
    let uri = job.document.uri();
    let Some(path) = protocol::file_uri_to_path(uri) else {
        return Ok(Outcome::Skipped(SkipReason::NotOnDisk));
    };

    let settings = context.settings_for(uri).await?;
    if !settings.enabled() {
        return Ok(Outcome::Skipped(SkipReason::Disabled));
    }
    if settings.is_excluded(&path) {
        return Ok(Outcome::Skipped(SkipReason::ExcludedBySettings));
    }
    if settings.skips_language(&job.language_id) {
        return Ok(Outcome::Skipped(SkipReason::LanguageDisabled));
    }

    let configuration = context
        .configuration_for(&path, settings.config_file())
        .await?;
    if configuration.is_default() && !settings.validate_with_default_config() {
        return Ok(Outcome::Skipped(SkipReason::NoConfiguration));
    }
    if configuration.excludes(&path) {
        return Ok(Outcome::Skipped(SkipReason::ExcludedByConfiguration));
    }

    let input = AnalyzerInput {
        file_path: path.clone(),
        contents: job.text.clone(),
        configuration,
        rules_directory: settings.rules_directory().map(Path::to_path_buf),
    };
    tracing::debug!(document = %job.document, "Running analyzer");
    let report = context
        .analyzer()
        .run(input)
        .await
        .map_err(|source| ValidationError::Analyzer {
            path: path.clone(),
            source,
        })?;

    let (diagnostics, fixes) =
        collect_findings(context.analyzer(), &settings, job, &path, &report.findings)?;
    Ok(Outcome::Completed {
        diagnostics,
        fixes,
        warnings: report.warnings,
    })
}

/// Turn the analyzer's findings for `path` into diagnostics and the fixes
/// recorded under their keys.
pub(crate) fn collect_findings(
    analyzer: &dyn Analyzer,
    settings: &LintSettings,
    job: &ValidationJob,
    path: &Path,
    findings: &[RawFinding],
) -> Result<(Vec<Diagnostic>, DocumentFixes), ValidationError> {
    let index = LineIndex::new(&job.text);
    let version = job.document.version();
    let force_warning = settings.always_show_rule_failures_as_warnings();

    let mut diagnostics = Vec::new();
    let mut fixes = DocumentFixes::default();
    for finding in protocol::filter_for_document(path, findings) {
        let diagnostic = finding.to_diagnostic(analyzer.name(), force_warning);
        let key = diagnostic.key();

        let rule = finding.rule_id();
        // Without a rule name the comment would disable every rule.
        if !rule.is_empty() {
            let disable = reconcile::disable_rule_fix(
                &rule,
                diagnostic.range().start.line,
                version,
                analyzer.disable_comment(&rule),
            )
            .map_err(|e| ValidationError::Invariant(format!("disable fix for {key}: {e}")))?;
            fixes.record(key.clone(), disable);
        }

        match finding.to_fix(&index, version) {
            Some(Ok(fix)) => fixes.record(key, fix),
            Some(Err(err)) => {
                tracing::debug!(key = %key, "Discarding malformed analyzer fix: {err}");
            }
            None => {}
        }
        diagnostics.push(diagnostic);
    }
    Ok((diagnostics, fixes))
}
