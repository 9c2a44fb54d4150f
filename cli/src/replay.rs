//! An analyzer that serves findings recorded from an earlier run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use lintd_lsp::{
    Analyzer, AnalyzerFut, AnalyzerInput, AnalyzerReport, ConfigurationError, LintConfiguration,
    RawFinding, Resolution,
};

/// Accepted shapes of a findings file.
#[derive(Deserialize)]
#[serde(untagged)]
enum Recorded {
    Report(AnalyzerReport),
    Findings(Vec<RawFinding>),
}

/// Lint configuration file contents, as far as the driver reads them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    linter_options: Option<LinterOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct LinterOptions {
    #[serde(default)]
    exclude: Vec<String>,
}

pub struct ReplayAnalyzer {
    report: AnalyzerReport,
    config_file: Option<PathBuf>,
}

impl ReplayAnalyzer {
    /// Load recorded findings. Relative file names are taken relative to
    /// `base_dir`.
    pub fn load(
        findings_path: &Path,
        base_dir: &Path,
        config_file: Option<PathBuf>,
    ) -> Result<Self> {
        let content = fs::read_to_string(findings_path)
            .with_context(|| format!("failed to read {}", findings_path.display()))?;
        let recorded: Recorded = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", findings_path.display()))?;
        let mut report = match recorded {
            Recorded::Report(report) => report,
            Recorded::Findings(findings) => AnalyzerReport {
                findings,
                warnings: Vec::new(),
            },
        };
        for finding in &mut report.findings {
            let path = Path::new(&finding.file_name);
            if path.is_relative() {
                finding.file_name = base_dir.join(path).to_string_lossy().into_owned();
            }
        }
        tracing::debug!(
            findings = report.findings.len(),
            "Loaded findings from {}",
            findings_path.display()
        );
        Ok(Self {
            report,
            config_file,
        })
    }

    #[must_use]
    pub fn findings(&self) -> &[RawFinding] {
        &self.report.findings
    }
}

impl Analyzer for ReplayAnalyzer {
    fn resolve_config(
        &self,
        file_path: &Path,
        config_file: Option<&Path>,
    ) -> Resolution<LintConfiguration, ConfigurationError> {
        let config_file = config_file
            .map(Path::to_path_buf)
            .or_else(|| self.config_file.clone());
        tracing::trace!(file = %file_path.display(), "Resolving lint configuration");
        Box::pin(async move {
            let Some(path) = config_file else {
                return LintConfiguration::new(true, &[], serde_json::Value::Null);
            };
            read_configuration(&path)
        })
    }

    fn run(&self, input: AnalyzerInput) -> AnalyzerFut<'_, AnalyzerReport> {
        tracing::trace!(file = %input.file_path.display(), "Replaying findings");
        let report = self.report.clone();
        Box::pin(async move { Ok(report) })
    }
}

fn read_configuration(path: &Path) -> Result<LintConfiguration, ConfigurationError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigurationError::new(format!("{}: {e}", path.display())))?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| ConfigurationError::new(format!("{}: {e}", path.display())))?;
    let parsed: ConfigFile = serde_json::from_value(raw.clone())
        .map_err(|e| ConfigurationError::new(format!("{}: {e}", path.display())))?;

    let mut exclude = parsed.exclude;
    if let Some(options) = parsed.linter_options {
        exclude.extend(options.exclude);
    }
    LintConfiguration::new(false, &exclude, raw)
}
