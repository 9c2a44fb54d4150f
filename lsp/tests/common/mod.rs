//! Shared test utilities and fixtures
//!
//! `ScriptedAnalyzer` derives findings from the text it is given, so tests
//! can reason about results by looking at document contents:
//!
//! - a line containing `console` yields a `no-console` error, no fix
//! - the first `"` on a line yields a `quotemark` warning, fixed to `'`
//! - a non-empty line not ending in `;`, `{` or `}` yields a `semicolon`
//!   warning, fixed by appending `;`

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use lintd_config::LintSettings;
use lintd_lsp::{
    Analyzer, AnalyzerError, AnalyzerFut, AnalyzerInput, AnalyzerReport, ConfigurationError,
    LintConfiguration, LintEvent, LintServer, RawFinding, RawReplacement, Resolution,
};
use lintd_types::Position;

pub struct ScriptedAnalyzer {
    config: Mutex<Result<LintConfiguration, ConfigurationError>>,
    failure: Mutex<Option<AnalyzerError>>,
    warnings: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
    runs: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

impl ScriptedAnalyzer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            config: Mutex::new(Ok(project_config())),
            failure: Mutex::new(None),
            warnings: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            runs: Mutex::new(Vec::new()),
        })
    }

    /// Configuration resolution fails with `message` from now on.
    pub fn break_config(&self, message: &str) {
        *lock(&self.config) = Err(ConfigurationError::new(message));
    }

    pub fn fix_config(&self) {
        *lock(&self.config) = Ok(project_config());
    }

    /// Runs fail with `message` from now on.
    pub fn crash(&self, message: &str) {
        *lock(&self.failure) = Some(AnalyzerError::new(message));
    }

    pub fn warn(&self, warning: &str) {
        lock(&self.warnings).push(warning.to_string());
    }

    /// Each run takes `latency` before reporting.
    pub fn slow_down(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Document texts handed to the analyzer, in run order.
    pub fn runs(&self) -> Vec<String> {
        lock(&self.runs).clone()
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn resolve_config(
        &self,
        _file_path: &Path,
        _config_file: Option<&Path>,
    ) -> Resolution<LintConfiguration, ConfigurationError> {
        let config = lock(&self.config).clone();
        Box::pin(async move { config })
    }

    fn run(&self, input: AnalyzerInput) -> AnalyzerFut<'_, AnalyzerReport> {
        Box::pin(async move {
            lock(&self.runs).push(input.contents.clone());
            let latency = *lock(&self.latency);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let failure = lock(&self.failure).clone();
            if let Some(err) = failure {
                return Err(err);
            }
            Ok(AnalyzerReport {
                findings: scan(&input.file_path, &input.contents),
                warnings: lock(&self.warnings).clone(),
            })
        })
    }
}

fn project_config() -> LintConfiguration {
    LintConfiguration::new(false, &[], serde_json::json!({ "rules": {} })).unwrap()
}

pub fn finding(
    path: &Path,
    rule: &str,
    failure: &str,
    severity: &str,
    start: Position,
    end: Position,
    fix: Vec<RawReplacement>,
) -> RawFinding {
    RawFinding {
        file_name: path.to_string_lossy().into_owned(),
        rule_name: rule.to_string(),
        failure: failure.to_string(),
        rule_severity: Some(severity.to_string()),
        start,
        end,
        fix,
    }
}

/// Findings for `text`, as described in the module docs. Offsets are byte
/// offsets, which match UTF-16 offsets for the ASCII texts used here.
pub fn scan(path: &Path, text: &str) -> Vec<RawFinding> {
    let mut findings = Vec::new();
    let mut offset = 0;
    for (line_no, line) in text.split('\n').enumerate() {
        let line_no = line_no as u32;
        if let Some(col) = line.find("console") {
            findings.push(finding(
                path,
                "no-console",
                "Calls to 'console.log' are not allowed.",
                "error",
                Position::new(line_no, col as u32),
                Position::new(line_no, (col + 7) as u32),
                Vec::new(),
            ));
        }
        if let Some(col) = line.find('"') {
            findings.push(finding(
                path,
                "quotemark",
                "\" should be '",
                "warning",
                Position::new(line_no, col as u32),
                Position::new(line_no, col as u32 + 1),
                vec![RawReplacement {
                    start: offset + col,
                    length: 1,
                    text: "'".to_string(),
                }],
            ));
        }
        let trimmed = line.trim_end();
        if !trimmed.is_empty()
            && !trimmed.ends_with(';')
            && !trimmed.ends_with('{')
            && !trimmed.ends_with('}')
        {
            let end = trimmed.len();
            findings.push(finding(
                path,
                "semicolon",
                "Missing semicolon",
                "warning",
                Position::new(line_no, end as u32),
                Position::new(line_no, end as u32),
                vec![RawReplacement {
                    start: offset + end,
                    length: 0,
                    text: ";".to_string(),
                }],
            ));
        }
        offset += line.len() + 1;
    }
    findings
}

pub fn uri(path: &str) -> Url {
    Url::parse(&format!("file://{path}")).unwrap()
}

pub fn settings(toml_src: &str) -> LintSettings {
    toml::from_str(toml_src).unwrap()
}

pub fn server(
    analyzer: &Arc<ScriptedAnalyzer>,
    settings: LintSettings,
) -> (LintServer, mpsc::UnboundedReceiver<LintEvent>) {
    LintServer::new(Arc::clone(analyzer) as Arc<dyn Analyzer>, settings)
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<LintEvent>) -> Vec<LintEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
