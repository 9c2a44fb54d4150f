//! Analyzer output types and their conversion into domain values.
//!
//! The analyzer reports findings against file names it chose itself, with
//! fixes expressed as UTF-16 offsets into the text it was given. Everything
//! here turns that into positions, diagnostics, and fixes for one document.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use lintd_types::{
    Diagnostic, DiagnosticSeverity, DocumentVersion, Fix, FixError, Position, Range, RuleId,
    TextEdit,
};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

/// One replacement of a raw fix: `length` UTF-16 units starting at `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReplacement {
    pub start: usize,
    pub length: usize,
    #[serde(default)]
    pub text: String,
}

/// A single rule failure as reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinding {
    pub file_name: String,
    #[serde(default)]
    pub rule_name: String,
    pub failure: String,
    #[serde(default)]
    pub rule_severity: Option<String>,
    pub start: Position,
    pub end: Position,
    #[serde(default)]
    pub fix: Vec<RawReplacement>,
}

impl RawFinding {
    #[must_use]
    pub fn rule_id(&self) -> RuleId {
        RuleId::new(self.rule_name.clone())
    }

    /// Build the diagnostic shown to the user.
    ///
    /// Severity is `Error` only when the analyzer assigned it and warnings
    /// are not forced; everything else is a `Warning`.
    #[must_use]
    pub fn to_diagnostic(&self, source: &str, force_warning: bool) -> Diagnostic {
        let message = if self.rule_name.is_empty() {
            self.failure.clone()
        } else {
            format!("{} ({})", self.failure, self.rule_name)
        };
        let severity = if !force_warning && self.rule_severity.as_deref() == Some("error") {
            DiagnosticSeverity::Error
        } else {
            DiagnosticSeverity::Warning
        };
        Diagnostic::new(
            Range::new(self.start, self.end),
            self.rule_id(),
            message,
            severity,
            source,
        )
    }

    /// Convert the analyzer's fix, if it has one.
    ///
    /// An empty replacement list means "no fix", not an empty fix.
    #[must_use]
    pub fn to_fix(
        &self,
        index: &LineIndex,
        version: DocumentVersion,
    ) -> Option<Result<Fix, FixError>> {
        if self.fix.is_empty() {
            return None;
        }
        let edits = self
            .fix
            .iter()
            .map(|repl| {
                let start = index.position_at(repl.start);
                let end = index.position_at(repl.start.saturating_add(repl.length));
                TextEdit::new(Range::new(start, end), repl.text.clone())
            })
            .collect();
        Some(Fix::auto_fix(&self.failure, version, self.rule_id(), edits))
    }
}

/// Maps UTF-16 offsets to line/character positions for one text snapshot.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut offset = 0;
        for ch in text.chars() {
            offset += ch.len_utf16();
            if ch == '\n' {
                line_starts.push(offset);
            }
        }
        Self {
            line_starts,
            len: offset,
        }
    }

    /// Offsets past the end clamp to the end of the text.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let character = offset - self.line_starts[line];
        Position::new(line as u32, character as u32)
    }
}

/// Normalize a reported file name for comparison: forward slashes, `.` and
/// `..` resolved, case-folded on Windows.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    let mut out: Vec<Component<'_>> = Vec::new();
    for c in Path::new(&slashed).components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    let normalized = out
        .iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .replace('\\', "/");
    if cfg!(windows) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Findings that belong to `document_path`. Analyzers may report failures
/// in other files; those are dropped.
pub fn filter_for_document<'a>(
    document_path: &Path,
    findings: &'a [RawFinding],
) -> impl Iterator<Item = &'a RawFinding> {
    let target = normalize_path(&document_path.to_string_lossy());
    findings
        .iter()
        .filter(move |finding| normalize_path(&finding.file_name) == target)
}

/// Group a whole-project sweep by normalized file path, ordered
/// lexicographically. Within a file, findings keep analyzer order.
#[must_use]
pub fn group_by_file(findings: Vec<RawFinding>) -> BTreeMap<String, Vec<RawFinding>> {
    let mut grouped: BTreeMap<String, Vec<RawFinding>> = BTreeMap::new();
    for finding in findings {
        grouped
            .entry(normalize_path(&finding.file_name))
            .or_default()
            .push(finding);
    }
    grouped
}

pub fn path_to_file_uri(path: &Path) -> Result<Url, PathToUriError> {
    Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

#[must_use]
pub fn file_uri_to_path(uri: &Url) -> Option<PathBuf> {
    if uri.scheme() != "file" {
        return None;
    }
    uri.to_file_path().ok()
}
