use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RuleId;
use crate::position::Range;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Convert from LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Returns `None` for values outside the LSP-defined range.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_lsp(self) -> u64 {
        self as u64
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// Identity of a logical finding: its range plus its rule code.
///
/// Two diagnostics with equal keys are the same finding even when the
/// message text differs between runs, so fixes recorded under a key stay
/// reachable across re-validation with unchanged findings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosticKey(String);

impl DiagnosticKey {
    #[must_use]
    pub fn new(range: &Range, code: &RuleId) -> Self {
        Self(format!(
            "[{},{},{},{}]-{}",
            range.start.line, range.start.character, range.end.line, range.end.character, code
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagnosticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single reported problem in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    range: Range,
    code: RuleId,
    message: String,
    severity: DiagnosticSeverity,
    source: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        range: Range,
        code: RuleId,
        message: impl Into<String>,
        severity: DiagnosticSeverity,
        source: impl Into<String>,
    ) -> Self {
        Self {
            range,
            code,
            message: message.into(),
            severity,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn range(&self) -> &Range {
        &self.range
    }

    #[must_use]
    pub fn code(&self) -> &RuleId {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    /// Name of the tool that reported the diagnostic.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn key(&self) -> DiagnosticKey {
        DiagnosticKey::new(&self.range, &self.code)
    }

    /// Format as `path:line:col: severity: message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &str) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            path,
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.severity.label(),
            self.source,
            self.message,
        )
    }
}
