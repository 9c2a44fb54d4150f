//! Public types consumed by the host.
//!
//! The host feeds document events into [`crate::LintServer`], receives
//! [`LintEvent`]s to publish, and reads [`DiagnosticsSnapshot`]s for status
//! display.

use lintd_types::{Diagnostic, EditBatch, RuleId};
use serde::Serialize;
use url::Url;

use crate::error::ValidationError;

/// Overall health of the most recent validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintStatus {
    #[default]
    Ok,
    /// The analyzer ran but reported warnings about its own setup.
    Warn,
    /// Configuration or analyzer failure.
    Error,
}

/// An event emitted by the lint server.
#[derive(Debug)]
pub enum LintEvent {
    /// Full replacement of the diagnostics for one document.
    Diagnostics { uri: Url, items: Vec<Diagnostic> },
    Status { state: LintStatus },
    /// A validation failed; the document's previous diagnostics were kept.
    ValidationFailed { uri: Url, error: ValidationError },
}

/// What a [`CodeAction`] does when invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CodeActionKind {
    ApplySingleFix,
    ApplySameFixes,
    ApplyAllFixes,
    ApplyDisableRule,
    ShowRuleDocumentation { rule: RuleId },
}

impl CodeActionKind {
    /// Command identifier the host binds to this action.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::ApplySingleFix => "lintd.applySingleFix",
            Self::ApplySameFixes => "lintd.applySameFixes",
            Self::ApplyAllFixes => "lintd.applyAllFixes",
            Self::ApplyDisableRule => "lintd.applyDisableRule",
            Self::ShowRuleDocumentation { .. } => "lintd.showRuleDocumentation",
        }
    }
}

/// A quick-fix offered for a set of diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeAction {
    title: String,
    #[serde(flatten)]
    kind: CodeActionKind,
    uri: Url,
    batch: Option<EditBatch>,
}

impl CodeAction {
    pub(crate) fn new(
        title: impl Into<String>,
        kind: CodeActionKind,
        uri: Url,
        batch: Option<EditBatch>,
    ) -> Self {
        Self {
            title: title.into(),
            kind,
            uri,
            batch,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> &CodeActionKind {
        &self.kind
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The edits to apply. `None` for actions that only run a command.
    #[must_use]
    pub fn batch(&self) -> Option<&EditBatch> {
        self.batch.as_ref()
    }
}

/// Immutable snapshot of all diagnostics, suitable for status rendering.
///
/// Counts are computed from `files` on demand.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    /// Per-document diagnostics, sorted with error-containing documents first.
    files: Vec<(Url, Vec<Diagnostic>)>,
}

impl DiagnosticsSnapshot {
    pub(crate) fn new(files: Vec<(Url, Vec<Diagnostic>)>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[(Url, Vec<Diagnostic>)] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn count_where(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|d| pred(d))
            .count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_where(|d| d.severity().is_error())
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_where(|d| !d.severity().is_error())
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }

    /// Format a compact status string like "E:3 W:5".
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("E:{} W:{}", self.error_count(), self.warning_count())
    }
}
