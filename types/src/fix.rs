//! Quick fixes and the edit batches built from them.

use serde::Serialize;
use thiserror::Error;

use crate::ids::{DocumentVersion, RuleId};
use crate::position::{Position, TextEdit};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("a fix must contain at least one edit")]
    NoEdits,
    #[error("edits {first} and {second} of the fix overlap")]
    OverlappingEdits { first: usize, second: usize },
}

/// Which registry a fix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixKind {
    /// A correction supplied by the analyzer.
    AutoFix,
    /// A synthesized suppression comment for the offending line.
    DisableRule,
}

/// A named, versioned bundle of edits that resolves one diagnostic.
///
/// Invariant: `edits` is non-empty, sorted ascending by start position, and
/// no two edits overlap. [`Fix::new`] is the only construction path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    label: String,
    failure: String,
    document_version: DocumentVersion,
    rule_id: RuleId,
    kind: FixKind,
    edits: Vec<TextEdit>,
}

impl Fix {
    pub fn new(
        kind: FixKind,
        label: impl Into<String>,
        failure: impl Into<String>,
        document_version: DocumentVersion,
        rule_id: RuleId,
        mut edits: Vec<TextEdit>,
    ) -> Result<Self, FixError> {
        if edits.is_empty() {
            return Err(FixError::NoEdits);
        }
        // Stable: equal starts keep analyzer order (e.g. two inserts at one point).
        edits.sort_by_key(|edit| edit.range.start);
        for (i, pair) in edits.windows(2).enumerate() {
            if pair[0].range.end > pair[1].range.start {
                return Err(FixError::OverlappingEdits {
                    first: i,
                    second: i + 1,
                });
            }
        }
        Ok(Self {
            label: label.into(),
            failure: failure.into(),
            document_version,
            rule_id,
            kind,
            edits,
        })
    }

    /// Analyzer-supplied correction, labelled `Fix: <failure>`.
    pub fn auto_fix(
        failure: &str,
        document_version: DocumentVersion,
        rule_id: RuleId,
        edits: Vec<TextEdit>,
    ) -> Result<Self, FixError> {
        Self::new(
            FixKind::AutoFix,
            format!("Fix: {failure}"),
            failure,
            document_version,
            rule_id,
            edits,
        )
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The analyzer's failure text for the finding this fix resolves.
    #[must_use]
    pub fn failure(&self) -> &str {
        &self.failure
    }

    #[must_use]
    pub fn document_version(&self) -> DocumentVersion {
        self.document_version
    }

    #[must_use]
    pub fn rule_id(&self) -> &RuleId {
        &self.rule_id
    }

    #[must_use]
    pub fn kind(&self) -> FixKind {
        self.kind
    }

    #[must_use]
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    #[must_use]
    pub fn first_edit(&self) -> &TextEdit {
        &self.edits[0]
    }

    #[must_use]
    pub fn start(&self) -> Position {
        self.first_edit().range.start
    }
}

/// A composite edit, applied atomically by the host.
///
/// `document_version` is the version the fixes were computed against; the
/// host rejects the batch if the document has changed since. It is `None`
/// only when no fix contributed to the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBatch {
    pub document_version: Option<DocumentVersion>,
    pub edits: Vec<TextEdit>,
    pub overlapping_fixes: bool,
}

impl EditBatch {
    /// Concatenate the edits of `fixes` in the given order.
    pub fn from_fixes<'a>(
        document_version: Option<DocumentVersion>,
        fixes: impl IntoIterator<Item = &'a Fix>,
        overlapping_fixes: bool,
    ) -> Self {
        let edits = fixes
            .into_iter()
            .flat_map(|fix| fix.edits().iter().cloned())
            .collect();
        Self {
            document_version,
            edits,
            overlapping_fixes,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
