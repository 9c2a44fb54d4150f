//! Turning a bag of candidate fixes into edits that can be applied at once.
//!
//! Fixes are ordered by the position of their first edit and then accepted
//! greedily: a fix is kept when it does not overlap the last kept fix. This
//! is first-sorted-wins interval scheduling, not a maximum independent set.
//! In unusual overlap patterns it can keep fewer fixes than possible; callers
//! learn that something was dropped through `overlaps_detected`.

use lintd_types::{
    DocumentVersion, EditBatch, Fix, FixError, FixKind, Position, RuleId, TextEdit,
};

/// Stable sort by the first edit's start, then its end.
pub fn sort_fixes<'a>(fixes: impl IntoIterator<Item = &'a Fix>) -> Vec<&'a Fix> {
    let mut sorted: Vec<&Fix> = fixes.into_iter().collect();
    sorted.sort_by_key(|fix| {
        let range = fix.first_edit().range;
        (range.start, range.end)
    });
    sorted
}

/// Whether `next` runs into `last`, where `last` sorts first.
///
/// Directional: an edit of `last` overlaps an edit of `next` when it ends at
/// or after the point where the other starts. Touching counts.
#[must_use]
pub fn overlaps(last: &Fix, next: &Fix) -> bool {
    last.edits().iter().any(|a| {
        next.edits()
            .iter()
            .any(|b| ends_at_or_after(a.range.end, b.range.start))
    })
}

fn ends_at_or_after(end: Position, start: Position) -> bool {
    end.line > start.line || (end.line == start.line && end.character >= start.character)
}

/// The outcome of a greedy walk.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation<'a> {
    accepted: Vec<&'a Fix>,
    overlaps_detected: bool,
    document_version: Option<DocumentVersion>,
}

impl<'a> Reconciliation<'a> {
    /// Accepted fixes, in canonical order.
    #[must_use]
    pub fn accepted(&self) -> &[&'a Fix] {
        &self.accepted
    }

    /// Whether any candidate was skipped because it overlapped.
    #[must_use]
    pub fn overlaps_detected(&self) -> bool {
        self.overlaps_detected
    }

    /// Version of the first fix handed in, before sorting or filtering.
    #[must_use]
    pub fn document_version(&self) -> Option<DocumentVersion> {
        self.document_version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    #[must_use]
    pub fn into_batch(self) -> EditBatch {
        EditBatch::from_fixes(
            self.document_version,
            self.accepted,
            self.overlaps_detected,
        )
    }
}

fn greedy<'a>(
    fixes: impl IntoIterator<Item = &'a Fix>,
    keep: impl Fn(&Fix) -> bool,
) -> Reconciliation<'a> {
    let mut document_version = None;
    let candidates = fixes.into_iter().inspect(|fix| {
        document_version.get_or_insert(fix.document_version());
    });
    let sorted = sort_fixes(candidates.filter(|fix| keep(fix)));

    let mut accepted: Vec<&Fix> = Vec::with_capacity(sorted.len());
    let mut overlaps_detected = false;
    for fix in sorted {
        if accepted.last().is_some_and(|last| overlaps(last, fix)) {
            overlaps_detected = true;
        } else {
            accepted.push(fix);
        }
    }
    Reconciliation {
        accepted,
        overlaps_detected,
        document_version,
    }
}

/// Largest greedily chosen subset of `fixes` that can be applied together.
pub fn fix_all<'a>(fixes: impl IntoIterator<Item = &'a Fix>) -> Reconciliation<'a> {
    greedy(fixes, |_| true)
}

/// As [`fix_all`], restricted to fixes for `rule`.
pub fn fix_all_of_rule<'a>(
    fixes: impl IntoIterator<Item = &'a Fix>,
    rule: &RuleId,
) -> Reconciliation<'a> {
    greedy(fixes, |fix| fix.rule_id() == rule)
}

/// A fix that inserts `comment` at the start of `line`, suppressing `rule`
/// there. The comment is expected to end with a line break.
pub fn disable_rule_fix(
    rule: &RuleId,
    line: u32,
    document_version: DocumentVersion,
    comment: impl Into<String>,
) -> Result<Fix, FixError> {
    Fix::new(
        FixKind::DisableRule,
        format!("Disable rule \"{rule}\" for this line"),
        format!("disable {rule}"),
        document_version,
        rule.clone(),
        vec![TextEdit::insert(Position::new(line, 0), comment)],
    )
}
