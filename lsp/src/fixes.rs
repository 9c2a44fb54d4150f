//! Fixes recorded by the last validation of each document.

use std::collections::HashMap;

use indexmap::IndexMap;
use url::Url;

use lintd_types::{DiagnosticKey, Fix, FixKind, RuleId};

/// The fixes of one document, keyed by the diagnostic they resolve.
///
/// Auto fixes keep the order they were recorded in, which is the order the
/// analyzer reported its findings.
#[derive(Debug, Clone, Default)]
pub struct DocumentFixes {
    auto: IndexMap<DiagnosticKey, Fix>,
    disable: IndexMap<DiagnosticKey, Fix>,
    rules: HashMap<DiagnosticKey, RuleId>,
}

impl DocumentFixes {
    /// File `fix` under `key` in the registry matching its kind. A second fix
    /// for the same key replaces the first.
    pub fn record(&mut self, key: DiagnosticKey, fix: Fix) {
        match fix.kind() {
            FixKind::AutoFix => {
                self.auto.insert(key, fix);
            }
            FixKind::DisableRule => {
                self.rules.insert(key.clone(), fix.rule_id().clone());
                self.disable.insert(key, fix);
            }
        }
    }

    #[must_use]
    pub fn auto_fix(&self, key: &DiagnosticKey) -> Option<&Fix> {
        self.auto.get(key)
    }

    #[must_use]
    pub fn disable_fix(&self, key: &DiagnosticKey) -> Option<&Fix> {
        self.disable.get(key)
    }

    #[must_use]
    pub fn rule_for(&self, key: &DiagnosticKey) -> Option<&RuleId> {
        self.rules.get(key)
    }

    pub fn auto_fixes(&self) -> impl Iterator<Item = &Fix> {
        self.auto.values()
    }

    #[must_use]
    pub fn auto_fix_count(&self) -> usize {
        self.auto.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auto.is_empty() && self.disable.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct FixRegistry {
    documents: HashMap<Url, DocumentFixes>,
}

impl FixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the fixes of a completed validation, dropping whatever the
    /// previous one recorded.
    pub fn replace(&mut self, uri: &Url, fixes: DocumentFixes) {
        if fixes.is_empty() {
            self.documents.remove(uri);
        } else {
            self.documents.insert(uri.clone(), fixes);
        }
    }

    pub fn clear(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    #[must_use]
    pub fn document(&self, uri: &Url) -> Option<&DocumentFixes> {
        self.documents.get(uri)
    }
}
