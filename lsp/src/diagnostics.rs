//! Diagnostics store: the last published diagnostics per document.

use std::collections::{BTreeMap, HashMap};

use lintd_types::Diagnostic;
use url::Url;

use crate::types::DiagnosticsSnapshot;

#[derive(Debug, Default)]
pub(crate) struct DiagnosticsStore {
    data: HashMap<Url, Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics for one document. Empty clears it.
    pub fn replace_for_document(&mut self, uri: &Url, items: Vec<Diagnostic>) {
        if items.is_empty() {
            self.data.remove(uri);
        } else {
            self.data.insert(uri.clone(), items);
        }
    }

    /// Install a whole-project result. Every previously tracked document
    /// missing from `entries` is cleared; those URIs are returned in order so
    /// the caller can publish the empty sets.
    pub fn replace_for_project(&mut self, entries: BTreeMap<Url, Vec<Diagnostic>>) -> Vec<Url> {
        let mut cleared: Vec<Url> = self
            .data
            .keys()
            .filter(|uri| !entries.contains_key(*uri))
            .cloned()
            .collect();
        cleared.sort();
        for uri in &cleared {
            self.data.remove(uri);
        }
        for (uri, items) in entries {
            self.replace_for_document(&uri, items);
        }
        cleared
    }

    #[must_use]
    pub fn get(&self, uri: &Url) -> &[Diagnostic] {
        self.data.get(uri).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let mut files: Vec<(Url, Vec<Diagnostic>)> = self
            .data
            .iter()
            .map(|(uri, items)| (uri.clone(), items.clone()))
            .collect();

        // Documents with errors first, then by URI.
        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot::new(files)
    }
}
