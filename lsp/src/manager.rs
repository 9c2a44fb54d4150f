//! `LintServer` facade: the public API the host drives.
//!
//! The host forwards document and configuration events, drains validation
//! results with [`LintServer::poll_events`] (or awaits one with
//! [`LintServer::process_next`]), and forwards the [`LintEvent`]s it
//! receives. All state mutation happens on the caller's task; spawned
//! validation work only reads the shared caches and reports back through a
//! channel.
//!
//! Every scheduled validation is stamped with a fresh generation. A result
//! whose generation is no longer the document's current one is dropped on
//! arrival, so a superseded run can never overwrite newer diagnostics or
//! resurface an old error.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use url::Url;

use lintd_config::{LintSettings, RunTrigger};
use lintd_types::{Diagnostic, DocumentId, DocumentVersion, EditBatch, Fix, RuleId};

use crate::analyzer::{Analyzer, SettingsSource};
use crate::diagnostics::DiagnosticsStore;
use crate::fixes::{DocumentFixes, FixRegistry};
use crate::protocol::{self, RawFinding};
use crate::reconcile;
use crate::scheduler::{DebounceScheduler, ErrorSink};
use crate::types::{CodeAction, CodeActionKind, DiagnosticsSnapshot, LintEvent, LintStatus};
use crate::validate::{self, Attempt, Failure, Outcome, ValidationContext, ValidationJob};

struct OpenDocument {
    version: DocumentVersion,
    language_id: String,
    text: String,
}

struct ValidationResult {
    uri: Url,
    generation: u64,
    outcome: Outcome,
}

pub struct LintServer {
    context: Arc<ValidationContext>,
    documents: HashMap<Url, OpenDocument>,
    /// Generation of the newest validation scheduled per open document.
    generations: HashMap<Url, u64>,
    next_generation: u64,
    scheduler: DebounceScheduler<Url>,
    diagnostics: DiagnosticsStore,
    fixes: FixRegistry,
    /// Resolution attempt behind the last configuration failure surfaced to
    /// the host. Hitting the same cached failure again is not reported.
    last_config_failure: Option<Attempt>,
    result_tx: mpsc::UnboundedSender<ValidationResult>,
    result_rx: mpsc::UnboundedReceiver<ValidationResult>,
    event_tx: mpsc::UnboundedSender<LintEvent>,
}

impl LintServer {
    /// Create a server whose settings are the same for every document.
    ///
    /// Returns the receiver for outbound events. Must be called from within
    /// a tokio runtime.
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        settings: LintSettings,
    ) -> (Self, mpsc::UnboundedReceiver<LintEvent>) {
        Self::build(analyzer, None, settings)
    }

    /// Create a server that asks `source` for each document's settings.
    ///
    /// `fallback` supplies the debounce delay and the settings used for
    /// project sweeps.
    pub fn with_settings_source(
        analyzer: Arc<dyn Analyzer>,
        source: Arc<dyn SettingsSource>,
        fallback: LintSettings,
    ) -> (Self, mpsc::UnboundedReceiver<LintEvent>) {
        Self::build(analyzer, Some(source), fallback)
    }

    fn build(
        analyzer: Arc<dyn Analyzer>,
        source: Option<Arc<dyn SettingsSource>>,
        settings: LintSettings,
    ) -> (Self, mpsc::UnboundedReceiver<LintEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let sink_tx = event_tx.clone();
        let on_error: ErrorSink<Url> = Arc::new(move |uri, err| {
            tracing::error!(uri = %uri, "Validation task failed: {err:#}");
            // Receiver gone means the host is shutting down.
            let _ = sink_tx.send(LintEvent::Status {
                state: LintStatus::Error,
            });
        });
        let scheduler = DebounceScheduler::new(settings.debounce(), on_error);

        tracing::info!(
            analyzer = analyzer.name(),
            debounce_ms = settings.debounce().as_millis(),
            "Lint server ready"
        );
        let server = Self {
            context: Arc::new(ValidationContext::new(analyzer, source, settings)),
            documents: HashMap::new(),
            generations: HashMap::new(),
            next_generation: 0,
            scheduler,
            diagnostics: DiagnosticsStore::new(),
            fixes: FixRegistry::new(),
            last_config_failure: None,
            result_tx,
            result_rx,
            event_tx,
        };
        (server, event_rx)
    }

    // ── inbound document events ───────────────────────────────────────

    /// A document was opened. Always schedules validation, whatever the
    /// run trigger.
    pub fn did_open(
        &mut self,
        uri: Url,
        version: DocumentVersion,
        language_id: impl Into<String>,
        text: impl Into<String>,
    ) {
        tracing::debug!(uri = %uri, version = %version, "Document opened");
        self.documents.insert(
            uri.clone(),
            OpenDocument {
                version,
                language_id: language_id.into(),
                text: text.into(),
            },
        );
        self.trigger_validation(&uri);
    }

    /// A document's full text changed.
    ///
    /// With `run = onType` this schedules validation. With `run = onSave`
    /// the published diagnostics no longer describe the text, so they are
    /// cleared until the next save.
    pub async fn did_change(
        &mut self,
        uri: &Url,
        version: DocumentVersion,
        text: impl Into<String>,
    ) {
        let Some(doc) = self.documents.get_mut(uri) else {
            tracing::debug!(uri = %uri, "Change for a document that is not open");
            return;
        };
        if version < doc.version {
            tracing::debug!(
                uri = %uri,
                current = %doc.version,
                received = %version,
                "Ignoring out-of-order change"
            );
            return;
        }
        doc.version = version;
        doc.text = text.into();

        let settings = match self.context.settings_for(uri).await {
            Ok(settings) => settings,
            Err(err) => {
                self.report_failure(uri, err.into());
                return;
            }
        };
        match settings.run() {
            RunTrigger::OnType => self.trigger_validation(uri),
            RunTrigger::OnSave => {
                self.supersede(uri);
                self.install(uri, Vec::new(), DocumentFixes::default());
            }
        }
    }

    /// A document was saved. Schedules validation when `run = onSave`.
    pub async fn did_save(&mut self, uri: &Url) {
        if !self.documents.contains_key(uri) {
            return;
        }
        let settings = self.context.settings_for(uri).await;
        match settings {
            Ok(settings) if settings.run() == RunTrigger::OnSave => self.trigger_validation(uri),
            Ok(_) => {}
            Err(err) => self.report_failure(uri, err.into()),
        }
    }

    /// A document was closed: cancel its pending work, forget its results,
    /// and publish an empty set.
    pub fn did_close(&mut self, uri: &Url) {
        if self.documents.remove(uri).is_none() {
            return;
        }
        tracing::debug!(uri = %uri, "Document closed");
        self.supersede(uri);
        self.generations.remove(uri);
        self.install(uri, Vec::new(), DocumentFixes::default());
    }

    // ── inbound configuration events ──────────────────────────────────

    /// Settings changed. `Some` replaces the host-wide settings; `None`
    /// means a scoped source has new values. Both caches are flushed and
    /// every open document is validated again.
    pub fn configuration_changed(&mut self, settings: Option<LintSettings>) {
        if let Some(settings) = settings {
            self.scheduler.set_delay(settings.debounce());
            self.context.set_global_settings(settings);
        }
        self.context.flush();
        self.last_config_failure = None;
        tracing::info!(
            documents = self.documents.len(),
            "Settings changed, revalidating open documents"
        );
        self.revalidate_all();
    }

    /// A watched lint configuration file changed on disk.
    pub fn watched_config_changed(&mut self, paths: &[PathBuf]) {
        for path in paths {
            tracing::info!("Lint configuration changed: {}", path.display());
        }
        self.context.flush_configuration();
        self.last_config_failure = None;
        self.revalidate_all();
    }

    // ── result handling ───────────────────────────────────────────────

    /// Apply finished validations, up to `budget`.
    ///
    /// Non-blocking: returns immediately when no results are waiting.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    self.apply_result(result);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Wait for the next finished validation and apply it.
    ///
    /// Waits indefinitely if nothing is scheduled or in flight.
    pub async fn process_next(&mut self) {
        if let Some(result) = self.result_rx.recv().await {
            self.apply_result(result);
        }
    }

    fn apply_result(&mut self, result: ValidationResult) {
        let ValidationResult {
            uri,
            generation,
            outcome,
        } = result;
        if self.generations.get(&uri) != Some(&generation) {
            tracing::trace!(uri = %uri, generation, "Dropping superseded validation result");
            return;
        }

        match outcome {
            Outcome::Completed {
                diagnostics,
                fixes,
                warnings,
            } => {
                let state = if warnings.is_empty() {
                    LintStatus::Ok
                } else {
                    for warning in &warnings {
                        tracing::warn!(uri = %uri, "Analyzer warning: {warning}");
                    }
                    LintStatus::Warn
                };
                self.install(&uri, diagnostics, fixes);
                self.emit(LintEvent::Status { state });
            }
            Outcome::Skipped(reason) => {
                tracing::trace!(uri = %uri, "Validation skipped: {reason}");
                self.install(&uri, Vec::new(), DocumentFixes::default());
            }
            Outcome::Failed(error) => self.report_failure(&uri, error),
        }
    }

    /// Surface a failure. The document's diagnostics and fixes are left as
    /// they were.
    fn report_failure(&mut self, uri: &Url, failure: Failure) {
        let Failure { error, attempt } = failure;
        if let Some(attempt) = attempt {
            let repeated = self.last_config_failure.replace(attempt) == Some(attempt);
            if repeated {
                tracing::debug!(uri = %uri, ?attempt, "Configuration still invalid: {error}");
                self.emit(LintEvent::Status {
                    state: LintStatus::Error,
                });
                return;
            }
        }
        tracing::warn!(uri = %uri, "{error}");
        self.emit(LintEvent::Status {
            state: LintStatus::Error,
        });
        self.emit(LintEvent::ValidationFailed {
            uri: uri.clone(),
            error,
        });
    }

    /// Replace diagnostics and fixes for `uri` as one unit and publish.
    fn install(&mut self, uri: &Url, diagnostics: Vec<Diagnostic>, fixes: DocumentFixes) {
        tracing::debug!(uri = %uri, count = diagnostics.len(), "Diagnostics updated");
        self.fixes.replace(uri, fixes);
        self.diagnostics.replace_for_document(uri, diagnostics.clone());
        self.emit(LintEvent::Diagnostics {
            uri: uri.clone(),
            items: diagnostics,
        });
    }

    fn emit(&self, event: LintEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }

    // ── scheduling ────────────────────────────────────────────────────

    fn trigger_validation(&mut self, uri: &Url) {
        let Some(doc) = self.documents.get(uri) else {
            return;
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        self.generations.insert(uri.clone(), generation);

        let job = ValidationJob {
            document: DocumentId::new(uri.clone(), doc.version),
            language_id: doc.language_id.clone(),
            text: doc.text.clone(),
        };
        tracing::trace!(document = %job.document, generation, "Scheduling validation");

        let context = Arc::clone(&self.context);
        let results = self.result_tx.clone();
        let key = uri.clone();
        self.scheduler.schedule(
            uri.clone(),
            Box::pin(async move {
                let outcome = validate::run(&context, &job).await;
                results
                    .send(ValidationResult {
                        uri: key,
                        generation,
                        outcome,
                    })
                    .map_err(|_| anyhow::anyhow!("validation result channel closed"))
            }),
        );
    }

    /// Cancel pending work for `uri` and invalidate anything in flight.
    fn supersede(&mut self, uri: &Url) {
        self.scheduler.cancel(uri);
        if self.documents.contains_key(uri) {
            self.next_generation += 1;
            self.generations.insert(uri.clone(), self.next_generation);
        }
    }

    fn revalidate_all(&mut self) {
        let mut uris: Vec<Url> = self.documents.keys().cloned().collect();
        uris.sort();
        for uri in &uris {
            self.trigger_validation(uri);
        }
    }

    /// Run the pending validation for `uri` now instead of waiting for its
    /// timer, and apply the result.
    async fn force_validation(&mut self, uri: &Url) {
        let Some(work) = self.scheduler.take_pending(uri) else {
            return;
        };
        tracing::debug!(uri = %uri, "Running pending validation now");
        if let Err(err) = work.await {
            tracing::warn!(uri = %uri, "Forced validation failed: {err:#}");
        }
        self.poll_events(usize::MAX);
    }

    // ── requests ──────────────────────────────────────────────────────

    /// Quick fixes for the diagnostics the host is asking about.
    #[must_use]
    pub fn code_actions(&self, uri: &Url, requested: &[Diagnostic]) -> Vec<CodeAction> {
        let Some(doc) = self.fixes.document(uri) else {
            return Vec::new();
        };
        let mut actions = Vec::new();

        let mut last_rule: Option<&RuleId> = None;
        for diagnostic in requested {
            if let Some(fix) = doc.auto_fix(&diagnostic.key()) {
                last_rule = Some(fix.rule_id());
                actions.push(CodeAction::new(
                    fix.label(),
                    CodeActionKind::ApplySingleFix,
                    uri.clone(),
                    Some(single_batch(fix)),
                ));
            }
        }

        if let Some(rule) = last_rule {
            let same = reconcile::fix_all_of_rule(doc.auto_fixes(), rule);
            if same.len() > 1 {
                let title = format!("Fix all: {}", same.accepted()[0].failure());
                actions.push(CodeAction::new(
                    title,
                    CodeActionKind::ApplySameFixes,
                    uri.clone(),
                    Some(same.into_batch()),
                ));
            }
            let all = reconcile::fix_all(doc.auto_fixes());
            if all.len() > 1 {
                actions.push(CodeAction::new(
                    "Fix all auto-fixable problems",
                    CodeActionKind::ApplyAllFixes,
                    uri.clone(),
                    Some(all.into_batch()),
                ));
            }
        }

        for diagnostic in requested {
            if let Some(fix) = doc.disable_fix(&diagnostic.key()) {
                actions.push(CodeAction::new(
                    fix.label(),
                    CodeActionKind::ApplyDisableRule,
                    uri.clone(),
                    Some(single_batch(fix)),
                ));
            }
        }

        for diagnostic in requested {
            if let Some(rule) = doc.rule_for(&diagnostic.key()) {
                actions.push(CodeAction::new(
                    format!("Show documentation for \"{rule}\""),
                    CodeActionKind::ShowRuleDocumentation { rule: rule.clone() },
                    uri.clone(),
                    None,
                ));
            }
        }
        actions
    }

    /// Every auto fix for `uri` that can be applied together.
    ///
    /// A pending validation runs first so the fixes match the current text.
    /// When `on_save` is set and settings list specific rules for fixing on
    /// save, only those rules participate. Returns `None` when the document
    /// is not open or no auto fix is left to apply.
    pub async fn all_fixes(&mut self, uri: &Url, on_save: bool) -> Option<EditBatch> {
        if !self.documents.contains_key(uri) {
            return None;
        }
        self.force_validation(uri).await;

        let settings = if on_save {
            self.context.settings_for(uri).await.ok()
        } else {
            None
        };
        let doc = self.fixes.document(uri)?;
        let document_version = doc.auto_fixes().next().map(Fix::document_version)?;

        let candidates = doc.auto_fixes().filter(|fix| {
            settings
                .as_ref()
                .is_none_or(|s| s.auto_fix_on_save().allows(fix.rule_id().as_str()))
        });
        let result = reconcile::fix_all(candidates);
        if result.is_empty() {
            return None;
        }
        if result.overlaps_detected() {
            tracing::debug!(uri = %uri, "Some fixes overlap and were left out");
        }
        Some(EditBatch::from_fixes(
            Some(document_version),
            result.accepted().iter().copied(),
            result.overlaps_detected(),
        ))
    }

    /// Install the result of a whole-project analyzer run.
    ///
    /// Findings are grouped by normalized file path. Documents that had
    /// diagnostics but are absent from the sweep are cleared. Each swept
    /// document's fixes are replaced along with its diagnostics: open
    /// documents get fixes computed against their current text, the others
    /// keep none.
    pub fn apply_project_sweep(&mut self, findings: Vec<RawFinding>) {
        let settings = self.context.global_settings();
        let force_warning = settings.always_show_rule_failures_as_warnings();

        let mut entries: BTreeMap<Url, (Vec<Diagnostic>, DocumentFixes)> = BTreeMap::new();
        for (file, findings) in protocol::group_by_file(findings) {
            let path = Path::new(&file);
            let uri = match protocol::path_to_file_uri(path) {
                Ok(uri) => uri,
                Err(e) => {
                    tracing::warn!("Skipping sweep results: {e}");
                    continue;
                }
            };
            let entry = self
                .sweep_open_document(&uri, path, &settings, &findings)
                .unwrap_or_else(|| {
                    let analyzer = self.context.analyzer();
                    let items = findings
                        .iter()
                        .map(|f| f.to_diagnostic(analyzer.name(), force_warning))
                        .collect();
                    (items, DocumentFixes::default())
                });
            entries.insert(uri, entry);
        }

        tracing::info!(files = entries.len(), "Applying project sweep");
        let published = entries
            .iter()
            .map(|(uri, (items, _))| (uri.clone(), items.clone()))
            .collect();
        let cleared = self.diagnostics.replace_for_project(published);
        for uri in cleared {
            self.fixes.clear(&uri);
            self.emit(LintEvent::Diagnostics {
                uri,
                items: Vec::new(),
            });
        }
        for (uri, (items, fixes)) in entries {
            self.fixes.replace(&uri, fixes);
            self.emit(LintEvent::Diagnostics { uri, items });
        }
    }

    /// Diagnostics and fixes for a swept document that is open, located in
    /// its current text. `None` when the document is not open or its fixes
    /// cannot be built.
    fn sweep_open_document(
        &self,
        uri: &Url,
        path: &Path,
        settings: &LintSettings,
        findings: &[RawFinding],
    ) -> Option<(Vec<Diagnostic>, DocumentFixes)> {
        let doc = self.documents.get(uri)?;
        let job = ValidationJob {
            document: DocumentId::new(uri.clone(), doc.version),
            language_id: doc.language_id.clone(),
            text: doc.text.clone(),
        };
        match validate::collect_findings(self.context.analyzer(), settings, &job, path, findings) {
            Ok(collected) => Some(collected),
            Err(err) => {
                tracing::warn!(uri = %uri, "Sweep fixes unavailable: {err}");
                None
            }
        }
    }

    // ── queries ───────────────────────────────────────────────────────

    #[must_use]
    pub fn diagnostics(&self, uri: &Url) -> &[Diagnostic] {
        self.diagnostics.get(uri)
    }

    #[must_use]
    pub fn fixes(&self, uri: &Url) -> Option<&DocumentFixes> {
        self.fixes.document(uri)
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    #[must_use]
    pub fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    #[must_use]
    pub fn is_validation_pending(&self, uri: &Url) -> bool {
        self.scheduler.is_pending(uri)
    }
}

fn single_batch(fix: &Fix) -> EditBatch {
    EditBatch::from_fixes(Some(fix.document_version()), [fix], false)
}
