//! Validation engine for a lint language server.
//!
//! The host editor integration feeds document and configuration events into
//! [`LintServer`] and publishes the [`LintEvent`]s it emits. The analyzer and
//! the per-scope settings provider are external collaborators behind the
//! [`Analyzer`] and [`SettingsSource`] traits.

pub mod analyzer;
pub mod error;
pub mod fixes;
pub mod protocol;
pub mod reconcile;
pub mod scheduler;
pub mod scope_cache;
pub mod types;

pub(crate) mod diagnostics;
pub(crate) mod validate;

mod manager;

pub use analyzer::{
    Analyzer, AnalyzerFut, AnalyzerInput, AnalyzerReport, LintConfiguration, SettingsSource,
    StaticSettings,
};
pub use error::{AnalyzerError, ConfigurationError, ValidationError};
pub use fixes::DocumentFixes;
pub use manager::LintServer;
pub use protocol::{RawFinding, RawReplacement};
pub use reconcile::Reconciliation;
pub use scope_cache::Resolution;
pub use types::{CodeAction, CodeActionKind, DiagnosticsSnapshot, LintEvent, LintStatus};
