//! Core domain types for lintd.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Positions, diagnostics, and fixes are shared by the settings loader, the
//! validation engine, and the binary.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod diagnostic;
mod fix;
mod ids;
mod position;

pub use diagnostic::{Diagnostic, DiagnosticKey, DiagnosticSeverity};
pub use fix::{EditBatch, Fix, FixError, FixKind};
pub use ids::{DocumentId, DocumentVersion, RuleId};
pub use position::{Position, Range, TextEdit};
