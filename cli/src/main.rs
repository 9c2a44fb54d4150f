//! lintd CLI - drive the validation engine from the command line.
//!
//! Each subcommand builds a [`LintServer`] around a [`ReplayAnalyzer`] that
//! serves findings recorded from an analyzer run, so a pipeline can be
//! checked without an editor attached:
//!
//! ```text
//! check   -> did_open -> debounce -> validate -> diagnostics on stdout
//! fix-all -> did_open -> all_fixes (forces the pending run) -> EditBatch JSON
//! sweep   -> apply_project_sweep -> per-file diagnostics + summary
//! ```
//!
//! Logs go to stderr; stdout carries results only.

mod cli;
mod replay;

use std::env;
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

use lintd_config::{LintSettings, default_config_path, load_settings};
use lintd_lsp::{DiagnosticsSnapshot, LintEvent, LintServer};
use lintd_types::{DocumentVersion, EditBatch};

use crate::cli::{Cli, Commands};
use crate::replay::ReplayAnalyzer;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("LINTD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

/// Settings from `explicit`, else from the user config file, else defaults.
fn load_cli_settings(explicit: Option<&Path>) -> Result<LintSettings> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("settings file not found: {}", path.display());
        }
        return Ok(load_settings(path)?.unwrap_or_default());
    }
    let Some(path) = default_config_path() else {
        return Ok(LintSettings::default());
    };
    Ok(load_settings(&path)?.unwrap_or_default())
}

/// Language id an editor would assign to `path`.
fn language_id_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => "typescript",
        Some("tsx") => "typescriptreact",
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("jsx") => "javascriptreact",
        _ => "plaintext",
    }
}

struct Session {
    server: LintServer,
    events: mpsc::UnboundedReceiver<LintEvent>,
    uri: Url,
    display_path: String,
}

impl Session {
    /// Open `file` in a fresh server.
    fn open(analyzer: ReplayAnalyzer, settings: LintSettings, file: &Path) -> Result<Self> {
        let absolute = path::absolute(file)
            .with_context(|| format!("cannot resolve {}", file.display()))?;
        let text = fs::read_to_string(&absolute)
            .with_context(|| format!("failed to read {}", absolute.display()))?;
        let uri = Url::from_file_path(&absolute)
            .map_err(|()| anyhow::anyhow!("cannot convert {} to a URI", absolute.display()))?;

        let (mut server, events) = LintServer::new(Arc::new(analyzer), settings);
        server.did_open(
            uri.clone(),
            DocumentVersion::new(1),
            language_id_for(&absolute),
            text,
        );
        Ok(Self {
            server,
            events,
            uri,
            display_path: file.display().to_string(),
        })
    }

    /// Drain queued events, printing failures. Returns whether any
    /// validation failed.
    fn report_events(&mut self) -> bool {
        report_events(&mut self.events)
    }
}

fn report_events(events: &mut mpsc::UnboundedReceiver<LintEvent>) -> bool {
    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            LintEvent::ValidationFailed { uri, error } => {
                eprintln!("{uri}: {error}");
                failed = true;
            }
            LintEvent::Status { state } => tracing::debug!(?state, "Status"),
            LintEvent::Diagnostics { uri, items } => {
                tracing::debug!(uri = %uri, count = items.len(), "Diagnostics published");
            }
        }
    }
    failed
}

/// Validate `file` and collect its diagnostics, one line each. The flag is
/// set when there are errors or the validation failed.
async fn run_check(
    analyzer: ReplayAnalyzer,
    settings: LintSettings,
    file: &Path,
) -> Result<(Vec<String>, bool)> {
    let mut session = Session::open(analyzer, settings, file)?;
    session.server.process_next().await;
    let failed = session.report_events();

    let diagnostics = session.server.diagnostics(&session.uri);
    let has_errors = diagnostics.iter().any(|d| d.severity().is_error());
    let lines = diagnostics
        .iter()
        .map(|d| d.display_with_path(&session.display_path))
        .collect();
    Ok((lines, failed || has_errors))
}

async fn run_fix_all(
    analyzer: ReplayAnalyzer,
    settings: LintSettings,
    file: &Path,
    on_save: bool,
) -> Result<Option<EditBatch>> {
    let mut session = Session::open(analyzer, settings, file)?;
    let batch = session.server.all_fixes(&session.uri, on_save).await;
    if session.report_events() {
        bail!("validation of {} failed", file.display());
    }
    Ok(batch)
}

fn run_sweep(analyzer: ReplayAnalyzer, settings: LintSettings) -> DiagnosticsSnapshot {
    let findings = analyzer.findings().to_vec();
    let (mut server, mut events) = LintServer::new(Arc::new(analyzer), settings);
    server.apply_project_sweep(findings);
    report_events(&mut events);
    server.snapshot()
}

fn base_dir() -> Result<PathBuf> {
    env::current_dir().context("cannot determine the working directory")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            file,
            findings,
            settings,
            config,
        } => {
            let settings = load_cli_settings(settings.as_deref())?;
            let analyzer = ReplayAnalyzer::load(&findings, &base_dir()?, config)?;
            let (lines, failed) = run_check(analyzer, settings, &file).await?;
            for line in &lines {
                println!("{line}");
            }
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::FixAll {
            file,
            findings,
            settings,
            config,
            on_save,
        } => {
            let settings = load_cli_settings(settings.as_deref())?;
            let analyzer = ReplayAnalyzer::load(&findings, &base_dir()?, config)?;
            let batch = run_fix_all(analyzer, settings, &file, on_save)
                .await?
                .unwrap_or_default();
            if batch.overlapping_fixes {
                tracing::info!("Some fixes overlap; run fix-all again after applying these");
            }
            println!("{}", serde_json::to_string_pretty(&batch)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sweep { findings, settings } => {
            let settings = load_cli_settings(settings.as_deref())?;
            let analyzer = ReplayAnalyzer::load(&findings, &base_dir()?, None)?;
            let snapshot = run_sweep(analyzer, settings);
            for (uri, items) in snapshot.files() {
                let path = uri
                    .to_file_path()
                    .map_or_else(|()| uri.to_string(), |p| p.display().to_string());
                for item in items {
                    println!("{}", item.display_with_path(&path));
                }
            }
            let summary = snapshot.status_string();
            if !summary.is_empty() {
                println!("{summary}");
            }
            Ok(if snapshot.error_count() > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}
