//! Document lifecycle: debouncing, superseded results, failures, triggers.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use lintd_config::LintSettings;
use lintd_lsp::{LintEvent, LintStatus};
use lintd_types::{DiagnosticSeverity, DocumentVersion};

use crate::common::{ScriptedAnalyzer, drain, server, settings, uri};

fn v(n: i32) -> DocumentVersion {
    DocumentVersion::new(n)
}

fn rules(server: &lintd_lsp::LintServer, uri: &Url) -> Vec<String> {
    server
        .diagnostics(uri)
        .iter()
        .map(|d| d.code().as_str().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn burst_of_changes_validates_latest_text_once() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "let a = 1;");
    for (n, text) in [(2, "let a = 2"), (3, "console.log(a);"), (4, "let b = 3")] {
        tokio::time::sleep(Duration::from_millis(50)).await;
        server.did_change(&a, v(n), text).await;
    }
    assert!(server.is_validation_pending(&a));

    server.process_next().await;
    assert_eq!(analyzer.runs(), vec!["let b = 3".to_string()]);
    assert_eq!(rules(&server, &a), vec!["semicolon"]);
    assert!(!server.is_validation_pending(&a));
}

#[tokio::test(start_paused = true)]
async fn superseded_result_is_dropped() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.slow_down(Duration::from_millis(100));
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    // The first run is in flight when the document changes.
    tokio::time::sleep(Duration::from_millis(250)).await;
    server.did_change(&a, v(2), "let a = 1;").await;

    server.process_next().await;
    assert!(server.diagnostics(&a).is_empty());
    assert!(drain(&mut events).is_empty());

    server.process_next().await;
    assert!(server.diagnostics(&a).is_empty());
    assert_eq!(
        analyzer.runs(),
        vec!["console.log(1);".to_string(), "let a = 1;".to_string()]
    );
    let published = drain(&mut events);
    assert!(matches!(
        &published[0],
        LintEvent::Diagnostics { uri, items } if uri == &a && items.is_empty()
    ));
}

#[tokio::test(start_paused = true)]
async fn out_of_order_change_is_ignored() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(5), "typescript", "let current = 1");
    server.did_change(&a, v(4), "console.log(old)").await;

    server.process_next().await;
    assert_eq!(analyzer.runs(), vec!["let current = 1".to_string()]);
    assert_eq!(rules(&server, &a), vec!["semicolon"]);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_work_and_clears() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "let a = 1");
    server.process_next().await;
    assert_eq!(server.diagnostics(&a).len(), 1);
    assert!(server.fixes(&a).is_some());

    server.did_change(&a, v(2), "let a = 2").await;
    server.did_close(&a);
    assert!(!server.is_open(&a));
    assert!(!server.is_validation_pending(&a));
    assert!(server.diagnostics(&a).is_empty());
    assert!(server.fixes(&a).is_none());

    let last = drain(&mut events).pop().unwrap();
    assert!(matches!(last, LintEvent::Diagnostics { items, .. } if items.is_empty()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(server.poll_events(usize::MAX), 0);
    assert_eq!(analyzer.runs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn configuration_error_keeps_diagnostics_and_is_reported_once() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    server.process_next().await;
    assert_eq!(rules(&server, &a), vec!["no-console"]);
    drain(&mut events);

    analyzer.break_config("Unexpected token } in tslint.json");
    server.watched_config_changed(&[PathBuf::from("/repo/tslint.json")]);
    server.process_next().await;

    assert_eq!(rules(&server, &a), vec!["no-console"]);
    let reported = drain(&mut events);
    assert!(reported.iter().any(|e| matches!(
        e,
        LintEvent::Status {
            state: LintStatus::Error
        }
    )));
    let failure = reported
        .iter()
        .find_map(|e| match e {
            LintEvent::ValidationFailed { error, .. } => Some(error),
            _ => None,
        })
        .unwrap();
    assert!(failure.is_configuration());
    assert!(failure.to_string().contains("Unexpected token"));

    // The cached failure is hit again; status stays Error, no new report.
    server.did_change(&a, v(2), "let a = 1").await;
    server.process_next().await;
    let repeated = drain(&mut events);
    assert!(repeated.iter().any(|e| matches!(
        e,
        LintEvent::Status {
            state: LintStatus::Error
        }
    )));
    assert!(
        !repeated
            .iter()
            .any(|e| matches!(e, LintEvent::ValidationFailed { .. }))
    );

    analyzer.fix_config();
    server.watched_config_changed(&[PathBuf::from("/repo/tslint.json")]);
    server.process_next().await;
    assert_eq!(rules(&server, &a), vec!["semicolon"]);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        LintEvent::Status {
            state: LintStatus::Ok
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn analyzer_failure_keeps_previous_diagnostics() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    server.process_next().await;
    drain(&mut events);

    analyzer.crash("TypeError: cannot read property 'kind' of undefined");
    server.did_change(&a, v(2), "let a = 1").await;
    server.process_next().await;

    assert_eq!(rules(&server, &a), vec!["no-console"]);
    let error = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            LintEvent::ValidationFailed { error, .. } => Some(error),
            _ => None,
        })
        .unwrap();
    assert!(!error.is_configuration());
    let message = error.to_string();
    assert!(message.contains("TypeError"));
    assert!(message.contains("a.ts"));
}

#[tokio::test(start_paused = true)]
async fn analyzer_warnings_set_warn_status() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.warn("Could not find implementations for the following rules: foo");
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "let a = 1;");
    server.process_next().await;
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        LintEvent::Status {
            state: LintStatus::Warn
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn on_save_mode_clears_on_edit_and_validates_on_save() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, settings("run = \"onSave\""));
    let a = uri("/repo/a.ts");

    // Opening validates whatever the trigger.
    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    server.process_next().await;
    assert_eq!(rules(&server, &a), vec!["no-console"]);

    server.did_change(&a, v(2), "let a = 1").await;
    assert!(server.diagnostics(&a).is_empty());
    assert!(!server.is_validation_pending(&a));

    server.did_save(&a).await;
    assert!(server.is_validation_pending(&a));
    server.process_next().await;
    assert_eq!(rules(&server, &a), vec!["semicolon"]);
    assert_eq!(analyzer.runs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn save_does_nothing_in_on_type_mode() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "let a = 1;");
    server.process_next().await;
    server.did_save(&a).await;
    assert!(!server.is_validation_pending(&a));
}

#[tokio::test(start_paused = true)]
async fn settings_change_revalidates_every_open_document() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");
    let b = uri("/repo/b.ts");

    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    server.did_open(b.clone(), v(1), "typescript", "console.log(2);");
    server.process_next().await;
    server.process_next().await;
    assert_eq!(server.snapshot().error_count(), 2);

    server.configuration_changed(Some(settings("enable = false")));
    assert!(server.is_validation_pending(&a));
    assert!(server.is_validation_pending(&b));
    server.process_next().await;
    server.process_next().await;
    assert!(server.snapshot().is_empty());
    assert_eq!(analyzer.runs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn forced_warnings_downgrade_errors() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(
        &analyzer,
        settings("always_show_rule_failures_as_warnings = true"),
    );
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), v(1), "typescript", "console.log(1);");
    server.process_next().await;
    let diagnostics = server.diagnostics(&a);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), DiagnosticSeverity::Warning);
    assert_eq!(
        diagnostics[0].message(),
        "Calls to 'console.log' are not allowed. (no-console)"
    );
}

#[tokio::test(start_paused = true)]
async fn documents_without_a_file_are_skipped() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let untitled = Url::parse("untitled:Untitled-1").unwrap();

    server.did_open(untitled.clone(), v(1), "typescript", "console.log(1);");
    server.process_next().await;
    assert!(server.diagnostics(&untitled).is_empty());
    assert!(analyzer.runs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn excluded_and_disabled_languages_are_skipped() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, settings("exclude = \"**/generated/**\""));
    let generated = uri("/repo/generated/api.ts");
    let script = uri("/repo/tools/build.js");

    server.did_open(generated.clone(), v(1), "typescript", "console.log(1);");
    server.did_open(script.clone(), v(1), "javascript", "console.log(1);");
    server.process_next().await;
    server.process_next().await;
    assert!(server.snapshot().is_empty());
    assert!(analyzer.runs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_configuration_resolution_reports_its_failure() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.break_config("Unexpected token } in tslint.json");
    let (mut server, mut events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");
    let b = uri("/repo/b.ts");

    server.did_open(a.clone(), v(1), "typescript", "let a = 1;");
    server.process_next().await;
    server.did_open(b.clone(), v(1), "typescript", "let b = 2;");
    server.process_next().await;

    let failures: Vec<Url> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            LintEvent::ValidationFailed { uri, error } => {
                assert!(error.is_configuration());
                Some(uri)
            }
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![a, b]);
    assert!(analyzer.runs().is_empty());
}
