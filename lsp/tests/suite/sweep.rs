//! Whole-project results replacing per-document ones.

use std::path::Path;

use lintd_config::LintSettings;
use lintd_lsp::{CodeActionKind, LintEvent};
use lintd_types::{DocumentVersion, Position};

use crate::common::{ScriptedAnalyzer, drain, finding, scan, server, uri};

#[tokio::test(start_paused = true)]
async fn sweep_clears_documents_missing_from_the_result() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, mut events) = server(&analyzer, LintSettings::default());

    let first = [
        scan(Path::new("/repo/a.ts"), "let a = 1"),
        scan(Path::new("/repo/b.ts"), "console.log(1);"),
    ]
    .concat();
    server.apply_project_sweep(first);
    assert_eq!(server.snapshot().files().len(), 2);
    drain(&mut events);

    server.apply_project_sweep(scan(Path::new("/repo/b.ts"), "console.log(1);"));
    let snapshot = server.snapshot();
    assert_eq!(snapshot.files().len(), 1);
    assert_eq!(snapshot.files()[0].0, uri("/repo/b.ts"));

    let published = drain(&mut events);
    assert!(matches!(
        &published[0],
        LintEvent::Diagnostics { uri: cleared, items }
            if *cleared == uri("/repo/a.ts") && items.is_empty()
    ));
    assert!(matches!(
        &published[1],
        LintEvent::Diagnostics { uri: kept, items }
            if *kept == uri("/repo/b.ts") && items.len() == 1
    ));
}

#[tokio::test(start_paused = true)]
async fn sweep_groups_unnormalized_file_names() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());

    let findings = vec![
        finding(
            Path::new("/repo/src/../src/a.ts"),
            "semicolon",
            "Missing semicolon",
            "warning",
            Position::new(0, 9),
            Position::new(0, 9),
            Vec::new(),
        ),
        finding(
            Path::new("/repo/./src/a.ts"),
            "no-console",
            "Calls to 'console.log' are not allowed.",
            "error",
            Position::new(1, 0),
            Position::new(1, 7),
            Vec::new(),
        ),
    ];
    server.apply_project_sweep(findings);

    let a = uri("/repo/src/a.ts");
    let diagnostics = server.diagnostics(&a);
    assert_eq!(diagnostics.len(), 2);
    // Analyzer order is kept within a file.
    assert_eq!(diagnostics[0].code().as_str(), "semicolon");
    assert_eq!(server.snapshot().error_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_drops_fixes_of_cleared_documents() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), DocumentVersion::new(1), "typescript", "let a = 1");
    server.process_next().await;
    assert!(server.fixes(&a).is_some());

    server.apply_project_sweep(Vec::new());
    assert!(server.diagnostics(&a).is_empty());
    assert!(server.fixes(&a).is_none());
}

#[tokio::test(start_paused = true)]
async fn sweep_replaces_fixes_along_with_diagnostics() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");

    server.did_open(a.clone(), DocumentVersion::new(1), "typescript", "let a = 1");
    server.process_next().await;
    assert_eq!(server.fixes(&a).unwrap().auto_fix_count(), 1);

    server.apply_project_sweep(scan(Path::new("/repo/a.ts"), "console.log(1);"));
    let codes: Vec<_> = server
        .diagnostics(&a)
        .iter()
        .map(|d| d.code().as_str().to_string())
        .collect();
    assert_eq!(codes, vec!["no-console"]);
    assert_eq!(server.fixes(&a).unwrap().auto_fix_count(), 0);
    assert!(server.all_fixes(&a, false).await.is_none());

    let console = server.diagnostics(&a)[0].clone();
    let actions = server.code_actions(&a, &[console]);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind(), &CodeActionKind::ApplyDisableRule);
}

#[tokio::test(start_paused = true)]
async fn sweep_locates_fixes_in_open_documents_only() {
    let analyzer = ScriptedAnalyzer::new();
    let (mut server, _events) = server(&analyzer, LintSettings::default());
    let a = uri("/repo/a.ts");
    let b = uri("/repo/b.ts");

    server.did_open(a.clone(), DocumentVersion::new(3), "typescript", "let a = 1");
    server.process_next().await;

    let findings = [
        scan(Path::new("/repo/a.ts"), "let a = 1"),
        scan(Path::new("/repo/b.ts"), "let b = 2"),
    ]
    .concat();
    server.apply_project_sweep(findings);

    let batch = server.all_fixes(&a, false).await.unwrap();
    assert_eq!(batch.document_version, Some(DocumentVersion::new(3)));
    assert_eq!(batch.edits[0].range.start, Position::new(0, 9));

    assert_eq!(server.diagnostics(&b).len(), 1);
    assert!(server.fixes(&b).is_none());
}
