//! Ambiguity and path-hint disambiguation over a real indexed project.

use codegraph::config::Settings;
use codegraph::handlers::{self, ResolveResult, SymbolQuery};
use codegraph::storage::Store;
use codegraph::sync;
use std::fs;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, Store, Settings) {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    let store = Store::open_in_memory().unwrap();
    let settings = Settings::default();
    (dir, store, settings)
}

#[test]
fn duplicate_names_in_different_files_are_reported_ambiguous() {
    let (dir, store, settings) = project(&[
        ("src/web/session.rs", "pub fn session() {}"),
        ("src/cli/tui/session.rs", "pub fn session() {}"),
    ]);
    sync::sync(&store, dir.path(), &settings).unwrap();

    let query = SymbolQuery { symbol: "session".to_string(), ..Default::default() };
    let result = handlers::resolve_symbol(&store, &query, &settings.search).unwrap();
    match result {
        ResolveResult::Ambiguous(nodes) => assert_eq!(nodes.len(), 2),
        other => panic!("expected Ambiguous, got a different outcome: {}", matches!(other, ResolveResult::Found(_))),
    }
}

#[test]
fn path_hint_narrows_an_ambiguous_match_to_one() {
    let (dir, store, settings) = project(&[
        ("src/web/session.rs", "pub fn session() {}"),
        ("src/cli/tui/session.rs", "pub fn session() {}"),
    ]);
    sync::sync(&store, dir.path(), &settings).unwrap();

    let query = SymbolQuery {
        symbol: "session".to_string(),
        path_hint: Some("cli/tui".to_string()),
        ..Default::default()
    };
    let result = handlers::resolve_symbol(&store, &query, &settings.search).unwrap();
    match result {
        ResolveResult::Found(node) => assert_eq!(node.file_path, "src/cli/tui/session.rs"),
        _ => panic!("expected a unique match once narrowed by path_hint"),
    }
}
