//! Reconciles the store with the current file set on disk (spec §4.I).
//! Mirrors the teacher's `storage::metadata::IndexMetadata::mark_snapshot`
//! provenance bookkeeping, generalized from a single `last_modified`
//! stamp to the full added/modified/removed diff.

use crate::config::Settings;
use crate::error::IndexResult;
use crate::node::FileRecord;
use crate::parsing::{extract_file, Scanner};
use crate::resolving::{self, Framework, ResolutionIndex};
use crate::storage::Store;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub files_added: usize,
    pub files_modified: usize,
    pub files_removed: usize,
    pub files_unchanged: usize,
    pub nodes_resolved: usize,
    pub nodes_unresolved: usize,
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// One pass of scan → diff → apply deletions → ingest → resolve.
pub fn sync(store: &Store, project_root: &Path, settings: &Settings) -> IndexResult<SyncReport> {
    let scanner = Scanner::new(&settings.include, &settings.exclude)?;
    let scanned = scanner.scan(project_root)?;

    let tracked_paths = store.all_file_paths()?;
    let mut report = SyncReport::default();
    let mut to_ingest: Vec<(String, String, u64)> = Vec::new(); // (rel_path, content, size)

    let scanned_by_path: std::collections::HashMap<&str, &crate::parsing::ScannedFile> =
        scanned.iter().map(|f| (f.rel_path.as_str(), f)).collect();

    for path in &tracked_paths {
        match scanned_by_path.get(path.as_str()) {
            None => {
                store.delete_file(path)?;
                report.files_removed += 1;
            }
            Some(scanned_file) => {
                let existing = store.get_file(path)?;
                let unchanged = existing.map(|r| r.content_hash == scanned_file.content_hash).unwrap_or(false);
                if unchanged {
                    report.files_unchanged += 1;
                } else {
                    report.files_modified += 1;
                    let full_path = project_root.join(path);
                    if let Ok(content) = std::fs::read_to_string(&full_path) {
                        to_ingest.push((path.clone(), content, scanned_file.size));
                    }
                }
            }
        }
    }

    let tracked_set: std::collections::HashSet<&str> = tracked_paths.iter().map(|s| s.as_str()).collect();
    for scanned_file in &scanned {
        if tracked_set.contains(scanned_file.rel_path.as_str()) {
            continue;
        }
        let full_path = project_root.join(&scanned_file.rel_path);
        if let Ok(content) = std::fs::read_to_string(&full_path) {
            report.files_added += 1;
            to_ingest.push((scanned_file.rel_path.clone(), content, scanned_file.size));
        }
    }

    let mut all_unresolved = Vec::new();
    for (rel_path, content, size) in &to_ingest {
        let language = crate::parsing::languages::for_extension(rel_path.rsplit('.').next().unwrap_or(""))
            .map(|s| s.name.to_string())
            .unwrap_or_else(|| "template".to_string());
        let output = extract_file(rel_path, content, settings.max_file_size);
        let content_hash = scanned_by_path.get(rel_path.as_str()).map(|f| f.content_hash.clone()).unwrap_or_default();
        let record = FileRecord {
            path: rel_path.clone(),
            content_hash,
            language,
            size: *size,
            modified_at: now_unix(),
            indexed_at: now_unix(),
            node_count: output.nodes.len() as u32,
            errors: output.errors,
        };
        store.upsert_file(&record, &output.nodes, &output.edges, &output.unresolved)?;
        all_unresolved.extend(output.unresolved);
    }

    if !all_unresolved.is_empty() {
        let index = ResolutionIndex::build(store)?;
        let frameworks: Vec<Framework> = Framework::detect(&settings.languages.keys().cloned().collect::<Vec<_>>());
        let worker_count = resolving::default_worker_count();
        let outcome = resolving::resolve_all(&all_unresolved, &index, &frameworks, worker_count);
        store.insert_edges(&outcome.edges)?;
        report.nodes_resolved = outcome.stats.resolved;
        report.nodes_unresolved = outcome.stats.unresolved_no_candidates + outcome.stats.unresolved_ambiguous;
    }

    store.set_metadata_field("last_synced_at", &now_unix().to_string())?;
    store.set_metadata_field("last_synced_by_version", env!("CARGO_PKG_VERSION"))?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn sync_detects_added_modified_and_removed_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/hello.rs", "pub fn hello() {}");
        let settings = Settings::default();
        let store = Store::open_in_memory().unwrap();

        let first = sync(&store, dir.path(), &settings).unwrap();
        assert_eq!(first.files_added, 1);

        let second = sync(&store, dir.path(), &settings).unwrap();
        assert_eq!(second.files_unchanged, 1);
        assert_eq!(second.files_added, 0);

        write(dir.path(), "src/hello.rs", "pub fn goodbye() {}");
        let third = sync(&store, dir.path(), &settings).unwrap();
        assert_eq!(third.files_modified, 1);
        assert!(store.get_nodes_by_name("goodbye").unwrap().len() == 1);
        assert!(store.get_nodes_by_name("hello").unwrap().is_empty());

        std::fs::remove_file(dir.path().join("src/hello.rs")).unwrap();
        let fourth = sync(&store, dir.path(), &settings).unwrap();
        assert_eq!(fourth.files_removed, 1);
        assert!(store.all_file_paths().unwrap().is_empty());
    }
}
