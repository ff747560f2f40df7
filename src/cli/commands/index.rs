//! `codegraph index` — full (re)index of the current file set, then
//! embed any newly-embeddable nodes if embeddings are enabled.

use crate::config::Settings;
use crate::error::IndexResult;
use crate::storage::Store;
use crate::sync;
use crate::vector::{Embedder, FastEmbedEmbedder};
use std::path::Path;

pub fn run(store: &Store, project_root: &Path, settings: &Settings, quiet: bool) -> IndexResult<()> {
    let report = sync::sync(store, project_root, settings)?;
    if !quiet {
        println!(
            "indexed: {} added, {} modified, {} removed, {} unchanged ({} resolved, {} unresolved)",
            report.files_added, report.files_modified, report.files_removed, report.files_unchanged, report.nodes_resolved, report.nodes_unresolved
        );
    }

    if settings.enable_embeddings {
        match FastEmbedEmbedder::new() {
            Ok(embedder) => {
                let embedder: &dyn Embedder = &embedder;
                match crate::vector::embed_missing(store, embedder) {
                    Ok(count) if !quiet => println!("embedded {count} node(s)"),
                    Ok(_) => {}
                    Err(e) if !quiet => eprintln!("embedding skipped: {e}"),
                    Err(_) => {}
                }
            }
            Err(e) if !quiet => eprintln!("embedder unavailable, skipping embeddings: {e}"),
            Err(_) => {}
        }
    }

    Ok(())
}
