//! `codegraph status` — graph stats: node/edge counts, by kind/language.

use crate::error::IndexResult;
use crate::storage::Store;

pub fn run(store: &Store) -> IndexResult<()> {
    let nodes = store.node_count()?;
    let edges = store.edge_count()?;
    let by_kind = store.counts_by_kind()?;
    let by_language = store.counts_by_language()?;

    println!("nodes: {nodes}");
    println!("edges: {edges}");
    println!("\nby kind:");
    for (kind, count) in &by_kind {
        println!("  {kind:<16} {count}");
    }
    println!("\nby language:");
    for (language, count) in &by_language {
        println!("  {language:<16} {count}");
    }
    Ok(())
}
