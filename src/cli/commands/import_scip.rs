//! `codegraph import-scip` — apply a SCIP-shaped JSON occurrence index.

use crate::error::IndexResult;
use crate::scip_import;
use crate::storage::Store;
use std::path::Path;

pub fn run(store: &Store, path: &Path) -> IndexResult<()> {
    let stats = scip_import::import_file(store, path)?;
    println!("documents:           {}", stats.documents);
    println!("definitions mapped:  {}", stats.definitions_mapped);
    println!("definitions dropped: {}", stats.definitions_unmapped);
    println!("edges replaced:      {}", stats.edges_replaced);
    println!("edges created:       {}", stats.edges_created);
    Ok(())
}
