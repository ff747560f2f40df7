//! `codegraph init` — write `.codegraph/config.json` and an empty store.

use crate::config::{Settings, DOT_DIR};
use crate::error::{IndexError, IndexResult};
use crate::storage::Store;
use std::path::Path;

pub fn run(project_root: &Path, force: bool, quiet: bool) -> IndexResult<()> {
    Settings::init_config_file(project_root, force)?;
    let db_path = project_root.join(DOT_DIR).join("graph.db");
    Store::open(&db_path).map_err(IndexError::Storage)?;
    if !quiet {
        println!("Initialized codegraph project at {}", project_root.display());
    }
    Ok(())
}
