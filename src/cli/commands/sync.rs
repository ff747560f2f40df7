//! `codegraph sync` — identical to `index`, named separately per spec §6
//! since the CLI surface exposes both verbs even though they share the
//! same incremental engine.

use crate::config::Settings;
use crate::error::IndexResult;
use crate::storage::Store;
use std::path::Path;

pub fn run(store: &Store, project_root: &Path, settings: &Settings, quiet: bool) -> IndexResult<()> {
    super::index::run(store, project_root, settings, quiet)
}
