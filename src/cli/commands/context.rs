//! `codegraph context` — task-scoped subgraph assembled as markdown.

use crate::context::{self, ContextOptions};
use crate::error::IndexResult;
use crate::handlers;
use crate::storage::Store;
use crate::types::NodeKind;
use crate::vector::Embedder;

#[allow(clippy::too_many_arguments)]
pub fn run(
    store: &Store,
    embedder: Option<&dyn Embedder>,
    task: &str,
    max_nodes: Option<usize>,
    kind: Option<&str>,
    language: Option<&str>,
    path_hint: Option<&str>,
    include_files: bool,
    include_code: bool,
) -> IndexResult<()> {
    let mut opts = ContextOptions::default();
    if let Some(n) = max_nodes {
        opts.max_nodes = n;
    }
    opts.kind = kind.and_then(NodeKind::from_str_opt);
    opts.language = language.map(String::from);
    opts.path_hint = path_hint.map(String::from);
    opts.include_files = include_files;
    opts.include_code = include_code;

    let ctx = handlers::task_context(store, embedder, task, &opts)?;
    println!("{}", context::to_markdown(&ctx));
    Ok(())
}
