//! `codegraph query` — ranked lexical search, markdown-by-default.

use crate::error::IndexResult;
use crate::handlers;
use crate::search::SearchOptions;
use crate::storage::Store;
use crate::types::NodeKind;

#[allow(clippy::too_many_arguments)]
pub fn run(
    store: &Store,
    query: &str,
    kind: Option<&str>,
    language: Option<&str>,
    path_hint: Option<&str>,
    include_files: bool,
    limit: usize,
) -> IndexResult<()> {
    let mut opts = SearchOptions::with_defaults();
    opts.kinds = kind.and_then(NodeKind::from_str_opt).map(|k| vec![k]);
    opts.languages = language.map(|l| vec![l.to_string()]);
    opts.include_files = include_files;
    opts.limit = limit;
    if let Some(hint) = path_hint {
        opts.include_patterns = Some(vec![format!("*{hint}*")]);
    }

    let results = handlers::search_symbols(store, query, &opts)?;
    if results.is_empty() {
        println!("No matches for `{query}`");
        return Ok(());
    }
    for r in &results {
        println!(
            "{:<10} {:<30} {}:{}  [{:.2}]",
            r.node.kind.as_str(), r.node.name, r.node.file_path, r.node.range.start_line, r.final_score
        );
    }
    Ok(())
}
