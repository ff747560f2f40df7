//! Request-facing symbol resolution and formatting (spec §4.J).
//! Generalizes the teacher's `retrieve.rs` `QueryContext`/`ResolveResult`
//! pattern — `resolve_symbol` plus `handle_resolve_error` — from a single
//! `indexer.find_symbols_by_name` lookup to the full `{symbol, kind?,
//! pathHint?}` filtered search, with auto-pick margins instead of the
//! teacher's always-ambiguous-on-multiple-matches behavior.

use crate::config::SearchConfig;
use crate::context::{self, ContextOptions, TaskContext};
use crate::error::StorageResult;
use crate::graph::{Graph, Subgraph};
use crate::node::Node;
use crate::search::{self, SearchOptions, SearchResult};
use crate::storage::Store;
use crate::types::NodeKind;
use crate::vector::Embedder;

/// Outcome of resolving a `symbol` argument to zero, one, or many nodes.
pub enum ResolveResult {
    /// Exactly one match, or a clear winner by auto-pick margin.
    Found(Node),
    /// No candidates matched the name and filters.
    NotFound,
    /// More than one candidate, none clearly ahead by the configured margin.
    Ambiguous(Vec<Node>),
}

/// Shared filters every symbol-taking tool accepts.
#[derive(Debug, Clone, Default)]
pub struct SymbolQuery {
    pub symbol: String,
    pub kind: Option<NodeKind>,
    pub path_hint: Option<String>,
    pub language: Option<String>,
}

fn node_matches_path_hint(node: &Node, path_hint: &str) -> bool {
    node.file_path.contains(path_hint)
}

/// Resolve a symbol name to a node, applying the auto-pick margins from
/// `SearchConfig`: an exact-name match that beats the runner-up by more
/// than `auto_pick_exact_margin`, or any match beating the runner-up by
/// `auto_pick_fuzzy_margin`, is picked automatically instead of surfacing
/// as ambiguous.
pub fn resolve_symbol(store: &Store, query: &SymbolQuery, search_cfg: &SearchConfig) -> StorageResult<ResolveResult> {
    let mut opts = SearchOptions::with_defaults();
    opts.kinds = query.kind.map(|k| vec![k]);
    opts.languages = query.language.clone().map(|l| vec![l]);
    opts.limit = 20;

    let mut results = search::search(store, &query.symbol, &opts)?;
    if let Some(hint) = &query.path_hint {
        results.retain(|r| node_matches_path_hint(&r.node, hint));
    }

    if results.is_empty() {
        return Ok(ResolveResult::NotFound);
    }
    if results.len() == 1 {
        return Ok(ResolveResult::Found(results.into_iter().next().unwrap().node));
    }

    let top = &results[0];
    let runner_up = &results[1];
    let margin = if top.node.name.eq_ignore_ascii_case(&query.symbol) {
        search_cfg.auto_pick_exact_margin as f64
    } else {
        search_cfg.auto_pick_fuzzy_margin as f64
    };

    if top.final_score - runner_up.final_score > margin {
        return Ok(ResolveResult::Found(results.into_iter().next().unwrap().node));
    }

    Ok(ResolveResult::Ambiguous(results.into_iter().map(|r| r.node).collect()))
}

/// `search` tool: lexical search with optional file-path/kind/language
/// filters, markdown-by-default formatting left to the caller.
pub fn search_symbols(store: &Store, query: &str, opts: &SearchOptions) -> StorageResult<Vec<SearchResult>> {
    search::search(store, query, opts)
}

/// `context` tool: delegates to the task-driven auto-scope pipeline.
pub fn task_context(
    store: &Store,
    embedder: Option<&dyn Embedder>,
    task: &str,
    opts: &ContextOptions,
) -> StorageResult<TaskContext> {
    context::build_context(store, embedder, task, opts)
}

/// `callers`/`callees` tool: resolves the symbol then walks the call graph
/// in one direction, returning just the immediate neighbors (depth 1 by
/// convention; deeper walks go through the `impact` tool).
pub fn callers(store: &Store, query: &SymbolQuery, search_cfg: &SearchConfig, limit: usize) -> StorageResult<ResolveOutcome<Vec<Node>>> {
    resolve_then(store, query, search_cfg, |store, node| {
        let graph = Graph::new(store);
        let subgraph = graph.call_graph(&node.id, 1)?;
        Ok(callers_of(&subgraph, &node.id, limit))
    })
}

pub fn callees(store: &Store, query: &SymbolQuery, search_cfg: &SearchConfig, limit: usize) -> StorageResult<ResolveOutcome<Vec<Node>>> {
    resolve_then(store, query, search_cfg, |store, node| {
        let graph = Graph::new(store);
        let subgraph = graph.call_graph(&node.id, 1)?;
        Ok(callees_of(&subgraph, &node.id, limit))
    })
}

fn callers_of(subgraph: &Subgraph, id: &crate::types::NodeId, limit: usize) -> Vec<Node> {
    subgraph
        .edges
        .iter()
        .filter(|e| &e.target == id)
        .filter_map(|e| subgraph.nodes.get(&e.source))
        .cloned()
        .take(limit)
        .collect()
}

fn callees_of(subgraph: &Subgraph, id: &crate::types::NodeId, limit: usize) -> Vec<Node> {
    subgraph
        .edges
        .iter()
        .filter(|e| &e.source == id)
        .filter_map(|e| subgraph.nodes.get(&e.target))
        .cloned()
        .take(limit)
        .collect()
}

/// `impact` tool: resolves the symbol then walks dependency-edges inward
/// to the requested depth.
pub fn impact(store: &Store, query: &SymbolQuery, search_cfg: &SearchConfig, depth: usize) -> StorageResult<ResolveOutcome<Subgraph>> {
    resolve_then(store, query, search_cfg, |store, node| {
        let graph = Graph::new(store);
        graph.impact_radius(&node.id, depth)
    })
}

/// `node` tool: resolves the symbol and returns it directly, optionally
/// alongside its source snippet.
pub fn node_lookup(store: &Store, query: &SymbolQuery, search_cfg: &SearchConfig) -> StorageResult<ResolveResult> {
    resolve_symbol(store, query, search_cfg)
}

/// Wraps a resolved node's downstream result, or carries the resolution
/// failure through untouched so callers format one `ResolveResult` path.
pub enum ResolveOutcome<T> {
    Found { node: Node, result: T },
    NotFound,
    Ambiguous(Vec<Node>),
}

fn resolve_then<T>(
    store: &Store,
    query: &SymbolQuery,
    search_cfg: &SearchConfig,
    f: impl FnOnce(&Store, &Node) -> StorageResult<T>,
) -> StorageResult<ResolveOutcome<T>> {
    match resolve_symbol(store, query, search_cfg)? {
        ResolveResult::NotFound => Ok(ResolveOutcome::NotFound),
        ResolveResult::Ambiguous(nodes) => Ok(ResolveOutcome::Ambiguous(nodes)),
        ResolveResult::Found(node) => {
            let result = f(store, &node)?;
            Ok(ResolveOutcome::Found { node, result })
        }
    }
}

/// Compact markdown rendering for a resolved node, used as the default
/// (non-JSON) tool response body.
fn format_updated_at(unix_secs: u64) -> String {
    chrono::DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| unix_secs.to_string())
}

pub fn node_to_markdown(node: &Node) -> String {
    let mut out = format!("## {} `{}`\n\n- kind: {}\n- file: {}:{}\n- updated: {}\n", node.name, node.id, node.kind.as_str(), node.file_path, node.range.start_line, format_updated_at(node.updated_at));
    if let Some(sig) = &node.signature {
        out.push_str(&format!("- signature: `{sig}`\n"));
    }
    if let Some(doc) = &node.docstring {
        out.push_str(&format!("\n{doc}\n"));
    }
    out
}

/// Compact markdown for an ambiguous-match list, mirroring the teacher's
/// `output_ambiguous` suggestion format but rendered as markdown instead
/// of an envelope.
pub fn ambiguous_to_markdown(query: &str, nodes: &[Node]) -> String {
    let mut out = format!("Ambiguous: {} symbols match `{query}`:\n\n", nodes.len());
    for node in nodes.iter().take(10) {
        out.push_str(&format!("- `{}` ({}) — {}:{}\n", node.name, node.kind.as_str(), node.file_path, node.range.start_line));
    }
    out
}
