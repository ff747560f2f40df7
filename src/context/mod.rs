//! Task-driven subgraph context (spec §4.H), generalized from the
//! teacher's single-symbol `SymbolContext`/`QueryContext::resolve_symbol`
//! pattern in `retrieve.rs` to a multi-entry-point, budgeted subgraph
//! walk with code-block extraction and markdown formatting.

use crate::error::StorageResult;
use crate::graph::{Graph, TraverseOptions};
use crate::node::Node;
use crate::search::{self, SearchOptions};
use crate::storage::Store;
use crate::types::{Direction, NodeId, NodeKind};
use crate::vector::{self, Embedder};
use std::collections::{HashMap, HashSet};

const GENERATED_DIR_MARKERS: &[&str] = &["node_modules/", "vendor/", "dist/", "build/", "target/", ".git/"];
const EXPLORATORY_KEYWORDS: &[&str] = &["understand", "explore", "overview", "how does", "what is", "architecture"];
const FOCUSED_KEYWORDS: &[&str] = &["fix", "bug", "implement", "add", "refactor", "change"];

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub max_nodes: usize,
    pub kind: Option<NodeKind>,
    pub language: Option<String>,
    pub path_hint: Option<String>,
    pub include_files: bool,
    pub include_code: bool,
    pub search_limit: usize,
    pub traversal_depth: usize,
    pub max_nodes_per_entry_point: usize,
    pub max_code_blocks: usize,
    pub max_code_block_size: usize,
    pub min_score: f64,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            max_nodes: 40,
            kind: None,
            language: None,
            path_hint: None,
            include_files: false,
            include_code: true,
            search_limit: 5,
            traversal_depth: 1,
            max_nodes_per_entry_point: 15,
            max_code_blocks: 5,
            max_code_block_size: 2000,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub node_id: NodeId,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub code: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContextStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub code_block_count: usize,
    pub total_code_size: usize,
}

pub struct TaskContext {
    pub entry_points: Vec<NodeId>,
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<crate::node::Edge>,
    pub code_blocks: Vec<CodeBlock>,
    pub stats: ContextStats,
    pub inferred_kind: Option<NodeKind>,
    pub inferred_language: Option<String>,
    pub inferred_path_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Exploratory,
    Focused,
}

fn detect_intent(task: &str) -> Intent {
    let lower = task.to_lowercase();
    if FOCUSED_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Focused
    } else if EXPLORATORY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Intent::Exploratory
    } else {
        Intent::Exploratory
    }
}

fn most_frequent_language(store: &Store) -> StorageResult<Option<String>> {
    let counts = store.counts_by_language()?;
    Ok(counts.into_iter().max_by_key(|(_, n)| *n).map(|(lang, _)| lang))
}

/// Score directory subpaths appearing in the top results against task
/// tokens; disfavor generated/vendor/build directories.
fn infer_path_hint(task_tokens: &[String], results: &[Node]) -> Option<String> {
    let mut scores: HashMap<String, usize> = HashMap::new();
    for node in results {
        if GENERATED_DIR_MARKERS.iter().any(|m| node.file_path.contains(m)) {
            let wants_generated = task_tokens.iter().any(|t| GENERATED_DIR_MARKERS.iter().any(|m| m.trim_end_matches('/') == t));
            if !wants_generated {
                continue;
            }
        }
        let segments: Vec<&str> = node.file_path.split('/').collect();
        for window in 1..segments.len() {
            let candidate = segments[..window].join("/");
            let hit = task_tokens.iter().any(|t| candidate.to_lowercase().contains(t));
            if hit {
                *scores.entry(candidate).or_default() += 1;
            }
        }
    }
    scores.into_iter().max_by_key(|(_, n)| *n).map(|(path, _)| path)
}

pub fn build_context(
    store: &Store,
    embedder: Option<&dyn Embedder>,
    task: &str,
    opts: &ContextOptions,
) -> StorageResult<TaskContext> {
    let task_tokens = search::tokenize(task);
    let intent = detect_intent(task);

    let inferred_language = opts.language.clone().or(most_frequent_language(store)?);
    let inferred_kind = opts.kind.or(if intent == Intent::Focused { Some(NodeKind::Function) } else { None });

    let mut search_opts = SearchOptions::with_defaults();
    search_opts.limit = (opts.search_limit * 4).max(20);
    search_opts.kinds = inferred_kind.map(|k| vec![k]);
    search_opts.languages = inferred_language.clone().map(|l| vec![l]);
    search_opts.include_files = opts.include_files;

    let initial_results: Vec<Node> = if let Some(embedder) = embedder {
        match vector::search(store, embedder, task, search_opts.limit, search_opts.kinds.as_deref()) {
            Ok(hits) => hits.into_iter().map(|h| h.node).collect(),
            Err(_) => search::search(store, task, &search_opts)?.into_iter().map(|r| r.node).collect(),
        }
    } else {
        search::search(store, task, &search_opts)?.into_iter().map(|r| r.node).collect()
    };

    let inferred_path_hint = opts.path_hint.clone().or_else(|| infer_path_hint(&task_tokens, &initial_results));

    let mut filtered: Vec<Node> = initial_results
        .into_iter()
        .filter(|n| inferred_path_hint.as_ref().map(|h| n.file_path.starts_with(h.as_str())).unwrap_or(true))
        .filter(|n| opts.include_files || n.kind != NodeKind::File)
        .collect();

    filtered.sort_by(|a, b| {
        let sa = reranked_score(a, &task_tokens);
        let sb = reranked_score(b, &task_tokens);
        sb.partial_cmp(&sa).unwrap()
    });
    filtered.retain(|n| reranked_score(n, &task_tokens) >= opts.min_score);

    let entry_points: Vec<Node> = filtered.into_iter().take(opts.search_limit).collect();
    let entry_point_ids: Vec<NodeId> = entry_points.iter().map(|n| n.id.clone()).collect();

    let graph = Graph::new(store);
    let mut nodes: HashMap<NodeId, Node> = HashMap::new();
    let mut edges = Vec::new();
    let mut seen_edges = HashSet::new();

    for entry in &entry_points {
        nodes.insert(entry.id.clone(), entry.clone());
        let subgraph = graph.traverse(
            &entry.id,
            &TraverseOptions {
                max_depth: opts.traversal_depth,
                edge_kinds: None,
                node_kinds: None,
                direction: Direction::Both,
                limit: opts.max_nodes_per_entry_point,
            },
        )?;
        for (id, node) in subgraph.nodes {
            if !opts.include_files && node.kind == NodeKind::File {
                continue;
            }
            if let Some(lang) = &inferred_language {
                if &node.language != lang && node.kind != NodeKind::File {
                    continue;
                }
            }
            nodes.insert(id, node);
        }
        for edge in subgraph.edges {
            if seen_edges.insert(edge.dedup_key()) {
                edges.push(edge);
            }
        }
    }

    trim_to_budget(&mut nodes, &mut edges, &entry_point_ids, opts.max_nodes);

    let code_blocks = if opts.include_code {
        extract_code_blocks(&nodes, &entry_point_ids, opts)
    } else {
        Vec::new()
    };

    let file_count = nodes.values().map(|n| n.file_path.clone()).collect::<HashSet<_>>().len();
    let stats = ContextStats {
        node_count: nodes.len(),
        edge_count: edges.len(),
        file_count,
        code_block_count: code_blocks.len(),
        total_code_size: code_blocks.iter().map(|b| b.code.len()).sum(),
    };

    Ok(TaskContext {
        entry_points: entry_point_ids,
        nodes,
        edges,
        code_blocks,
        stats,
        inferred_kind,
        inferred_language,
        inferred_path_hint,
    })
}

fn reranked_score(node: &Node, task_tokens: &[String]) -> f64 {
    let name_lower = node.name.to_lowercase();
    let token_hits = task_tokens.iter().filter(|t| name_lower.contains(t.as_str())).count();
    let lexical = if task_tokens.is_empty() { 0.0 } else { token_hits as f64 / task_tokens.len() as f64 };
    let bias = match node.kind {
        NodeKind::Function | NodeKind::Method => 0.2,
        NodeKind::Class | NodeKind::Struct | NodeKind::Interface => 0.1,
        _ => 0.0,
    };
    lexical + bias
}

/// Drop nodes beyond `max_nodes`, always preserving entry points and
/// their direct neighbors; prune edges that no longer span retained
/// nodes.
fn trim_to_budget(nodes: &mut HashMap<NodeId, Node>, edges: &mut Vec<crate::node::Edge>, entry_points: &[NodeId], max_nodes: usize) {
    if nodes.len() <= max_nodes {
        edges.retain(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target));
        return;
    }

    let mut keep: HashSet<NodeId> = entry_points.iter().cloned().collect();
    for edge in edges.iter() {
        if keep.len() >= max_nodes {
            break;
        }
        if entry_points.contains(&edge.source) {
            keep.insert(edge.target.clone());
        }
        if entry_points.contains(&edge.target) {
            keep.insert(edge.source.clone());
        }
    }
    // Sorted for determinism: `HashMap` iteration order varies per process,
    // and two runs against identical store state must produce the same context.
    let mut remaining: Vec<&NodeId> = nodes.keys().collect();
    remaining.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    for id in remaining {
        if keep.len() >= max_nodes {
            break;
        }
        keep.insert(id.clone());
    }

    nodes.retain(|id, _| keep.contains(id));
    edges.retain(|e| nodes.contains_key(&e.source) && nodes.contains_key(&e.target));
}

fn extract_code_blocks(
    nodes: &HashMap<NodeId, Node>,
    entry_points: &[NodeId],
    opts: &ContextOptions,
) -> Vec<CodeBlock> {
    let mut ordered: Vec<&Node> = Vec::new();
    for id in entry_points {
        if let Some(n) = nodes.get(id) {
            ordered.push(n);
        }
    }
    let mut rest: Vec<&Node> = nodes
        .values()
        .filter(|n| !entry_points.contains(&n.id))
        .collect();
    rest.sort_by_key(|n| match n.kind {
        NodeKind::Function | NodeKind::Method => 0,
        NodeKind::Class | NodeKind::Struct | NodeKind::Interface | NodeKind::Trait => 1,
        _ => 2,
    });
    ordered.extend(rest);

    let mut blocks = Vec::new();
    let mut files_read: HashMap<String, Option<String>> = HashMap::new();
    for node in ordered {
        if blocks.len() >= opts.max_code_blocks {
            break;
        }
        if matches!(node.kind, NodeKind::File | NodeKind::Import | NodeKind::Export) {
            continue;
        }
        let source = files_read
            .entry(node.file_path.clone())
            .or_insert_with(|| std::fs::read_to_string(&node.file_path).ok());
        let Some(source) = source else { continue };

        let lines: Vec<&str> = source.lines().collect();
        let start = node.range.start_line.saturating_sub(1) as usize;
        let end = (node.range.end_line as usize).min(lines.len());
        if start >= end {
            continue;
        }
        let mut code = lines[start..end].join("\n");
        let mut truncated = false;
        if code.len() > opts.max_code_block_size {
            code.truncate(opts.max_code_block_size);
            code.push_str("\n// … truncated");
            truncated = true;
        }
        blocks.push(CodeBlock { node_id: node.id.clone(), file_path: node.file_path.clone(), start_line: node.range.start_line, end_line: node.range.end_line, code, truncated });
    }
    blocks
}

pub fn to_markdown(ctx: &TaskContext) -> String {
    let mut out = String::new();
    out.push_str("# Task Context\n\n");
    out.push_str(&format!(
        "{} nodes, {} edges, {} files, {} code blocks\n\n",
        ctx.stats.node_count, ctx.stats.edge_count, ctx.stats.file_count, ctx.stats.code_block_count
    ));
    if !ctx.entry_points.is_empty() {
        out.push_str("## Entry points\n\n");
        for id in &ctx.entry_points {
            if let Some(node) = ctx.nodes.get(id) {
                out.push_str(&format!("- `{}` ({}) — {}:{}\n", node.qualified_name, node.kind, node.file_path, node.range.start_line));
            }
        }
        out.push('\n');
    }
    if !ctx.code_blocks.is_empty() {
        out.push_str("## Code\n\n");
        for block in &ctx.code_blocks {
            let marker = if block.truncated { " (truncated)" } else { "" };
            out.push_str(&format!("### {}:{}-{}{marker}\n\n```\n{}\n```\n\n", block.file_path, block.start_line, block.end_line, block.code));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Edge, EdgeMetadata, ExtractionError};
    use crate::parsing::extractor::file_record;
    use crate::types::{EdgeKind, Range};

    fn sample_node(name: &str, file_path: &str, kind: NodeKind) -> Node {
        Node {
            id: NodeId::new(kind, file_path, name, 1),
            kind,
            name: name.to_string(),
            qualified_name: format!("{file_path}::{name}"),
            file_path: file_path.to_string(),
            language: "rust".to_string(),
            range: Range { start_line: 1, start_column: 0, end_line: 2, end_column: 1 },
            docstring: None,
            signature: None,
            visibility: None,
            is_exported: true,
            is_async: false,
            is_static: false,
            is_abstract: false,
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            updated_at: 0,
        }
    }

    #[test]
    fn detect_intent_picks_focused_for_bugfix_tasks() {
        assert_eq!(detect_intent("fix the login bug"), Intent::Focused);
        assert_eq!(detect_intent("understand how auth works"), Intent::Exploratory);
    }

    #[test]
    fn build_context_finds_entry_points_and_stays_under_budget() {
        let store = Store::open_in_memory().unwrap();
        let a = sample_node("loadConfig", "src/config.rs", NodeKind::Function);
        let b = sample_node("saveConfig", "src/config.rs", NodeKind::Function);
        store.upsert_file(&file_record("src/config.rs", "h", "rust", 1, 0, 0, 2, Vec::<ExtractionError>::new()), &[a.clone(), b.clone()], &[], &[]).unwrap();
        store
            .insert_edges(&[Edge { source: a.id.clone(), target: b.id.clone(), kind: EdgeKind::Calls, line: Some(1), column: Some(0), metadata: EdgeMetadata::default() }])
            .unwrap();

        let opts = ContextOptions { max_nodes: 1, ..Default::default() };
        let ctx = build_context(&store, None, "loadConfig", &opts).unwrap();
        assert!(!ctx.entry_points.is_empty());
        assert!(ctx.nodes.len() <= 2);
    }

    #[test]
    fn trim_to_budget_preserves_entry_points() {
        let mut nodes = HashMap::new();
        let entry = NodeId("function:entry".into());
        let extra = NodeId("function:extra".into());
        nodes.insert(entry.clone(), sample_node("entry", "src/a.rs", NodeKind::Function));
        nodes.insert(extra.clone(), sample_node("extra", "src/a.rs", NodeKind::Function));
        let mut edges = Vec::new();
        trim_to_budget(&mut nodes, &mut edges, &[entry.clone()], 1);
        assert!(nodes.contains_key(&entry));
        assert_eq!(nodes.len(), 1);
    }
}
