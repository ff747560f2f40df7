//! Lexical search over nodes with deterministic ranking (spec §4.F).
//! Ported from the teacher's `storage/tantivy.rs` prefix/fallback/re-rank
//! cascade onto FTS5: `bm25()` stands in for tantivy's score.

use crate::error::StorageResult;
use crate::node::Node;
use crate::storage::Store;
use crate::types::NodeKind;
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "for", "and", "or", "is", "it", "that", "this",
];

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub kinds: Option<Vec<NodeKind>>,
    pub languages: Option<Vec<String>>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub limit: usize,
    pub offset: usize,
    pub include_files: bool,
}

impl SearchOptions {
    pub fn with_defaults() -> Self {
        SearchOptions { limit: 20, offset: 0, ..Default::default() }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub node: Node,
    pub final_score: f64,
    pub lexical: f64,
    pub kind_boost: f64,
    pub bm25: Option<f64>,
}

/// Tokenize, drop stop words and short tokens, de-duplicate while
/// preserving first-seen order.
pub fn tokenize(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for raw in lower.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 2 || STOP_WORDS.contains(&raw) {
            continue;
        }
        if seen.insert(raw.to_string()) {
            tokens.push(raw.to_string());
        }
    }
    tokens
}

/// `/`, `\`, or a trailing dot-extension token signal the caller wants a
/// file, not a symbol.
pub fn is_file_intent(query: &str) -> bool {
    if query.contains('/') || query.contains('\\') {
        return true;
    }
    query
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .map(|tail| tail.contains('.') && tail.rsplit('.').next().map(|ext| !ext.is_empty() && ext.len() <= 5).unwrap_or(false))
        .unwrap_or(false)
}

fn glob_to_like(pattern: &str) -> String {
    let mut out = String::new();
    for c in pattern.chars() {
        match c {
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '*' => out.push('%'),
            '?' => out.push('_'),
            other => out.push(other),
        }
    }
    out
}

pub fn search(store: &Store, query: &str, opts: &SearchOptions) -> StorageResult<Vec<SearchResult>> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let file_intent = is_file_intent(query);
    let fetch_limit = 5 * (opts.limit + opts.offset).max(1);

    let candidates = fts_candidates(store, &tokens, fetch_limit)?;
    let candidates = if candidates.is_empty() && query.len() >= 2 {
        let escaped = glob_to_like(query);
        store.substring_query(&escaped, fetch_limit)?.into_iter().map(|n| (n, None)).collect::<Vec<_>>()
    } else {
        candidates
    };

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|(node, _)| passes_filters(node, opts, file_intent))
        .map(|(node, bm25)| score(node, &tokens, bm25, file_intent))
        .collect();

    results.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap()
            .then(b.lexical.partial_cmp(&a.lexical).unwrap())
            .then(b.kind_boost.partial_cmp(&a.kind_boost).unwrap())
            .then_with(|| {
                let ab = a.bm25.unwrap_or(0.0);
                let bb = b.bm25.unwrap_or(0.0);
                ab.partial_cmp(&bb).unwrap()
            })
            .then_with(|| a.node.name.len().cmp(&b.node.name.len()))
    });

    Ok(results.into_iter().skip(opts.offset).take(opts.limit).collect())
}

fn fts_candidates(store: &Store, tokens: &[String], fetch_limit: usize) -> StorageResult<Vec<(Node, Option<f64>)>> {
    let and_expr = tokens.iter().map(|t| format!("\"{t}\"*")).collect::<Vec<_>>().join(" AND ");
    let mut rows = store.fts_query(&and_expr, fetch_limit)?;
    if rows.is_empty() && tokens.len() > 1 {
        let or_expr = tokens.iter().map(|t| format!("\"{t}\"*")).collect::<Vec<_>>().join(" OR ");
        rows = store.fts_query(&or_expr, fetch_limit)?;
    }
    Ok(rows.drain(..).map(|(n, score)| (n, Some(score))).collect())
}

fn passes_filters(node: &Node, opts: &SearchOptions, file_intent: bool) -> bool {
    if node.kind == NodeKind::File && !file_intent && !opts.include_files {
        return false;
    }
    if let Some(kinds) = &opts.kinds {
        if !kinds.contains(&node.kind) {
            return false;
        }
    }
    if let Some(languages) = &opts.languages {
        if !languages.iter().any(|l| l == &node.language) {
            return false;
        }
    }
    if let Some(includes) = &opts.include_patterns {
        if !includes.iter().any(|p| glob_match(p, &node.file_path)) {
            return false;
        }
    }
    if let Some(excludes) = &opts.exclude_patterns {
        if excludes.iter().any(|p| glob_match(p, &node.file_path)) {
            return false;
        }
    }
    true
}

fn glob_match(pattern: &str, path: &str) -> bool {
    globset::Glob::new(pattern).map(|g| g.compile_matcher().is_match(path)).unwrap_or(false)
}

fn term_score(term: &str, node: &Node) -> f64 {
    let name_lower = node.name.to_lowercase();
    let file_lower = node.file_path.to_lowercase();
    let qn_lower = node.qualified_name.to_lowercase();

    if name_lower == term {
        1.0
    } else if name_lower.starts_with(term) || file_lower.rsplit('/').next().unwrap_or("").starts_with(term) {
        0.92
    } else if name_lower.contains(term) || file_lower.contains(term) {
        0.85
    } else if file_lower.split('/').any(|seg| seg == term) {
        0.82
    } else if qn_lower.contains(term) {
        0.7
    } else {
        0.2
    }
}

fn lexical_score(tokens: &[String], node: &Node) -> f64 {
    let scores: Vec<f64> = tokens.iter().map(|t| term_score(t, node)).collect();
    let matched = scores.iter().filter(|s| **s > 0.2).count();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let coverage = matched as f64 / tokens.len() as f64;
    mean * 0.75 + coverage * 0.25
}

fn kind_boost(kind: NodeKind, file_intent: bool) -> f64 {
    match kind {
        NodeKind::Function | NodeKind::Method => 1.0,
        NodeKind::Component => 0.85,
        NodeKind::Class | NodeKind::Struct | NodeKind::Interface | NodeKind::Trait | NodeKind::Protocol | NodeKind::Enum => 0.75,
        NodeKind::Module | NodeKind::Namespace => 0.5,
        NodeKind::File => {
            if file_intent {
                0.95
            } else {
                0.2
            }
        }
        _ => 0.4,
    }
}

fn score(node: Node, tokens: &[String], bm25: Option<f64>, file_intent: bool) -> SearchResult {
    let lexical = lexical_score(tokens, &node);
    let boost = kind_boost(node.kind, file_intent);
    let (final_score, bm25_norm) = match bm25 {
        Some(b) => (0.55 * lexical + 0.25 * boost + 0.20 * (1.0 / (1.0 + b.abs())), Some(b)),
        None => (0.80 * lexical + 0.20 * boost, None),
    };
    SearchResult { node, final_score, lexical, kind_boost: boost, bm25: bm25_norm }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExtractionError;
    use crate::parsing::extractor::file_record;
    use crate::types::Range;

    fn sample_node(name: &str, file_path: &str, kind: NodeKind) -> Node {
        Node {
            id: crate::types::NodeId::new(kind, file_path, name, 1),
            kind,
            name: name.to_string(),
            qualified_name: format!("{file_path}::{name}"),
            file_path: file_path.to_string(),
            language: "rust".to_string(),
            range: Range { start_line: 1, start_column: 0, end_line: 3, end_column: 1 },
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
    fn tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("the Config Loader of a");
        assert_eq!(tokens, vec!["config".to_string(), "loader".to_string()]);
    }

    #[test]
    fn file_intent_detects_path_separators_and_extensions() {
        assert!(is_file_intent("src/main.rs"));
        assert!(is_file_intent("main.rs"));
        assert!(!is_file_intent("configLoader"));
    }

    #[test]
    fn search_finds_exact_name_match_and_excludes_files_by_default() {
        let store = Store::open_in_memory().unwrap();
        let func = sample_node("configLoader", "src/a.rs", NodeKind::Function);
        store
            .upsert_file(&file_record("src/a.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[func.clone()], &[], &[])
            .unwrap();
        let results = search(&store, "configLoader", &SearchOptions::with_defaults()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.name, "configLoader");
        assert!(results[0].lexical > 0.9);
    }

    #[test]
    fn search_excludes_file_nodes_unless_file_intent_or_include_files() {
        let store = Store::open_in_memory().unwrap();
        let file_node = sample_node("main.rs", "src/main.rs", NodeKind::File);
        store
            .upsert_file(&file_record("src/main.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[file_node], &[], &[])
            .unwrap();
        let results = search(&store, "main", &SearchOptions::with_defaults()).unwrap();
        assert!(results.is_empty());
    }
}
