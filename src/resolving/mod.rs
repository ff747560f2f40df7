//! Converts [`UnresolvedReference`]s into typed edges using a ranked
//! cascade of strategies (spec §4.D). The driver warms three in-memory
//! indices from the whole graph, then splits the reference list across a
//! `rayon` worker pool; workers are pure readers and only the driver
//! writes resolved edges back to the [`crate::storage::Store`].

mod frameworks;

pub use frameworks::Framework;

use crate::node::{Edge, EdgeMetadata, Node, UnresolvedReference};
use crate::storage::Store;
use crate::types::{EdgeKind, NodeId, NodeKind};
use rayon::prelude::*;
use std::collections::HashMap;

/// Built-in / standard-library names considered unresolvable noise
/// rather than a failed lookup (spec §4.D strategy 1).
const BUILTINS: &[&str] = &[
    "println", "print", "format", "vec", "panic", "unwrap", "len", "push", "iter",
    "print", "len", "append", "map", "filter", "range", "str", "int", "list", "dict",
    "console", "log", "Math", "JSON", "Object", "Array", "Promise", "fmt",
    "String", "Vec", "Option", "Result", "Box", "System", "out",
];

pub struct ResolutionIndex {
    pub by_name: HashMap<String, Vec<NodeId>>,
    pub by_qualified_name: HashMap<String, NodeId>,
    pub by_kind: HashMap<NodeKind, Vec<NodeId>>,
    pub by_file: HashMap<String, Vec<NodeId>>,
    /// File path with its extension stripped, for matching an import's
    /// module specifier against a project file regardless of extension.
    pub by_file_stem: HashMap<String, String>,
    pub nodes: HashMap<NodeId, Node>,
}

impl ResolutionIndex {
    pub fn build(store: &Store) -> crate::error::StorageResult<Self> {
        let mut by_name: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut by_qualified_name = HashMap::new();
        let mut by_kind: HashMap<NodeKind, Vec<NodeId>> = HashMap::new();
        let mut by_file: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut by_file_stem: HashMap<String, String> = HashMap::new();
        let mut nodes = HashMap::new();

        for kind in NodeKind::ALL {
            for node in store.get_nodes_by_kind(*kind)? {
                by_name.entry(node.name.clone()).or_default().push(node.id.clone());
                by_qualified_name.insert(node.qualified_name.clone(), node.id.clone());
                by_kind.entry(node.kind).or_default().push(node.id.clone());
                by_file_stem.entry(strip_known_extension(&node.file_path)).or_insert_with(|| node.file_path.clone());
                by_file.entry(node.file_path.clone()).or_default().push(node.id.clone());
                nodes.insert(node.id.clone(), node);
            }
        }

        Ok(ResolutionIndex { by_name, by_qualified_name, by_kind, by_file, by_file_stem, nodes })
    }
}

/// Extension list mirrored from `languages::for_extension`'s supported set.
const SOURCE_EXTENSIONS: &[&str] =
    &["tsx", "ts", "mts", "cts", "jsx", "js", "mjs", "cjs", "pyi", "py", "go", "java", "rs"];

fn strip_known_extension(path: &str) -> String {
    for ext in SOURCE_EXTENSIONS {
        if let Some(stripped) = path.strip_suffix(&format!(".{ext}")) {
            return stripped.to_string();
        }
    }
    path.to_string()
}

/// Group raw import-statement text by the file it was found in, so strategy
/// 3 can turn "this file imports that module" into a file-path guess.
pub fn group_imports_by_file(refs: &[UnresolvedReference]) -> HashMap<String, Vec<String>> {
    let mut by_file: HashMap<String, Vec<String>> = HashMap::new();
    for r in refs {
        if r.reference_kind == EdgeKind::Imports {
            by_file.entry(r.file_path.clone()).or_default().push(r.reference_name.clone());
        }
    }
    by_file
}

/// Pull the module specifier out of an import statement: a quoted path
/// (JS/TS/Go) or a Python dotted relative import (`from .pkg.mod import x`).
fn extract_module_specifier(spec_text: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if let Some(start) = spec_text.find(quote) {
            let rest = &spec_text[start + 1..];
            if let Some(end) = rest.find(quote) {
                return Some(rest[..end].to_string());
            }
        }
    }
    let after_from = spec_text.strip_prefix("from ")?;
    let module = after_from.split(" import").next().unwrap_or(after_from).trim();
    if !module.starts_with('.') {
        return None;
    }
    let dots = module.chars().take_while(|&c| c == '.').count();
    let rest = &module[dots..];
    let prefix = if dots <= 1 { "./".to_string() } else { "../".repeat(dots - 1) };
    Some(format!("{prefix}{}", rest.replace('.', "/")))
}

/// Resolve a relative module specifier (`"./bar"`, `"../lib/bar"`) against
/// `importer_file`'s directory into a path in the project, if one exists.
fn resolve_relative_module(importer_file: &str, module_spec: &str, index: &ResolutionIndex) -> Option<String> {
    if !module_spec.starts_with('.') {
        return None;
    }
    let dir = std::path::Path::new(importer_file).parent().unwrap_or_else(|| std::path::Path::new(""));
    let mut segments: Vec<&str> = dir.to_str().unwrap_or("").split('/').filter(|s| !s.is_empty()).collect();
    for part in module_spec.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    index
        .by_file_stem
        .get(&joined)
        .or_else(|| index.by_file_stem.get(&format!("{joined}/index")))
        .cloned()
}

#[derive(Debug, Clone)]
pub struct ResolvedMatch {
    pub target: NodeId,
    pub confidence: f32,
    pub resolved_by: &'static str,
}

#[derive(Debug, Default, Clone)]
pub struct ResolveStats {
    pub total_processed: usize,
    pub resolved: usize,
    pub skipped_builtin: usize,
    pub unresolved_no_candidates: usize,
    pub unresolved_ambiguous: usize,
}

pub struct ResolvedOutcome {
    pub edges: Vec<Edge>,
    pub stats: ResolveStats,
}

/// Resolve a reference against the warmed indices, trying strategies in
/// order and stopping at first success:
/// 1. builtin filter (above, in the caller)
/// 2. framework-biased resolvers
/// 3. import-path resolution (spec §4.D strategy 3): map the importing
///    file's import specifiers onto a project file and pick the matching
///    exported symbol there, confidence ~0.9
/// 4. project-wide name match
pub fn resolve_one(
    reference: &UnresolvedReference,
    index: &ResolutionIndex,
    frameworks: &[Framework],
    imports_by_file: &HashMap<String, Vec<String>>,
) -> Option<ResolvedMatch> {
    if BUILTINS.contains(&reference.reference_name.as_str()) {
        return None;
    }

    for framework in frameworks {
        if let Some(m) = framework.resolve(reference, index) {
            return Some(m);
        }
    }

    if let Some(m) = resolve_by_import(reference, index, imports_by_file) {
        return Some(m);
    }

    if let Some(m) = resolve_by_name(reference, index) {
        return Some(m);
    }

    None
}

fn resolve_by_import(
    reference: &UnresolvedReference,
    index: &ResolutionIndex,
    imports_by_file: &HashMap<String, Vec<String>>,
) -> Option<ResolvedMatch> {
    let specs = imports_by_file.get(&reference.file_path)?;
    for spec_text in specs {
        let Some(module_spec) = extract_module_specifier(spec_text) else { continue };
        let Some(target_file) = resolve_relative_module(&reference.file_path, &module_spec, index) else { continue };
        let Some(exported) = index.by_file.get(&target_file) else { continue };
        if let Some(target) = exported.iter().find(|id| {
            index.nodes.get(*id).map(|n| n.name == reference.reference_name && n.is_exported).unwrap_or(false)
        }) {
            return Some(ResolvedMatch { target: target.clone(), confidence: 0.9, resolved_by: "import_path" });
        }
    }
    None
}

fn resolve_by_name(reference: &UnresolvedReference, index: &ResolutionIndex) -> Option<ResolvedMatch> {
    let candidates = index.by_name.get(&reference.reference_name)?;
    if candidates.is_empty() {
        return None;
    }

    // Prefer a match in the same file.
    let same_file: Vec<&NodeId> = candidates
        .iter()
        .filter(|id| index.nodes.get(*id).map(|n| n.file_path == reference.file_path).unwrap_or(false))
        .collect();

    let chosen = if let Some(id) = same_file.first() {
        *id
    } else {
        // Prefer same-language, then shortest qualified name.
        candidates
            .iter()
            .min_by_key(|id| {
                let node = index.nodes.get(*id);
                let same_lang = node.map(|n| n.language != reference.language).unwrap_or(true);
                let qn_len = node.map(|n| n.qualified_name.len()).unwrap_or(usize::MAX);
                (same_lang, qn_len)
            })?
    };

    let confidence = if candidates.len() == 1 {
        0.85
    } else {
        (0.85 - 0.05 * (candidates.len() as f32 - 1.0)).max(0.6)
    };

    Some(ResolvedMatch { target: chosen.clone(), confidence, resolved_by: "name_match" })
}

/// Split `refs` into `worker_count` chunks, resolve each chunk
/// independently via rayon, and merge partial results in the driver —
/// the only party permitted to write.
pub fn resolve_all(
    refs: &[UnresolvedReference],
    index: &ResolutionIndex,
    frameworks: &[Framework],
    worker_count: usize,
) -> ResolvedOutcome {
    let imports_by_file = group_imports_by_file(refs);
    let chunk_size = (refs.len() / worker_count.max(1)).max(1);
    let partials: Vec<(Vec<Edge>, ResolveStats)> = refs
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut edges = Vec::new();
            let mut stats = ResolveStats::default();
            for reference in chunk {
                stats.total_processed += 1;
                if BUILTINS.contains(&reference.reference_name.as_str()) {
                    stats.skipped_builtin += 1;
                    continue;
                }
                match resolve_one(reference, index, frameworks, &imports_by_file) {
                    Some(m) => {
                        stats.resolved += 1;
                        edges.push(Edge {
                            source: reference.from_node_id.clone(),
                            target: m.target,
                            kind: reference.reference_kind,
                            line: Some(reference.line),
                            column: Some(reference.column),
                            metadata: EdgeMetadata {
                                resolved_by: Some(m.resolved_by.to_string()),
                                confidence: Some(m.confidence),
                                source: None,
                                scip_occurrences: None,
                            },
                        });
                    }
                    None => {
                        if index.by_name.contains_key(&reference.reference_name) {
                            stats.unresolved_ambiguous += 1;
                        } else {
                            stats.unresolved_no_candidates += 1;
                        }
                    }
                }
            }
            (edges, stats)
        })
        .collect();

    let mut edges = Vec::new();
    let mut stats = ResolveStats::default();
    for (partial_edges, partial_stats) in partials {
        edges.extend(partial_edges);
        stats.total_processed += partial_stats.total_processed;
        stats.resolved += partial_stats.resolved;
        stats.skipped_builtin += partial_stats.skipped_builtin;
        stats.unresolved_no_candidates += partial_stats.unresolved_no_candidates;
        stats.unresolved_ambiguous += partial_stats.unresolved_ambiguous;
    }

    // De-duplicate on (source, target, kind, line, column, metadata) and
    // drop all prior edges for (source, kind) to keep re-resolution
    // idempotent; that deletion happens in the caller against the store.
    let mut seen = std::collections::HashSet::new();
    edges.retain(|e| seen.insert(e.dedup_key()));

    ResolvedOutcome { edges, stats }
}

pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExtractionError;
    use crate::storage::Store;
    use crate::types::Range;

    fn node(name: &str, file: &str, kind: NodeKind) -> Node {
        Node {
            id: NodeId::new(kind, file, name, 1),
            kind,
            name: name.to_string(),
            qualified_name: format!("{file}::{name}"),
            file_path: file.to_string(),
            language: "rust".to_string(),
            range: Range { start_line: 1, start_column: 0, end_line: 2, end_column: 0 },
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
    fn builtin_reference_is_skipped_not_unresolved() {
        let store = Store::open_in_memory().unwrap();
        let index = ResolutionIndex::build(&store).unwrap();
        let reference = UnresolvedReference {
            from_node_id: NodeId("function:x".into()),
            reference_name: "println".into(),
            reference_kind: EdgeKind::Calls,
            line: 1,
            column: 0,
            file_path: "src/a.rs".into(),
            language: "rust".into(),
            candidates: Vec::new(),
        };
        assert!(resolve_one(&reference, &index, &[], &HashMap::new()).is_none());
    }

    #[test]
    fn same_file_candidate_is_preferred_over_other_files() {
        let store = Store::open_in_memory().unwrap();
        let a = node("save", "src/a.rs", NodeKind::Function);
        let b = node("save", "src/b.rs", NodeKind::Function);
        store
            .upsert_file(
                &crate::parsing::extractor::file_record("src/a.rs", "h1", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()),
                &[a.clone()],
                &[],
                &[],
            )
            .unwrap();
        store
            .upsert_file(
                &crate::parsing::extractor::file_record("src/b.rs", "h2", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()),
                &[b.clone()],
                &[],
                &[],
            )
            .unwrap();
        let index = ResolutionIndex::build(&store).unwrap();
        let reference = UnresolvedReference {
            from_node_id: NodeId("function:caller".into()),
            reference_name: "save".into(),
            reference_kind: EdgeKind::Calls,
            line: 1,
            column: 0,
            file_path: "src/a.rs".into(),
            language: "rust".into(),
            candidates: Vec::new(),
        };
        let resolved = resolve_one(&reference, &index, &[], &HashMap::new()).unwrap();
        assert_eq!(resolved.target, a.id);
    }

    #[test]
    fn import_path_strategy_prefers_the_imported_file_over_a_same_named_sibling() {
        let store = Store::open_in_memory().unwrap();
        // Two files export a symbol named `helper`; only src/lib/bar.ts is imported.
        let wanted = node("helper", "src/lib/bar.ts", NodeKind::Function);
        let decoy = node("helper", "src/lib/other.ts", NodeKind::Function);
        store
            .upsert_file(
                &crate::parsing::extractor::file_record("src/lib/bar.ts", "h1", "typescript", 1, 0, 0, 1, Vec::<ExtractionError>::new()),
                &[wanted.clone()],
                &[],
                &[],
            )
            .unwrap();
        store
            .upsert_file(
                &crate::parsing::extractor::file_record("src/lib/other.ts", "h2", "typescript", 1, 0, 0, 1, Vec::<ExtractionError>::new()),
                &[decoy.clone()],
                &[],
                &[],
            )
            .unwrap();
        let index = ResolutionIndex::build(&store).unwrap();

        let import_ref = UnresolvedReference {
            from_node_id: NodeId("function:caller".into()),
            reference_name: "import { helper } from './bar'".into(),
            reference_kind: EdgeKind::Imports,
            line: 1,
            column: 0,
            file_path: "src/lib/main.ts".into(),
            language: "typescript".into(),
            candidates: Vec::new(),
        };
        let imports_by_file = group_imports_by_file(&[import_ref]);

        let call_ref = UnresolvedReference {
            from_node_id: NodeId("function:caller".into()),
            reference_name: "helper".into(),
            reference_kind: EdgeKind::Calls,
            line: 5,
            column: 0,
            file_path: "src/lib/main.ts".into(),
            language: "typescript".into(),
            candidates: Vec::new(),
        };
        let resolved = resolve_one(&call_ref, &index, &[], &imports_by_file).unwrap();
        assert_eq!(resolved.target, wanted.id);
        assert_eq!(resolved.resolved_by, "import_path");
    }

    #[test]
    fn extract_module_specifier_handles_python_relative_imports() {
        assert_eq!(extract_module_specifier("from .bar import helper"), Some("./bar".to_string()));
        assert_eq!(extract_module_specifier("from ..pkg.bar import helper"), Some("../pkg/bar".to_string()));
        assert_eq!(extract_module_specifier("from os import path"), None);
    }

    #[test]
    fn resolve_all_is_idempotent_across_two_runs() {
        let store = Store::open_in_memory().unwrap();
        let a = node("a", "src/a.rs", NodeKind::Function);
        store
            .upsert_file(
                &crate::parsing::extractor::file_record("src/a.rs", "h1", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()),
                &[a.clone()],
                &[],
                &[],
            )
            .unwrap();
        let index = ResolutionIndex::build(&store).unwrap();
        let reference = UnresolvedReference {
            from_node_id: NodeId("function:caller".into()),
            reference_name: "a".into(),
            reference_kind: EdgeKind::Calls,
            line: 5,
            column: 2,
            file_path: "src/caller.rs".into(),
            language: "rust".into(),
            candidates: Vec::new(),
        };
        let run1 = resolve_all(&[reference.clone()], &index, &[], 2);
        let run2 = resolve_all(&[reference], &index, &[], 2);
        assert_eq!(run1.edges.len(), run2.edges.len());
        assert_eq!(run1.edges[0].dedup_key(), run2.edges[0].dedup_key());
    }
}
