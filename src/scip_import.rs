//! Imports a JSON file of semantic occurrences shaped after SCIP's
//! `Index`/`Document`/`Occurrence` model: a flat array of documents, each
//! carrying the occurrences found in that file. Two passes turn those
//! occurrences into graph edges:
//!
//! 1. every definition occurrence (`symbol_roles & ROLE_DEFINITION`) is
//!    mapped to the smallest node in that document whose range contains it;
//! 2. every occurrence carrying `ROLE_IMPORT` is resolved to its enclosing
//!    node (the edge source) and, via the symbol mapped in pass 1, to its
//!    target node; a `references` or `imports` edge is created between them.
//!
//! Input ranges follow SCIP's convention: 0-based lines, half-open columns,
//! either `[line, startCol, endCol]` (single line) or
//! `[startLine, startCol, endLine, endCol]`.

use crate::error::{ErrorContext, IndexError, IndexResult};
use crate::node::{Edge, EdgeMetadata, Node};
use crate::storage::Store;
use crate::types::{EdgeKind, NodeId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const ROLE_DEFINITION: i32 = 1;
const ROLE_IMPORT: i32 = 2;
const PROVENANCE: &str = "scip";

#[derive(Debug, Deserialize)]
struct ScipIndexFile {
    documents: Vec<ScipDocument>,
}

#[derive(Debug, Deserialize)]
struct ScipDocument {
    relative_path: String,
    occurrences: Vec<ScipOccurrence>,
}

#[derive(Debug, Deserialize)]
struct ScipOccurrence {
    symbol: String,
    range: Vec<i64>,
    symbol_roles: i32,
}

/// A parsed occurrence range, converted to this crate's 1-based-line
/// convention (columns stay 0-based, already matching SCIP's).
#[derive(Debug, Clone, Copy)]
struct OccurrenceSpan {
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

impl OccurrenceSpan {
    fn from_scip_range(range: &[i64]) -> Option<Self> {
        match range {
            [line, start_col, end_col] => Some(OccurrenceSpan {
                start_line: (*line + 1).max(1) as u32,
                start_column: (*start_col).max(0) as u32,
                end_line: (*line + 1).max(1) as u32,
                end_column: (*end_col).max(0) as u32,
            }),
            [start_line, start_col, end_line, end_col] => Some(OccurrenceSpan {
                start_line: (*start_line + 1).max(1) as u32,
                start_column: (*start_col).max(0) as u32,
                end_line: (*end_line + 1).max(1) as u32,
                end_column: (*end_col).max(0) as u32,
            }),
            _ => None,
        }
    }

    fn contains_start_of(&self, other: &OccurrenceSpan) -> bool {
        if other.start_line < self.start_line || other.start_line > self.end_line {
            return false;
        }
        if other.start_line == self.start_line && other.start_column < self.start_column {
            return false;
        }
        if other.start_line == self.end_line && other.start_column > self.end_column {
            return false;
        }
        true
    }

    fn area(&self) -> u64 {
        (self.end_line as u64 - self.start_line as u64) * 100_000
            + self.end_column as u64
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct ScipImportStats {
    pub documents: usize,
    pub definitions_mapped: usize,
    pub definitions_unmapped: usize,
    pub edges_created: usize,
    pub edges_replaced: usize,
}

/// Read, parse and apply a SCIP-shaped JSON file against `store`, returning
/// the resulting edge counts. Re-running against the same store first
/// removes every edge this importer created previously.
pub fn import_file(store: &Store, path: &Path) -> IndexResult<ScipImportStats> {
    let raw = std::fs::read_to_string(path).with_path(path)?;
    let index: ScipIndexFile =
        serde_json::from_str(&raw).map_err(|e| IndexError::General(format!("invalid SCIP JSON in {}: {e}", path.display())))?;

    let replaced = store.delete_edges_with_metadata_source(PROVENANCE)?;

    let mut stats = ScipImportStats { documents: index.documents.len(), edges_replaced: replaced, ..Default::default() };
    let mut new_edges: Vec<Edge> = Vec::new();

    for document in &index.documents {
        let nodes = store.get_nodes_by_file(&document.relative_path).context("loading nodes for SCIP document")?;
        if nodes.is_empty() {
            continue;
        }

        let mut symbol_targets: HashMap<&str, NodeId> = HashMap::new();
        for occurrence in &document.occurrences {
            if occurrence.symbol_roles & ROLE_DEFINITION == 0 {
                continue;
            }
            let Some(span) = OccurrenceSpan::from_scip_range(&occurrence.range) else { continue };
            match smallest_containing_node(&nodes, &span) {
                Some(node) => {
                    symbol_targets.insert(&occurrence.symbol, node.id.clone());
                    stats.definitions_mapped += 1;
                }
                None => stats.definitions_unmapped += 1,
            }
        }

        for occurrence in &document.occurrences {
            if occurrence.symbol_roles & ROLE_IMPORT == 0 {
                continue;
            }
            let Some(span) = OccurrenceSpan::from_scip_range(&occurrence.range) else { continue };
            let Some(target) = symbol_targets.get(occurrence.symbol.as_str()) else { continue };
            let Some(source_node) = smallest_containing_node(&nodes, &span) else { continue };
            if &source_node.id == target {
                continue;
            }
            let kind = if source_node.file_path == document.relative_path
                && nodes.iter().any(|n| &n.id == target && n.file_path == document.relative_path)
            {
                EdgeKind::References
            } else {
                EdgeKind::Imports
            };
            new_edges.push(Edge {
                source: source_node.id.clone(),
                target: target.clone(),
                kind,
                line: Some(span.start_line),
                column: Some(span.start_column),
                metadata: EdgeMetadata { source: Some(PROVENANCE.to_string()), ..Default::default() },
            });
        }
    }

    let deduped = dedup_and_count(new_edges);
    stats.edges_created = deduped.len();
    store.insert_edges(&deduped)?;

    let stats_json = serde_json::to_string(&stats).unwrap_or_default();
    store.set_metadata_field("last_import_path", &path.display().to_string())?;
    store.set_metadata_field("last_import_stats", &stats_json)?;

    Ok(stats)
}

/// Collapse edges sharing `(source, target, kind)` into one, counting how
/// many occurrences backed it in `metadata.scip_occurrences`.
fn dedup_and_count(edges: Vec<Edge>) -> Vec<Edge> {
    let mut merged: HashMap<(NodeId, NodeId, EdgeKind), Edge> = HashMap::new();
    for edge in edges {
        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        merged
            .entry(key)
            .and_modify(|existing| {
                let count = existing.metadata.scip_occurrences.unwrap_or(1) + 1;
                existing.metadata.scip_occurrences = Some(count);
            })
            .or_insert_with(|| {
                let mut e = edge;
                e.metadata.scip_occurrences = Some(1);
                e
            });
    }
    let mut result: Vec<Edge> = merged.into_values().collect();
    result.sort_by(|a, b| a.source.as_str().cmp(b.source.as_str()).then(a.target.as_str().cmp(b.target.as_str())));
    result
}

fn smallest_containing_node<'a>(nodes: &'a [Node], span: &OccurrenceSpan) -> Option<&'a Node> {
    nodes
        .iter()
        .filter(|n| {
            let node_span = OccurrenceSpan {
                start_line: n.range.start_line,
                start_column: n.range.start_column,
                end_line: n.range.end_line,
                end_column: n.range.end_column,
            };
            node_span.contains_start_of(span)
        })
        .min_by_key(|n| {
            let node_span = OccurrenceSpan {
                start_line: n.range.start_line,
                start_column: n.range.start_column,
                end_line: n.range.end_line,
                end_column: n.range.end_column,
            };
            node_span.area()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Edge, EdgeMetadata, FileRecord, Node};
    use crate::types::{NodeKind, Range};

    fn node(id: &str, file_path: &str, name: &str, start_line: u32, end_line: u32) -> Node {
        Node {
            id: NodeId(id.to_string()),
            kind: NodeKind::Function,
            name: name.to_string(),
            qualified_name: format!("{file_path}::{name}"),
            file_path: file_path.to_string(),
            language: "python".to_string(),
            range: Range { start_line, start_column: 0, end_line, end_column: 0 },
            docstring: None,
            signature: None,
            visibility: None,
            is_exported: true,
            is_async: false,
            is_static: false,
            is_abstract: false,
            decorators: vec![],
            type_parameters: vec![],
            updated_at: 0,
        }
    }

    fn file(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            content_hash: "h".into(),
            language: "python".into(),
            size: 0,
            modified_at: 0,
            indexed_at: 0,
            node_count: 1,
            errors: vec![],
        }
    }

    #[test]
    fn occurrence_span_converts_zero_based_single_line_range() {
        let span = OccurrenceSpan::from_scip_range(&[4, 2, 10]).unwrap();
        assert_eq!(span.start_line, 5);
        assert_eq!(span.end_line, 5);
        assert_eq!(span.start_column, 2);
        assert_eq!(span.end_column, 10);
    }

    #[test]
    fn occurrence_span_converts_zero_based_multiline_range() {
        let span = OccurrenceSpan::from_scip_range(&[0, 0, 2, 5]).unwrap();
        assert_eq!(span.start_line, 1);
        assert_eq!(span.end_line, 3);
    }

    #[test]
    fn import_creates_reference_edge_between_mapped_definitions() {
        let store = Store::open_in_memory().unwrap();
        let caller = node("function:caller", "a.py", "caller", 1, 3);
        let callee = node("function:callee", "a.py", "callee", 5, 7);
        store.upsert_file(&file("a.py"), &[caller.clone(), callee.clone()], &[], &[]).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let import_path = dir.path().join("index.json");
        std::fs::write(
            &import_path,
            serde_json::json!({
                "documents": [{
                    "relative_path": "a.py",
                    "occurrences": [
                        { "symbol": "a.py`callee`", "range": [5, 0, 5, 6], "symbol_roles": 1 },
                        { "symbol": "a.py`callee`", "range": [1, 4, 1, 10], "symbol_roles": 2 }
                    ]
                }]
            })
            .to_string(),
        )
        .unwrap();

        let stats = import_file(&store, &import_path).unwrap();
        assert_eq!(stats.edges_created, 1);

        let edges = store.outgoing_edges(&caller.id).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, callee.id);
        assert_eq!(edges[0].metadata.source.as_deref(), Some("scip"));
        assert_eq!(edges[0].metadata.scip_occurrences, Some(1));
    }

    #[test]
    fn repeated_import_occurrences_increment_the_occurrence_counter() {
        let store = Store::open_in_memory().unwrap();
        let caller = node("function:caller", "a.py", "caller", 1, 10);
        let callee = node("function:callee", "a.py", "callee", 20, 22);
        store.upsert_file(&file("a.py"), &[caller.clone(), callee.clone()], &[], &[]).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let import_path = dir.path().join("index.json");
        std::fs::write(
            &import_path,
            serde_json::json!({
                "documents": [{
                    "relative_path": "a.py",
                    "occurrences": [
                        { "symbol": "a.py`callee`", "range": [20, 0, 20, 6], "symbol_roles": 1 },
                        { "symbol": "a.py`callee`", "range": [2, 4, 2, 10], "symbol_roles": 2 },
                        { "symbol": "a.py`callee`", "range": [5, 4, 5, 10], "symbol_roles": 2 }
                    ]
                }]
            })
            .to_string(),
        )
        .unwrap();

        let stats = import_file(&store, &import_path).unwrap();
        assert_eq!(stats.edges_created, 1);
        let edges = store.outgoing_edges(&caller.id).unwrap();
        assert_eq!(edges[0].metadata.scip_occurrences, Some(2));
    }

    #[test]
    fn reimport_replaces_prior_scip_edges_but_not_others() {
        let store = Store::open_in_memory().unwrap();
        let caller = node("function:caller", "a.py", "caller", 1, 3);
        let callee = node("function:callee", "a.py", "callee", 5, 7);
        store.upsert_file(&file("a.py"), &[caller.clone(), callee.clone()], &[], &[]).unwrap();

        store
            .insert_edges(&[Edge {
                source: caller.id.clone(),
                target: callee.id.clone(),
                kind: EdgeKind::Calls,
                line: Some(2),
                column: Some(0),
                metadata: EdgeMetadata::default(),
            }])
            .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let import_path = dir.path().join("index.json");
        let body = serde_json::json!({
            "documents": [{
                "relative_path": "a.py",
                "occurrences": [
                    { "symbol": "a.py`callee`", "range": [5, 0, 5, 6], "symbol_roles": 1 },
                    { "symbol": "a.py`callee`", "range": [1, 4, 1, 10], "symbol_roles": 2 }
                ]
            }]
        })
        .to_string();
        std::fs::write(&import_path, &body).unwrap();

        import_file(&store, &import_path).unwrap();
        let second = import_file(&store, &import_path).unwrap();
        assert_eq!(second.edges_replaced, 1);

        let edges = store.outgoing_edges(&caller.id).unwrap();
        assert_eq!(edges.len(), 2, "the hand-inserted `calls` edge must survive re-import: {edges:?}");
        assert!(edges.iter().any(|e| e.kind == EdgeKind::Calls && e.metadata.source.is_none()));
        assert_eq!(edges.iter().filter(|e| e.metadata.source.as_deref() == Some("scip")).count(), 1);
    }

    #[test]
    fn import_updates_project_metadata_provenance() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let import_path = dir.path().join("index.json");
        std::fs::write(&import_path, serde_json::json!({ "documents": [] }).to_string()).unwrap();

        import_file(&store, &import_path).unwrap();
        let meta = store.get_metadata().unwrap();
        assert_eq!(meta.last_import_path, Some(import_path.display().to_string()));
        assert!(meta.last_import_stats.is_some());
    }
}
