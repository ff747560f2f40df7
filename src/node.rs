//! Record types persisted by the [`crate::storage`] layer.

use crate::types::{EdgeKind, NodeId, NodeKind, Range, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub language: String,
    pub range: Range,
    pub docstring: Option<String>,
    pub signature: Option<String>,
    pub visibility: Option<Visibility>,
    pub is_exported: bool,
    pub is_async: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub decorators: Vec<String>,
    pub type_parameters: Vec<String>,
    pub updated_at: u64,
}

impl Node {
    /// `"<filePath>::<parent-names>::<name>"`.
    pub fn build_qualified_name(file_path: &str, parent_names: &[String], name: &str) -> String {
        let mut parts = vec![file_path.to_string()];
        parts.extend(parent_names.iter().cloned());
        parts.push(name.to_string());
        parts.join("::")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub resolved_by: Option<String>,
    pub confidence: Option<f32>,
    pub source: Option<String>,
    pub scip_occurrences: Option<u32>,
}

impl Default for EdgeMetadata {
    fn default() -> Self {
        EdgeMetadata { resolved_by: None, confidence: None, source: None, scip_occurrences: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub metadata: EdgeMetadata,
}

impl Edge {
    /// De-duplication key: `(source, target, kind, line, column, metadataJSON)`.
    pub fn dedup_key(&self) -> String {
        let meta = serde_json::to_string(&self.metadata).unwrap_or_default();
        format!(
            "{}|{}|{}|{:?}|{:?}|{}",
            self.source, self.target, self.kind, self.line, self.column, meta
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content_hash: String,
    pub language: String,
    pub size: u64,
    pub modified_at: u64,
    pub indexed_at: u64,
    pub node_count: u32,
    pub errors: Vec<ExtractionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionError {
    pub message: String,
    pub severity: ErrorSeverity,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Error,
    Warning,
}

/// A textual reference captured by the Extractor; lives only between
/// extraction and resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub from_node_id: NodeId,
    pub reference_name: String,
    pub reference_kind: EdgeKind,
    pub line: u32,
    pub column: u32,
    pub file_path: String,
    pub language: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub node_id: NodeId,
    pub dimension: u32,
    pub model_id: String,
    pub bytes: Vec<u8>,
}

impl VectorRecord {
    pub fn from_f32(node_id: NodeId, model_id: impl Into<String>, values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        VectorRecord { node_id, dimension: values.len() as u32, model_id: model_id.into(), bytes }
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub schema_version: u32,
    pub first_indexed_version: Option<String>,
    pub first_indexed_at: Option<u64>,
    pub last_synced_at: Option<u64>,
    pub last_synced_by_version: Option<String>,
    pub last_import_path: Option<String>,
    pub last_import_stats: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_joins_file_parents_and_name() {
        let qn = Node::build_qualified_name("src/a.rs", &["Foo".into()], "bar");
        assert_eq!(qn, "src/a.rs::Foo::bar");
    }

    #[test]
    fn vector_record_round_trips_through_bytes() {
        let values = vec![0.5f32, -1.25, 3.0];
        let rec = VectorRecord::from_f32(NodeId("function:x".into()), "mock", &values);
        assert_eq!(rec.to_f32(), values);
    }
}
