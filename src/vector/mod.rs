//! Semantic search over node embeddings (spec §4.G). Shaped after the
//! teacher's `vector::embedding::EmbeddingGenerator` /
//! `create_symbol_text` / `cosine_similarity` names, but the teacher's
//! IVFFlat clustering/engine submodules are absent from this build — this
//! is a brute-force cosine top-k implementation instead (see DESIGN.md).

use crate::error::{VectorError, VectorResult};
use crate::node::{Node, VectorRecord};
use crate::storage::Store;
use crate::types::{NodeId, NodeKind};

/// An opaque embedding capability: text in, fixed-length float vector out.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> VectorResult<Vec<f32>>;
    fn dimension(&self) -> usize;
    fn model_id(&self) -> &str;
}

/// Kinds the default inclusion rule treats as embeddable when they carry
/// a docstring or signature (spec §4.G).
pub fn is_embeddable(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Function
            | NodeKind::Method
            | NodeKind::Class
            | NodeKind::Struct
            | NodeKind::Interface
            | NodeKind::Trait
            | NodeKind::Protocol
            | NodeKind::Route
            | NodeKind::Component
    ) && (node.docstring.is_some() || node.signature.is_some())
}

const SOURCE_LINES_IN_EMBEDDING_TEXT: usize = 5;

/// `name`, `qualifiedName`, `kind`, `signature`, `docstring`, and the
/// first few lines of source when available.
pub fn embedding_text(node: &Node, source: Option<&str>) -> String {
    let mut parts = vec![node.name.clone(), node.qualified_name.clone(), node.kind.as_str().to_string()];
    if let Some(sig) = &node.signature {
        parts.push(sig.clone());
    }
    if let Some(doc) = &node.docstring {
        parts.push(doc.clone());
    }
    if let Some(src) = source {
        let snippet: String = src
            .lines()
            .skip(node.range.start_line.saturating_sub(1) as usize)
            .take(SOURCE_LINES_IN_EMBEDDING_TEXT)
            .collect::<Vec<_>>()
            .join("\n");
        if !snippet.is_empty() {
            parts.push(snippet);
        }
    }
    parts.join("\n")
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Wraps `fastembed::TextEmbedding` the way the teacher's
/// `semantic::simple::SimpleSemanticSearch` does: behind a `Mutex`, since
/// `embed()` takes `&mut self`.
pub struct FastEmbedEmbedder {
    inner: std::sync::Mutex<fastembed::TextEmbedding>,
    dimension: usize,
    model_id: String,
}

impl FastEmbedEmbedder {
    pub fn new() -> VectorResult<Self> {
        Self::with_model(fastembed::EmbeddingModel::AllMiniLML6V2)
    }

    pub fn with_model(model: fastembed::EmbeddingModel) -> VectorResult<Self> {
        let model_id = format!("{model:?}");
        let mut inner = fastembed::TextEmbedding::try_new(fastembed::InitOptions::new(model))
            .map_err(|e| VectorError::ModelDownload { reason: e.to_string() })?;
        let probe = inner
            .embed(vec!["probe"], None)
            .map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
        let dimension = probe.into_iter().next().map(|v| v.len()).unwrap_or(384);
        Ok(FastEmbedEmbedder { inner: std::sync::Mutex::new(inner), dimension, model_id })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn embed(&self, text: &str) -> VectorResult<Vec<f32>> {
        let mut guard = self.inner.lock().map_err(|_| VectorError::EmbedderUnavailable { reason: "embedder mutex poisoned".into() })?;
        let mut out = guard.embed(vec![text], None).map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
        out.pop().ok_or_else(|| VectorError::EmbedderUnavailable { reason: "empty embed result".into() })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Deterministic hash-based fake, for tests and offline builds —
/// mirrors the teacher's `#[cfg(test)] MockEmbeddingGenerator`.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        MockEmbedder { dimension }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> VectorResult<Vec<f32>> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        let values = (0..self.dimension)
            .map(|i| {
                let b = bytes[i % bytes.len()];
                (b as f32 / 255.0) * 2.0 - 1.0
            })
            .collect();
        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

pub struct SimilarityHit {
    pub node: Node,
    pub score: f32,
}

/// Brute-force cosine top-k over every stored vector (spec §4.G: the
/// teacher's IVFFlat clustering is out of scope, see DESIGN.md).
pub fn search(store: &Store, embedder: &dyn Embedder, query_text: &str, limit: usize, kinds: Option<&[NodeKind]>) -> VectorResult<Vec<SimilarityHit>> {
    let query_vector = embedder.embed(query_text)?;
    let vectors = store.all_vectors().map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
    if vectors.is_empty() {
        return Err(VectorError::NoEmbeddings);
    }

    let mut scored: Vec<SimilarityHit> = Vec::new();
    for record in vectors {
        if record.dimension as usize != query_vector.len() {
            continue;
        }
        let Ok(Some(node)) = store.get_node_by_id(&record.node_id) else { continue };
        if let Some(kinds) = kinds {
            if !kinds.contains(&node.kind) {
                continue;
            }
        }
        let score = cosine_similarity(&query_vector, &record.to_f32());
        scored.push(SimilarityHit { node, score });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored.truncate(limit);
    Ok(scored)
}

/// Nearest neighbors of an already-embedded node, excluding itself.
pub fn find_similar(store: &Store, node_id: &NodeId, limit: usize) -> VectorResult<Vec<SimilarityHit>> {
    let anchor = store
        .get_vector(node_id)
        .map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?
        .ok_or(VectorError::NoEmbeddings)?;
    let anchor_values = anchor.to_f32();

    let vectors = store.all_vectors().map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
    let mut scored: Vec<SimilarityHit> = Vec::new();
    for record in vectors {
        if &record.node_id == node_id || record.dimension != anchor.dimension {
            continue;
        }
        let Ok(Some(node)) = store.get_node_by_id(&record.node_id) else { continue };
        let score = cosine_similarity(&anchor_values, &record.to_f32());
        scored.push(SimilarityHit { node, score });
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    scored.truncate(limit);
    Ok(scored)
}

/// Embed every embeddable node not yet vectorized and persist the result.
pub fn embed_missing(store: &Store, embedder: &dyn Embedder) -> VectorResult<usize> {
    let mut embedded = 0;
    for kind in NodeKind::ALL {
        let nodes = store.get_nodes_by_kind(*kind).map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
        for node in nodes {
            if !is_embeddable(&node) {
                continue;
            }
            if store.get_vector(&node.id).map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?.is_some() {
                continue;
            }
            let text = embedding_text(&node, None);
            let values = embedder.embed(&text)?;
            let record = VectorRecord::from_f32(node.id.clone(), embedder.model_id(), &values);
            store.put_vector(&record).map_err(|e| VectorError::EmbedderUnavailable { reason: e.to_string() })?;
            embedded += 1;
        }
    }
    Ok(embedded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExtractionError;
    use crate::parsing::extractor::file_record;
    use crate::types::Range;

    fn sample_node(name: &str) -> Node {
        Node {
            id: NodeId::new(NodeKind::Function, "src/a.rs", name, 1),
            kind: NodeKind::Function,
            name: name.to_string(),
            qualified_name: format!("src/a.rs::{name}"),
            file_path: "src/a.rs".to_string(),
            language: "rust".to_string(),
            range: Range { start_line: 1, start_column: 0, end_line: 3, end_column: 1 },
            docstring: Some("loads configuration from disk".to_string()),
            signature: Some(format!("fn {name}()")),
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
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(16);
        assert_eq!(embedder.embed("hello").unwrap(), embedder.embed("hello").unwrap());
        assert_ne!(embedder.embed("hello").unwrap(), embedder.embed("goodbye").unwrap());
    }

    #[test]
    fn embed_missing_then_search_finds_relevant_node() {
        let store = Store::open_in_memory().unwrap();
        let node = sample_node("loadConfig");
        store
            .upsert_file(&file_record("src/a.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[node.clone()], &[], &[])
            .unwrap();
        let embedder = MockEmbedder::new(16);
        let embedded = embed_missing(&store, &embedder).unwrap();
        assert_eq!(embedded, 1);

        let hits = search(&store, &embedder, "loadConfig", 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.name, "loadConfig");
    }
}
