//! The persistent graph store: a single SQLite database holding nodes,
//! edges, files, unresolved references, vectors, and project metadata,
//! with an FTS5 index mirroring `(name, qualified_name, docstring)`.
//!
//! Grounded in the teacher's `storage::persistence`/`storage::metadata`
//! atomic-write and versioned-metadata idioms, but swaps tantivy+bincode
//! for `rusqlite` so the relational schema and the full-text index live
//! in one transactional handle (see DESIGN.md).

mod cache;
mod schema;

pub use cache::LruCache;

use crate::error::{StorageError, StorageResult};
use crate::node::{
    Edge, EdgeMetadata, ErrorSeverity, ExtractionError, FileRecord, Node, ProjectMetadata,
    UnresolvedReference, VectorRecord,
};
use crate::types::{EdgeKind, NodeId, NodeKind, Range, Visibility};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;

const NODE_CACHE_CAPACITY: usize = 1000;

pub struct Store {
    conn: Mutex<Connection>,
    node_cache: Mutex<LruCache<NodeId, Node>>,
}

impl Store {
    pub fn open(db_path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(db_path)?;
        configure_pragmas(&conn)?;
        schema::migrate(&conn)?;
        Ok(Store { conn: Mutex::new(conn), node_cache: Mutex::new(LruCache::new(NODE_CACHE_CAPACITY)) })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Store { conn: Mutex::new(conn), node_cache: Mutex::new(LruCache::new(NODE_CACHE_CAPACITY)) })
    }

    /// Atomically replace everything derived from `path`: prior nodes,
    /// edges touching them, and unresolved references, then insert the
    /// fresh extraction output and the file record.
    pub fn upsert_file(
        &self,
        file: &FileRecord,
        nodes: &[Node],
        edges: &[Edge],
        unresolved: &[UnresolvedReference],
    ) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let replaced = node_ids_for_file(&tx, &file.path)?;
        delete_file_artifacts(&tx, &file.path)?;
        insert_file_row(&tx, file)?;
        for node in nodes {
            insert_node_row(&tx, node)?;
        }
        for edge in edges {
            insert_edge_row(&tx, edge)?;
        }
        for r in unresolved {
            insert_unresolved_row(&tx, r)?;
        }
        tx.commit()?;
        drop(conn);
        let mut cache = self.node_cache.lock();
        for id in &replaced {
            cache.invalidate(id);
        }
        for node in nodes {
            cache.invalidate(&node.id);
        }
        Ok(())
    }

    pub fn delete_file(&self, path: &str) -> StorageResult<Vec<NodeId>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = node_ids_for_file(&tx, path)?;
        delete_file_artifacts(&tx, path)?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.commit()?;
        drop(conn);
        let mut cache = self.node_cache.lock();
        for id in &removed {
            cache.invalidate(id);
        }
        Ok(removed)
    }

    pub fn get_node_by_id(&self, id: &NodeId) -> StorageResult<Option<Node>> {
        if let Some(node) = self.node_cache.lock().get(id) {
            return Ok(Some(node.clone()));
        }
        let conn = self.conn.lock();
        let node = conn
            .query_row("SELECT * FROM nodes WHERE id = ?1", params![id.as_str()], row_to_node)
            .optional()?;
        drop(conn);
        if let Some(ref n) = node {
            self.node_cache.lock().put(id.clone(), n.clone());
        }
        Ok(node)
    }

    pub fn get_nodes_by_file(&self, file_path: &str) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE file_path = ?1")?;
        let rows = stmt.query_map(params![file_path], row_to_node)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn get_nodes_by_name(&self, name: &str) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE name = ?1")?;
        let rows = stmt.query_map(params![name], row_to_node)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn get_nodes_by_qualified_name(&self, qn: &str) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE qualified_name = ?1")?;
        let rows = stmt.query_map(params![qn], row_to_node)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn get_nodes_by_kind(&self, kind: NodeKind) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE kind = ?1")?;
        let rows = stmt.query_map(params![kind.as_str()], row_to_node)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn all_file_paths(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT path FROM files")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn get_file(&self, path: &str) -> StorageResult<Option<FileRecord>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM files WHERE path = ?1", params![path], row_to_file)
            .optional()
            .map_err(StorageError::from)
    }

    pub fn all_edges(&self) -> StorageResult<Vec<Edge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT source, target, kind, line, column, metadata FROM edges")?;
        let rows = stmt.query_map([], row_to_edge)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn outgoing_edges(&self, source: &NodeId) -> StorageResult<Vec<Edge>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT source, target, kind, line, column, metadata FROM edges WHERE source = ?1")?;
        let rows = stmt.query_map(params![source.as_str()], row_to_edge)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn incoming_edges(&self, target: &NodeId) -> StorageResult<Vec<Edge>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT source, target, kind, line, column, metadata FROM edges WHERE target = ?1")?;
        let rows = stmt.query_map(params![target.as_str()], row_to_edge)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    /// Delete every edge with the given `(source, kind)`, used by the
    /// resolver to keep re-resolution idempotent.
    pub fn delete_edges_from_by_kind(&self, source: &NodeId, kind: EdgeKind) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM edges WHERE source = ?1 AND kind = ?2",
            params![source.as_str(), kind.as_str()],
        )?;
        Ok(())
    }

    /// Delete every edge previously tagged `metadata.source = <source>`, so
    /// a re-import can replace what it created last time without touching
    /// edges the resolver or extractor produced (spec §6.1 "re-import
    /// replaces prior edges tagged with provenance `source="scip"`").
    pub fn delete_edges_with_metadata_source(&self, source: &str) -> StorageResult<usize> {
        let conn = self.conn.lock();
        let pattern = format!("%\"source\":\"{source}\"%");
        let deleted = conn.execute("DELETE FROM edges WHERE metadata LIKE ?1", params![pattern])?;
        Ok(deleted)
    }

    pub fn insert_edges(&self, edges: &[Edge]) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for edge in edges {
            insert_edge_row(&tx, edge)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// One transaction regardless of batch size, per spec §4.A.
    pub fn insert_unresolved_refs_batch(&self, refs: &[UnresolvedReference]) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for r in refs {
            insert_unresolved_row(&tx, r)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn take_all_unresolved(&self) -> StorageResult<Vec<UnresolvedReference>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT from_node_id, reference_name, reference_kind, line, column, file_path, language, candidates FROM unresolved_refs",
        )?;
        let rows = stmt.query_map([], row_to_unresolved)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn clear_unresolved_for_file(&self, file_path: &str) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM unresolved_refs WHERE file_path = ?1", params![file_path])?;
        Ok(())
    }

    pub fn put_vector(&self, vector: &VectorRecord) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO vectors (node_id, dimension, model_id, bytes) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(node_id) DO UPDATE SET dimension = excluded.dimension, model_id = excluded.model_id, bytes = excluded.bytes",
            params![vector.node_id.as_str(), vector.dimension, vector.model_id, vector.bytes],
        )?;
        Ok(())
    }

    pub fn get_vector(&self, node_id: &NodeId) -> StorageResult<Option<VectorRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT node_id, dimension, model_id, bytes FROM vectors WHERE node_id = ?1",
            params![node_id.as_str()],
            |row| {
                Ok(VectorRecord {
                    node_id: NodeId(row.get(0)?),
                    dimension: row.get(1)?,
                    model_id: row.get(2)?,
                    bytes: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn all_vectors(&self) -> StorageResult<Vec<VectorRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT node_id, dimension, model_id, bytes FROM vectors")?;
        let rows = stmt.query_map([], |row| {
            Ok(VectorRecord {
                node_id: NodeId(row.get(0)?),
                dimension: row.get(1)?,
                model_id: row.get(2)?,
                bytes: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn delete_vector(&self, node_id: &NodeId) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM vectors WHERE node_id = ?1", params![node_id.as_str()])?;
        Ok(())
    }

    pub fn get_metadata(&self) -> StorageResult<ProjectMetadata> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, value FROM project_metadata")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut meta = ProjectMetadata::default();
        for pair in rows {
            let (key, value) = pair?;
            match key.as_str() {
                "schema_version" => meta.schema_version = value.parse().unwrap_or(0),
                "first_indexed_version" => meta.first_indexed_version = Some(value),
                "first_indexed_at" => meta.first_indexed_at = value.parse().ok(),
                "last_synced_at" => meta.last_synced_at = value.parse().ok(),
                "last_synced_by_version" => meta.last_synced_by_version = Some(value),
                "last_import_path" => meta.last_import_path = Some(value),
                "last_import_stats" => meta.last_import_stats = serde_json::from_str(&value).ok(),
                _ => {}
            }
        }
        Ok(meta)
    }

    pub fn set_metadata_field(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO project_metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn node_count(&self) -> StorageResult<u64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(StorageError::from)
    }

    pub fn edge_count(&self) -> StorageResult<u64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(StorageError::from)
    }

    pub fn counts_by_kind(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn counts_by_language(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT language, COUNT(*) FROM nodes GROUP BY language")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    /// Raw FTS5 prefix query over `name`/`qualified_name`/`docstring`.
    /// Returns `(node, bm25)` pairs; `bm25` is tantivy-score-shaped (more
    /// negative is better, matching SQLite's FTS5 convention).
    pub fn fts_query(&self, match_expr: &str, fetch_limit: usize) -> StorageResult<Vec<(Node, f64)>> {
        let conn = self.conn.lock();
        let sql = "SELECT n.*, bm25(nodes_fts) AS score FROM nodes_fts
                   JOIN nodes n ON n.rowid = nodes_fts.rowid
                   WHERE nodes_fts MATCH ?1
                   ORDER BY score LIMIT ?2";
        let mut stmt = conn.prepare(sql)?;
        let col_count = stmt.column_count();
        let rows = stmt.query_map(params![match_expr, fetch_limit as i64], move |row| {
            let node = row_to_node(row)?;
            let score: f64 = row.get(col_count - 1)?;
            Ok((node, score))
        });
        match rows {
            Ok(rows) => rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from),
            Err(e) => {
                tracing::warn!("malformed FTS query {match_expr:?}: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// `LIKE`-based fallback: `%q%` on name, `%q%` on qualified_name,
    /// `q%` on name, unioned into one statement.
    pub fn substring_query(&self, escaped: &str, limit: usize) -> StorageResult<Vec<Node>> {
        let conn = self.conn.lock();
        let sql = "SELECT * FROM nodes WHERE name LIKE ?1 ESCAPE '\\'
                   OR qualified_name LIKE ?1 ESCAPE '\\'
                   OR name LIKE ?2 ESCAPE '\\' LIMIT ?3";
        let contains = format!("%{escaped}%");
        let prefix = format!("{escaped}%");
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![contains, prefix, limit as i64], row_to_node)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }
}

fn configure_pragmas(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA cache_size=-65536;
         PRAGMA temp_store=MEMORY;
         PRAGMA mmap_size=268435456;",
    )?;
    Ok(())
}

fn node_ids_for_file(conn: &Connection, path: &str) -> StorageResult<Vec<NodeId>> {
    let mut stmt = conn.prepare("SELECT id FROM nodes WHERE file_path = ?1")?;
    let rows = stmt.query_map(params![path], |r| r.get::<_, String>(0))?;
    Ok(rows.filter_map(|r| r.ok()).map(NodeId).collect())
}

fn delete_file_artifacts(conn: &Connection, path: &str) -> StorageResult<()> {
    conn.execute(
        "DELETE FROM edges WHERE source IN (SELECT id FROM nodes WHERE file_path = ?1)
         OR target IN (SELECT id FROM nodes WHERE file_path = ?1)",
        params![path],
    )?;
    conn.execute("DELETE FROM vectors WHERE node_id IN (SELECT id FROM nodes WHERE file_path = ?1)", params![path])?;
    conn.execute("DELETE FROM nodes WHERE file_path = ?1", params![path])?;
    conn.execute("DELETE FROM unresolved_refs WHERE file_path = ?1", params![path])?;
    Ok(())
}

fn insert_file_row(conn: &Connection, file: &FileRecord) -> StorageResult<()> {
    let errors = serde_json::to_string(&file.errors)?;
    conn.execute(
        "INSERT INTO files (path, content_hash, language, size, modified_at, indexed_at, node_count, errors)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(path) DO UPDATE SET content_hash=excluded.content_hash, language=excluded.language,
            size=excluded.size, modified_at=excluded.modified_at, indexed_at=excluded.indexed_at,
            node_count=excluded.node_count, errors=excluded.errors",
        params![
            file.path,
            file.content_hash,
            file.language,
            file.size,
            file.modified_at,
            file.indexed_at,
            file.node_count,
            errors
        ],
    )?;
    Ok(())
}

fn insert_node_row(conn: &Connection, node: &Node) -> StorageResult<()> {
    let decorators = serde_json::to_string(&node.decorators)?;
    let type_parameters = serde_json::to_string(&node.type_parameters)?;
    conn.execute(
        "INSERT INTO nodes (id, kind, name, qualified_name, file_path, language,
            start_line, start_column, end_line, end_column, docstring, signature, visibility,
            is_exported, is_async, is_static, is_abstract, decorators, type_parameters, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
        params![
            node.id.as_str(),
            node.kind.as_str(),
            node.name,
            node.qualified_name,
            node.file_path,
            node.language,
            node.range.start_line,
            node.range.start_column,
            node.range.end_line,
            node.range.end_column,
            node.docstring,
            node.signature,
            node.visibility.map(|v| v.as_str()),
            node.is_exported,
            node.is_async,
            node.is_static,
            node.is_abstract,
            decorators,
            type_parameters,
            node.updated_at,
        ],
    )?;
    Ok(())
}

fn insert_edge_row(conn: &Connection, edge: &Edge) -> StorageResult<()> {
    let metadata = serde_json::to_string(&edge.metadata)?;
    let dedup_key = edge.dedup_key();
    conn.execute(
        "INSERT OR IGNORE INTO edges (source, target, kind, line, column, metadata, dedup_key)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            edge.source.as_str(),
            edge.target.as_str(),
            edge.kind.as_str(),
            edge.line,
            edge.column,
            metadata,
            dedup_key,
        ],
    )?;
    Ok(())
}

fn insert_unresolved_row(conn: &Connection, r: &UnresolvedReference) -> StorageResult<()> {
    let candidates = serde_json::to_string(&r.candidates)?;
    conn.execute(
        "INSERT INTO unresolved_refs (from_node_id, reference_name, reference_kind, line, column, file_path, language, candidates)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            r.from_node_id.as_str(),
            r.reference_name,
            r.reference_kind.as_str(),
            r.line,
            r.column,
            r.file_path,
            r.language,
            candidates,
        ],
    )?;
    Ok(())
}

/// Tolerant of malformed JSON columns: a parse failure yields an absent
/// field rather than failing the row (spec §4.A failure model, S8).
fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    let kind_str: String = row.get("kind")?;
    let kind = NodeKind::from_str(&kind_str).unwrap_or(NodeKind::Variable);
    let visibility: Option<String> = row.get("visibility")?;
    let decorators_raw: Option<String> = row.get("decorators")?;
    let type_params_raw: Option<String> = row.get("type_parameters")?;

    let decorators = decorators_raw
        .as_deref()
        .and_then(|s| match serde_json::from_str::<Vec<String>>(s) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("malformed decorators JSON, treating as absent: {e}");
                None
            }
        })
        .unwrap_or_default();

    let type_parameters = type_params_raw
        .as_deref()
        .and_then(|s| match serde_json::from_str::<Vec<String>>(s) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("malformed type_parameters JSON, treating as absent: {e}");
                None
            }
        })
        .unwrap_or_default();

    Ok(Node {
        id: NodeId(row.get("id")?),
        kind,
        name: row.get("name")?,
        qualified_name: row.get("qualified_name")?,
        file_path: row.get("file_path")?,
        language: row.get("language")?,
        range: Range {
            start_line: row.get("start_line")?,
            start_column: row.get("start_column")?,
            end_line: row.get("end_line")?,
            end_column: row.get("end_column")?,
        },
        docstring: row.get("docstring")?,
        signature: row.get("signature")?,
        visibility: visibility.and_then(|v| Visibility::from_str_opt(&v)),
        is_exported: row.get("is_exported")?,
        is_async: row.get("is_async")?,
        is_static: row.get("is_static")?,
        is_abstract: row.get("is_abstract")?,
        decorators,
        type_parameters,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    let kind_str: String = row.get("kind")?;
    let metadata_raw: String = row.get("metadata")?;
    let metadata = serde_json::from_str::<EdgeMetadata>(&metadata_raw).unwrap_or_default();
    Ok(Edge {
        source: NodeId(row.get("source")?),
        target: NodeId(row.get("target")?),
        kind: EdgeKind::from_str_opt(&kind_str).unwrap_or(EdgeKind::References),
        line: row.get("line")?,
        column: row.get("column")?,
        metadata,
    })
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let errors_raw: String = row.get("errors")?;
    let errors: Vec<ExtractionError> = serde_json::from_str(&errors_raw).unwrap_or_default();
    Ok(FileRecord {
        path: row.get("path")?,
        content_hash: row.get("content_hash")?,
        language: row.get("language")?,
        size: row.get("size")?,
        modified_at: row.get("modified_at")?,
        indexed_at: row.get("indexed_at")?,
        node_count: row.get("node_count")?,
        errors,
    })
}

fn row_to_unresolved(row: &rusqlite::Row) -> rusqlite::Result<UnresolvedReference> {
    let kind_str: String = row.get(2)?;
    let candidates_raw: String = row.get(7)?;
    Ok(UnresolvedReference {
        from_node_id: NodeId(row.get(0)?),
        reference_name: row.get(1)?,
        reference_kind: EdgeKind::from_str_opt(&kind_str).unwrap_or(EdgeKind::References),
        line: row.get(3)?,
        column: row.get(4)?,
        file_path: row.get(5)?,
        language: row.get(6)?,
        candidates: serde_json::from_str(&candidates_raw).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExtractionError;

    fn sample_node(name: &str, file_path: &str, line: u32) -> Node {
        Node {
            id: NodeId::new(NodeKind::Function, file_path, name, line),
            kind: NodeKind::Function,
            name: name.to_string(),
            qualified_name: format!("{file_path}::{name}"),
            file_path: file_path.to_string(),
            language: "rust".to_string(),
            range: Range { start_line: line, start_column: 0, end_line: line + 2, end_column: 1 },
            docstring: None,
            signature: Some(format!("fn {name}()")),
            visibility: Some(Visibility::Public),
            is_exported: true,
            is_async: false,
            is_static: false,
            is_abstract: false,
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            updated_at: 0,
        }
    }

    fn sample_file(path: &str, hash: &str, node_count: u32) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            content_hash: hash.to_string(),
            language: "rust".to_string(),
            size: 10,
            modified_at: 0,
            indexed_at: 0,
            node_count,
            errors: Vec::<ExtractionError>::new(),
        }
    }

    #[test]
    fn upsert_then_get_node_by_id() {
        let store = Store::open_in_memory().unwrap();
        let node = sample_node("hello", "src/a.rs", 1);
        store.upsert_file(&sample_file("src/a.rs", "h1", 1), &[node.clone()], &[], &[]).unwrap();
        let fetched = store.get_node_by_id(&node.id).unwrap().unwrap();
        assert_eq!(fetched.name, "hello");
    }

    #[test]
    fn delete_file_cascades_nodes_and_edges() {
        let store = Store::open_in_memory().unwrap();
        let a = sample_node("a", "src/a.rs", 1);
        let b = sample_node("b", "src/b.rs", 1);
        let edge = Edge {
            source: b.id.clone(),
            target: a.id.clone(),
            kind: EdgeKind::Calls,
            line: Some(2),
            column: Some(0),
            metadata: EdgeMetadata::default(),
        };
        store.upsert_file(&sample_file("src/a.rs", "h1", 1), &[a.clone()], &[], &[]).unwrap();
        store.upsert_file(&sample_file("src/b.rs", "h2", 1), &[b.clone()], &[edge], &[]).unwrap();
        assert_eq!(store.all_edges().unwrap().len(), 1);

        store.delete_file("src/a.rs").unwrap();
        assert!(store.get_node_by_id(&a.id).unwrap().is_none());
        assert_eq!(store.all_edges().unwrap().len(), 0, "edges touching a deleted node must be removed");
    }

    #[test]
    fn reupserting_same_file_replaces_prior_artifacts() {
        let store = Store::open_in_memory().unwrap();
        let old = sample_node("hello", "src/x.rs", 1);
        store.upsert_file(&sample_file("src/x.rs", "h1", 1), &[old.clone()], &[], &[]).unwrap();
        let new = sample_node("goodbye", "src/x.rs", 1);
        store.upsert_file(&sample_file("src/x.rs", "h2", 1), &[new.clone()], &[], &[]).unwrap();

        assert!(store.get_node_by_id(&old.id).unwrap().is_none());
        assert!(store.get_node_by_id(&new.id).unwrap().is_some());
    }

    #[test]
    fn duplicate_edges_are_not_inserted_twice() {
        let store = Store::open_in_memory().unwrap();
        let a = sample_node("a", "src/a.rs", 1);
        let b = sample_node("b", "src/b.rs", 1);
        store.upsert_file(&sample_file("src/a.rs", "h1", 1), &[a.clone()], &[], &[]).unwrap();
        store.upsert_file(&sample_file("src/b.rs", "h2", 1), &[b.clone()], &[], &[]).unwrap();
        let edge = Edge {
            source: b.id.clone(),
            target: a.id.clone(),
            kind: EdgeKind::Calls,
            line: Some(2),
            column: Some(0),
            metadata: EdgeMetadata::default(),
        };
        store.insert_edges(&[edge.clone(), edge.clone()]).unwrap();
        assert_eq!(store.all_edges().unwrap().len(), 1);
    }

    #[test]
    fn deleting_a_file_removes_its_vectors() {
        let store = Store::open_in_memory().unwrap();
        let node = sample_node("hello", "src/a.rs", 1);
        store.upsert_file(&sample_file("src/a.rs", "h1", 1), &[node.clone()], &[], &[]).unwrap();
        store.put_vector(&VectorRecord::from_f32(node.id.clone(), "mock", &[0.1, 0.2])).unwrap();
        assert_eq!(store.all_vectors().unwrap().len(), 1);

        store.delete_file("src/a.rs").unwrap();
        assert!(store.all_vectors().unwrap().is_empty(), "vector rows must not outlive their node");
    }

    #[test]
    fn reupserting_a_file_invalidates_cached_nodes_removed_from_it() {
        let store = Store::open_in_memory().unwrap();
        let old = sample_node("hello", "src/x.rs", 1);
        store.upsert_file(&sample_file("src/x.rs", "h1", 1), &[old.clone()], &[], &[]).unwrap();
        // Warm the cache for the node that's about to disappear from src/x.rs.
        store.get_node_by_id(&old.id).unwrap();

        let new = sample_node("goodbye", "src/x.rs", 1);
        store.upsert_file(&sample_file("src/x.rs", "h2", 1), &[new.clone()], &[], &[]).unwrap();

        assert!(store.get_node_by_id(&old.id).unwrap().is_none(), "stale cache entry must not survive re-ingest");
    }

    #[test]
    fn fts_query_finds_inserted_node_by_name() {
        let store = Store::open_in_memory().unwrap();
        let node = sample_node("configLoader", "src/a.rs", 1);
        store.upsert_file(&sample_file("src/a.rs", "h1", 1), &[node.clone()], &[], &[]).unwrap();
        let results = store.fts_query("\"configLoader\"*", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.name, "configLoader");
    }
}
