//! Pure, read-only query layer over the [`Store`] (spec §4.E). Bounded
//! BFS traversal is grounded directly in the teacher's
//! `storage::graph::DependencyGraph`, generalized from `SymbolId`-only
//! weights to full node/edge payloads; cycle and dead-code detection are
//! new operations the teacher's prototype graph lacked, added with
//! `petgraph::algo::tarjan_scc`.

use crate::error::StorageResult;
use crate::node::{Edge, Node};
use crate::storage::Store;
use crate::types::{is_dependency_edge, Direction, EdgeKind, NodeId, NodeKind};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

/// Hard cap on visited nodes for any single query, per spec §4.E/§5.
pub const MAX_VISITED: usize = 50_000;

pub struct Subgraph {
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<Edge>,
    pub roots: Vec<NodeId>,
}

pub struct TraverseOptions {
    pub max_depth: usize,
    pub edge_kinds: Option<Vec<EdgeKind>>,
    pub node_kinds: Option<Vec<NodeKind>>,
    pub direction: Direction,
    pub limit: usize,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        TraverseOptions { max_depth: 2, edge_kinds: None, node_kinds: None, direction: Direction::Outgoing, limit: MAX_VISITED }
    }
}

pub struct Graph<'a> {
    store: &'a Store,
}

impl<'a> Graph<'a> {
    pub fn new(store: &'a Store) -> Self {
        Graph { store }
    }

    /// Bounded BFS from `start`. Self-loops are skipped; revisits are
    /// pruned; halts at `max_depth` or `limit`.
    pub fn traverse(&self, start: &NodeId, opts: &TraverseOptions) -> StorageResult<Subgraph> {
        let mut nodes = HashMap::new();
        let mut edges = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();

        if let Some(root) = self.store.get_node_by_id(start)? {
            nodes.insert(start.clone(), root);
        } else {
            return Ok(Subgraph { nodes, edges, roots: vec![start.clone()] });
        }
        visited.insert(start.clone());
        queue.push_back((start.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= opts.max_depth || visited.len() >= opts.limit {
                continue;
            }

            let mut candidate_edges = Vec::new();
            match opts.direction {
                Direction::Outgoing => candidate_edges.extend(self.store.outgoing_edges(&current)?),
                Direction::Incoming => candidate_edges.extend(self.store.incoming_edges(&current)?),
                Direction::Both => {
                    candidate_edges.extend(self.store.outgoing_edges(&current)?);
                    candidate_edges.extend(self.store.incoming_edges(&current)?);
                }
            }

            for edge in candidate_edges {
                if edge.source == edge.target {
                    continue;
                }
                if let Some(kinds) = &opts.edge_kinds {
                    if !kinds.contains(&edge.kind) {
                        continue;
                    }
                }
                let other = if edge.source == current { edge.target.clone() } else { edge.source.clone() };
                if visited.contains(&other) {
                    if !nodes.contains_key(&other) || edges.iter().all(|e: &Edge| e.dedup_key() != edge.dedup_key()) {
                        edges.push(edge.clone());
                    }
                    continue;
                }
                let Some(other_node) = self.store.get_node_by_id(&other)? else { continue };
                if let Some(kinds) = &opts.node_kinds {
                    if !kinds.contains(&other_node.kind) {
                        continue;
                    }
                }
                visited.insert(other.clone());
                nodes.insert(other.clone(), other_node);
                edges.push(edge);
                if visited.len() < opts.limit {
                    queue.push_back((other, depth + 1));
                }
            }
        }

        Ok(Subgraph { nodes, edges, roots: vec![start.clone()] })
    }

    /// Union of outgoing and incoming `calls` BFS up to `depth`.
    pub fn call_graph(&self, id: &NodeId, depth: usize) -> StorageResult<Subgraph> {
        let out_opts = TraverseOptions {
            max_depth: depth,
            edge_kinds: Some(vec![EdgeKind::Calls]),
            node_kinds: None,
            direction: Direction::Outgoing,
            limit: MAX_VISITED,
        };
        let in_opts = TraverseOptions { direction: Direction::Incoming, ..out_opts_clone(&out_opts) };
        let outgoing = self.traverse(id, &out_opts)?;
        let incoming = self.traverse(id, &in_opts)?;
        Ok(merge_subgraphs(vec![outgoing, incoming]))
    }

    /// Ancestors via `extends`/`implements` (outgoing) and descendants
    /// (incoming).
    pub fn type_hierarchy(&self, id: &NodeId, depth: usize) -> StorageResult<(Subgraph, Subgraph)> {
        let kinds = Some(vec![EdgeKind::Extends, EdgeKind::Implements]);
        let ancestors = self.traverse(
            id,
            &TraverseOptions { max_depth: depth, edge_kinds: kinds.clone(), node_kinds: None, direction: Direction::Outgoing, limit: MAX_VISITED },
        )?;
        let descendants = self.traverse(
            id,
            &TraverseOptions { max_depth: depth, edge_kinds: kinds, node_kinds: None, direction: Direction::Incoming, limit: MAX_VISITED },
        )?;
        Ok((ancestors, descendants))
    }

    /// "What depends on this, transitively": incoming BFS over edges
    /// whose kind signals dependency.
    pub fn impact_radius(&self, id: &NodeId, depth: usize) -> StorageResult<Subgraph> {
        let kinds: Vec<EdgeKind> = EdgeKind::ALL.iter().copied().filter(|k| is_dependency_edge(*k)).collect();
        self.traverse(
            id,
            &TraverseOptions { max_depth: depth, edge_kinds: Some(kinds), node_kinds: None, direction: Direction::Incoming, limit: MAX_VISITED },
        )
    }

    /// Shortest path via BFS over an optional edge-kind whitelist.
    /// Returns an interleaved `[node, edge, node, ...]` list, or `None`.
    pub fn shortest_path(
        &self,
        from: &NodeId,
        to: &NodeId,
        edge_kinds: Option<&[EdgeKind]>,
    ) -> StorageResult<Option<Vec<PathStep>>> {
        if from == to {
            if let Some(n) = self.store.get_node_by_id(from)? {
                return Ok(Some(vec![PathStep::Node(n)]));
            }
            return Ok(None);
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut came_from: HashMap<NodeId, (NodeId, Edge)> = HashMap::new();
        visited.insert(from.clone());
        queue.push_back(from.clone());

        while let Some(current) = queue.pop_front() {
            if visited.len() >= MAX_VISITED {
                break;
            }
            for edge in self.store.outgoing_edges(&current)? {
                if let Some(kinds) = edge_kinds {
                    if !kinds.contains(&edge.kind) {
                        continue;
                    }
                }
                if visited.contains(&edge.target) {
                    continue;
                }
                visited.insert(edge.target.clone());
                came_from.insert(edge.target.clone(), (current.clone(), edge.clone()));
                if edge.target == *to {
                    return Ok(Some(self.reconstruct_path(from, to, &came_from)?));
                }
                queue.push_back(edge.target.clone());
            }
        }
        Ok(None)
    }

    fn reconstruct_path(
        &self,
        from: &NodeId,
        to: &NodeId,
        came_from: &HashMap<NodeId, (NodeId, Edge)>,
    ) -> StorageResult<Vec<PathStep>> {
        let mut chain = Vec::new();
        let mut current = to.clone();
        while current != *from {
            let (prev, edge) = came_from.get(&current).expect("path reconstruction invariant");
            chain.push((current.clone(), edge.clone()));
            current = prev.clone();
        }
        chain.reverse();

        let mut steps = Vec::new();
        if let Some(n) = self.store.get_node_by_id(from)? {
            steps.push(PathStep::Node(n));
        }
        for (node_id, edge) in chain {
            steps.push(PathStep::Edge(edge));
            if let Some(n) = self.store.get_node_by_id(&node_id)? {
                steps.push(PathStep::Node(n));
            }
        }
        Ok(steps)
    }

    /// Cycles on the file-level import graph, via Tarjan's SCC algorithm.
    /// Only `imports` edges count as import-graph evidence; ordinary
    /// cross-file `calls`/`references` edges are not cycles in this sense.
    pub fn circular_file_deps(&self) -> StorageResult<Vec<Vec<String>>> {
        let edges: Vec<Edge> = self.store.all_edges()?.into_iter().filter(|e| e.kind == EdgeKind::Imports).collect();
        let mut file_index: HashMap<String, NodeIndex> = HashMap::new();
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut node_file: HashMap<NodeId, String> = HashMap::new();

        for edge in &edges {
            for id in [&edge.source, &edge.target] {
                if node_file.contains_key(id) {
                    continue;
                }
                if let Some(node) = self.store.get_node_by_id(id)? {
                    node_file.insert(id.clone(), node.file_path);
                }
            }
        }

        let mut seen_pairs = HashSet::new();
        for edge in &edges {
            let (Some(src_file), Some(dst_file)) = (node_file.get(&edge.source), node_file.get(&edge.target)) else {
                continue;
            };
            if src_file == dst_file {
                continue;
            }
            if !seen_pairs.insert((src_file.clone(), dst_file.clone())) {
                continue;
            }
            let src_idx = *file_index.entry(src_file.clone()).or_insert_with(|| graph.add_node(src_file.clone()));
            let dst_idx = *file_index.entry(dst_file.clone()).or_insert_with(|| graph.add_node(dst_file.clone()));
            graph.add_edge(src_idx, dst_idx, ());
        }

        let sccs = tarjan_scc(&graph);
        Ok(sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|idx| graph[idx].clone()).collect())
            .collect())
    }

    /// Nodes of `kinds` with zero incoming `calls`/`references` from
    /// outside themselves.
    pub fn dead_code(&self, kinds: &[NodeKind]) -> StorageResult<Vec<Node>> {
        let mut dead = Vec::new();
        for kind in kinds {
            for node in self.store.get_nodes_by_kind(*kind)? {
                let incoming = self.store.incoming_edges(&node.id)?;
                let has_external_caller = incoming
                    .iter()
                    .any(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::References) && e.source != node.id);
                if !has_external_caller {
                    dead.push(node);
                }
            }
        }
        Ok(dead)
    }
}

pub enum PathStep {
    Node(Node),
    Edge(Edge),
}

fn out_opts_clone(opts: &TraverseOptions) -> TraverseOptions {
    TraverseOptions {
        max_depth: opts.max_depth,
        edge_kinds: opts.edge_kinds.clone(),
        node_kinds: opts.node_kinds.clone(),
        direction: opts.direction,
        limit: opts.limit,
    }
}

fn merge_subgraphs(subgraphs: Vec<Subgraph>) -> Subgraph {
    let mut nodes = HashMap::new();
    let mut edges = Vec::new();
    let mut seen_edges = HashSet::new();
    let mut roots = Vec::new();
    for sg in subgraphs {
        for (id, node) in sg.nodes {
            nodes.insert(id, node);
        }
        for edge in sg.edges {
            if seen_edges.insert(edge.dedup_key()) {
                edges.push(edge);
            }
        }
        roots.extend(sg.roots);
    }
    roots.dedup();
    Subgraph { nodes, edges, roots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{EdgeMetadata, ExtractionError};
    use crate::parsing::extractor::file_record;
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

    fn edge(source: &NodeId, target: &NodeId, kind: EdgeKind) -> Edge {
        Edge { source: source.clone(), target: target.clone(), kind, line: Some(1), column: Some(0), metadata: EdgeMetadata::default() }
    }

    fn setup_chain() -> (Store, Vec<NodeId>) {
        let store = Store::open_in_memory().unwrap();
        let a = node("a", "src/a.rs", NodeKind::Function);
        let b = node("b", "src/b.rs", NodeKind::Function);
        let c = node("c", "src/c.rs", NodeKind::Function);
        let d = node("d", "src/d.rs", NodeKind::Function);
        let ids = vec![a.id.clone(), b.id.clone(), c.id.clone(), d.id.clone()];
        for (n, path) in [(&a, "src/a.rs"), (&b, "src/b.rs"), (&c, "src/c.rs"), (&d, "src/d.rs")] {
            store
                .upsert_file(&file_record(path, "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[n.clone()], &[], &[])
                .unwrap();
        }
        store.insert_edges(&[edge(&a.id, &b.id, EdgeKind::Calls), edge(&b.id, &c.id, EdgeKind::Calls), edge(&c.id, &d.id, EdgeKind::Calls)]).unwrap();
        (store, ids)
    }

    #[test]
    fn impact_radius_excludes_beyond_depth() {
        let (store, ids) = setup_chain();
        let graph = Graph::new(&store);
        // a -> b -> c -> d; impact radius of d at depth 2 reaches b but not a.
        let subgraph = graph.impact_radius(&ids[3], 2).unwrap();
        assert!(subgraph.nodes.contains_key(&ids[3]));
        assert!(subgraph.nodes.contains_key(&ids[2]));
        assert!(subgraph.nodes.contains_key(&ids[1]));
        assert!(!subgraph.nodes.contains_key(&ids[0]));
    }

    #[test]
    fn shortest_path_found_across_chain() {
        let (store, ids) = setup_chain();
        let graph = Graph::new(&store);
        let path = graph.shortest_path(&ids[0], &ids[3], None).unwrap();
        assert!(path.is_some());
    }

    #[test]
    fn circular_file_deps_detects_two_file_cycle() {
        let store = Store::open_in_memory().unwrap();
        let a = node("a", "src/a.rs", NodeKind::Function);
        let b = node("b", "src/b.rs", NodeKind::Function);
        store.upsert_file(&file_record("src/a.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[a.clone()], &[], &[]).unwrap();
        store.upsert_file(&file_record("src/b.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[b.clone()], &[], &[]).unwrap();
        store.insert_edges(&[edge(&a.id, &b.id, EdgeKind::Imports), edge(&b.id, &a.id, EdgeKind::Imports)]).unwrap();
        let graph = Graph::new(&store);
        let cycles = graph.circular_file_deps().unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn circular_file_deps_ignores_non_import_edges() {
        let store = Store::open_in_memory().unwrap();
        let a = node("a", "src/a.rs", NodeKind::Function);
        let b = node("b", "src/b.rs", NodeKind::Function);
        store.upsert_file(&file_record("src/a.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[a.clone()], &[], &[]).unwrap();
        store.upsert_file(&file_record("src/b.rs", "h", "rust", 1, 0, 0, 1, Vec::<ExtractionError>::new()), &[b.clone()], &[], &[]).unwrap();
        // Mutual calls across files are not an import cycle.
        store.insert_edges(&[edge(&a.id, &b.id, EdgeKind::Calls), edge(&b.id, &a.id, EdgeKind::Calls)]).unwrap();
        let graph = Graph::new(&store);
        assert!(graph.circular_file_deps().unwrap().is_empty());
    }

    #[test]
    fn dead_code_flags_uncalled_function() {
        let (store, ids) = setup_chain();
        let graph = Graph::new(&store);
        let dead = graph.dead_code(&[NodeKind::Function]).unwrap();
        // `a` has no incoming calls.
        assert!(dead.iter().any(|n| n.id == ids[0]));
        assert!(!dead.iter().any(|n| n.id == ids[1]));
    }
}
