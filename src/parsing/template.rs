//! Pattern-based (not AST) extractor for template files — `.html`,
//! `.vue`, and similar — per spec §4.B. Emits a file node, `component`
//! nodes for tag-like references, `constant` nodes for simple
//! assignments, and `references` edges for render/include/section/schema
//! forms.

use crate::node::{Edge, EdgeMetadata, Node, UnresolvedReference};
use crate::types::{EdgeKind, NodeId, NodeKind, Range};
use regex::Regex;
use std::sync::OnceLock;

pub const TEMPLATE_EXTENSIONS: &[&str] = &["html", "vue"];

pub struct TemplateOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub unresolved: Vec<UnresolvedReference>,
}

fn component_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)\b").unwrap())
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:render|include|section|schema|assign)\s*\(?\s*['"]([\w./-]+)['"]"#).unwrap()
    })
}

fn assign_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*[^}]+\}\}").unwrap())
}

pub fn extract(file_path: &str, source: &str) -> TemplateOutput {
    let file_id = NodeId::new(NodeKind::File, file_path, file_path, 0);
    let mut nodes = vec![Node {
        id: file_id.clone(),
        kind: NodeKind::File,
        name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
        qualified_name: file_path.to_string(),
        file_path: file_path.to_string(),
        language: "template".to_string(),
        range: Range { start_line: 1, start_column: 0, end_line: source.lines().count() as u32 + 1, end_column: 0 },
        docstring: None,
        signature: None,
        visibility: None,
        is_exported: false,
        is_async: false,
        is_static: false,
        is_abstract: false,
        decorators: Vec::new(),
        type_parameters: Vec::new(),
        updated_at: 0,
    }];
    let mut edges = Vec::new();
    let mut unresolved = Vec::new();
    let mut seen_components = std::collections::HashSet::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx as u32 + 1;

        for cap in component_re().captures_iter(line) {
            let name = cap[1].to_string();
            if !seen_components.insert(name.clone()) {
                continue;
            }
            let id = NodeId::new(NodeKind::Component, file_path, &name, line_no);
            nodes.push(Node {
                id: id.clone(),
                kind: NodeKind::Component,
                name: name.clone(),
                qualified_name: Node::build_qualified_name(file_path, &[], &name),
                file_path: file_path.to_string(),
                language: "template".to_string(),
                range: Range::point(line_no, 0),
                docstring: None,
                signature: None,
                visibility: None,
                is_exported: false,
                is_async: false,
                is_static: false,
                is_abstract: false,
                decorators: Vec::new(),
                type_parameters: Vec::new(),
                updated_at: 0,
            });
            edges.push(Edge {
                source: file_id.clone(),
                target: id,
                kind: EdgeKind::Contains,
                line: Some(line_no),
                column: None,
                metadata: EdgeMetadata::default(),
            });
        }

        for cap in reference_re().captures_iter(line) {
            unresolved.push(UnresolvedReference {
                from_node_id: file_id.clone(),
                reference_name: cap[1].to_string(),
                reference_kind: EdgeKind::References,
                line: line_no,
                column: 0,
                file_path: file_path.to_string(),
                language: "template".to_string(),
                candidates: Vec::new(),
            });
        }

        for cap in assign_re().captures_iter(line) {
            let name = cap[1].to_string();
            let id = NodeId::new(NodeKind::Constant, file_path, &name, line_no);
            nodes.push(Node {
                id: id.clone(),
                kind: NodeKind::Constant,
                name: name.clone(),
                qualified_name: Node::build_qualified_name(file_path, &[], &name),
                file_path: file_path.to_string(),
                language: "template".to_string(),
                range: Range::point(line_no, 0),
                docstring: None,
                signature: None,
                visibility: None,
                is_exported: false,
                is_async: false,
                is_static: false,
                is_abstract: false,
                decorators: Vec::new(),
                type_parameters: Vec::new(),
                updated_at: 0,
            });
            edges.push(Edge {
                source: file_id.clone(),
                target: id,
                kind: EdgeKind::Contains,
                line: Some(line_no),
                column: None,
                metadata: EdgeMetadata::default(),
            });
        }
    }

    TemplateOutput { nodes, edges, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_component_tag_once_per_name() {
        let out = extract("page.vue", "<Header/>\n<Body><Header/></Body>");
        let components: Vec<_> = out.nodes.iter().filter(|n| n.kind == NodeKind::Component).collect();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "Header");
    }

    #[test]
    fn extracts_render_reference() {
        let out = extract("page.html", "{{ render('partials/footer') }}");
        assert_eq!(out.unresolved.len(), 1);
        assert_eq!(out.unresolved[0].reference_name, "partials/footer");
    }
}
