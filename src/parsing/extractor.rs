//! Generic tree-sitter AST walker. A single DFS over the parse tree
//! maintains a stack of parent IDs (spec §4.B); each [`LanguageSpec`]
//! supplies the node-kind vocabulary for one language, so the walking
//! algorithm itself is written once and shared across all of them.

use crate::error::{ParseError, ParseResult};
use crate::node::{Edge, EdgeMetadata, ErrorSeverity, ExtractionError, FileRecord, Node, UnresolvedReference};
use crate::types::{EdgeKind, NodeId, NodeKind, Range, Visibility};
use tree_sitter::{Parser, Tree};

pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub language: fn() -> tree_sitter::Language,
    pub function_kinds: &'static [&'static str],
    pub method_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub interface_kinds: &'static [&'static str],
    pub struct_kinds: &'static [&'static str],
    pub enum_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    pub call_kinds: &'static [&'static str],
    pub call_name_field: &'static str,
    pub name_field: &'static str,
    pub comment_kinds: &'static [&'static str],
    pub async_keyword: &'static str,
}

pub struct ExtractionOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub unresolved: Vec<UnresolvedReference>,
    pub errors: Vec<ExtractionError>,
}

struct Ctx<'a> {
    spec: &'a LanguageSpec,
    source: &'a [u8],
    file_path: &'a str,
    language: &'a str,
    out: ExtractionOutput,
}

/// Parse `source` under `spec` and walk it into an [`ExtractionOutput`].
pub fn extract(spec: &LanguageSpec, file_path: &str, source: &str) -> ParseResult<ExtractionOutput> {
    let mut parser = Parser::new();
    parser
        .set_language(&(spec.language)())
        .map_err(|_| ParseError::GrammarInit { language: spec.name.to_string() })?;
    let tree: Tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Syntax {
            path: file_path.into(),
            line: 0,
            column: 0,
            reason: "parser returned no tree".into(),
        })?;

    let file_id = NodeId::new(NodeKind::File, file_path, file_path, 0);
    let file_node = Node {
        id: file_id.clone(),
        kind: NodeKind::File,
        name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
        qualified_name: file_path.to_string(),
        file_path: file_path.to_string(),
        language: spec.name.to_string(),
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
    };

    let mut ctx = Ctx {
        spec,
        source: source.as_bytes(),
        file_path,
        language: spec.name,
        out: ExtractionOutput { nodes: vec![file_node], edges: Vec::new(), unresolved: Vec::new(), errors: Vec::new() },
    };

    let mut stack = vec![file_id];
    walk(tree.root_node(), &mut ctx, &mut stack);
    Ok(ctx.out)
}

fn walk(node: tree_sitter::Node, ctx: &mut Ctx, stack: &mut Vec<NodeId>) {
    let kind = node.kind();
    let spec = ctx.spec;

    let declared_kind = if spec.function_kinds.contains(&kind) {
        let is_method = stack.len() > 1 && matches!(peek_declared_kind(ctx, stack), Some(NodeKind::Class) | Some(NodeKind::Struct));
        Some(if spec.method_kinds.contains(&kind) || is_method { NodeKind::Method } else { NodeKind::Function })
    } else if spec.method_kinds.contains(&kind) {
        Some(NodeKind::Method)
    } else if spec.class_kinds.contains(&kind) {
        Some(NodeKind::Class)
    } else if spec.interface_kinds.contains(&kind) {
        Some(NodeKind::Interface)
    } else if spec.struct_kinds.contains(&kind) {
        Some(NodeKind::Struct)
    } else if spec.enum_kinds.contains(&kind) {
        Some(NodeKind::Enum)
    } else {
        None
    };

    if let Some(decl_kind) = declared_kind {
        if let Some(new_id) = emit_declaration(node, ctx, stack, decl_kind) {
            stack.push(new_id);
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                walk(child, ctx, stack);
            }
            stack.pop();
            return;
        }
    }

    if spec.import_kinds.contains(&kind) {
        emit_import(node, ctx, stack);
    }

    if spec.call_kinds.contains(&kind) {
        emit_call(node, ctx, stack);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, ctx, stack);
    }
}

fn peek_declared_kind(ctx: &Ctx, stack: &[NodeId]) -> Option<NodeKind> {
    let top = stack.last()?;
    ctx.out.nodes.iter().find(|n| &n.id == top).map(|n| n.kind)
}

fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn emit_declaration(
    node: tree_sitter::Node,
    ctx: &mut Ctx,
    stack: &mut Vec<NodeId>,
    kind: NodeKind,
) -> Option<NodeId> {
    let name_node = node.child_by_field_name(ctx.spec.name_field)?;
    let name = node_text(name_node, ctx.source).to_string();
    if name.is_empty() {
        return None;
    }
    let start_line = node.start_position().row as u32 + 1;
    let start_column = node.start_position().column as u32;
    let end_line = node.end_position().row as u32 + 1;
    let end_column = node.end_position().column as u32;

    let id = NodeId::new(kind, ctx.file_path, &name, start_line);
    let parent_names: Vec<String> = stack
        .iter()
        .skip(1)
        .filter_map(|id| ctx.out.nodes.iter().find(|n| &n.id == id).map(|n| n.name.clone()))
        .collect();
    let qualified_name = Node::build_qualified_name(ctx.file_path, &parent_names, &name);
    let signature = node
        .child_by_field_name("parameters")
        .map(|p| format!("{name}{}", node_text(p, ctx.source)))
        .or(Some(name.clone()));
    let docstring = leading_docstring(node, ctx);
    let is_async = has_child_of_kind(node, ctx.spec.async_keyword);

    let decl_node = Node {
        id: id.clone(),
        kind,
        name,
        qualified_name,
        file_path: ctx.file_path.to_string(),
        language: ctx.language.to_string(),
        range: Range { start_line, start_column, end_line, end_column },
        docstring,
        signature,
        visibility: Some(Visibility::Public),
        is_exported: true,
        is_async,
        is_static: false,
        is_abstract: false,
        decorators: Vec::new(),
        type_parameters: Vec::new(),
        updated_at: 0,
    };

    let parent = stack.last().cloned().unwrap();
    ctx.out.edges.push(Edge {
        source: parent,
        target: id.clone(),
        kind: EdgeKind::Contains,
        line: Some(start_line),
        column: Some(start_column),
        metadata: EdgeMetadata::default(),
    });
    ctx.out.nodes.push(decl_node);
    Some(id)
}

fn emit_import(node: tree_sitter::Node, ctx: &mut Ctx, stack: &[NodeId]) {
    let text = node_text(node, ctx.source).trim().to_string();
    if text.is_empty() {
        return;
    }
    let from = stack.first().cloned().unwrap();
    ctx.out.unresolved.push(UnresolvedReference {
        from_node_id: from,
        reference_name: text,
        reference_kind: EdgeKind::Imports,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        file_path: ctx.file_path.to_string(),
        language: ctx.language.to_string(),
        candidates: Vec::new(),
    });
}

fn emit_call(node: tree_sitter::Node, ctx: &mut Ctx, stack: &[NodeId]) {
    let name = node
        .child_by_field_name(ctx.spec.call_name_field)
        .map(|n| node_text(n, ctx.source).to_string())
        .unwrap_or_else(|| node_text(node, ctx.source).to_string());
    let name = name.rsplit(['.', ':']).next().unwrap_or(&name).to_string();
    if name.is_empty() {
        return;
    }
    let Some(from) = stack.last().cloned() else { return };
    ctx.out.unresolved.push(UnresolvedReference {
        from_node_id: from,
        reference_name: name,
        reference_kind: EdgeKind::Calls,
        line: node.start_position().row as u32 + 1,
        column: node.start_position().column as u32,
        file_path: ctx.file_path.to_string(),
        language: ctx.language.to_string(),
        candidates: Vec::new(),
    });
}

fn has_child_of_kind(node: tree_sitter::Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == kind)
}

/// Assemble a docstring from contiguous preceding comment siblings,
/// stripping common comment markers.
fn leading_docstring(node: tree_sitter::Node, ctx: &Ctx) -> Option<String> {
    let mut lines = Vec::new();
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if !ctx.spec.comment_kinds.contains(&s.kind()) {
            break;
        }
        if s.end_position().row + 1 < node.start_position().row {
            break;
        }
        lines.push(strip_comment_markers(node_text(s, ctx.source)));
        sibling = s.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn strip_comment_markers(text: &str) -> String {
    text.trim()
        .trim_start_matches("///")
        .trim_start_matches("//!")
        .trim_start_matches("//")
        .trim_start_matches("/**")
        .trim_start_matches("/*!")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim_start_matches('*')
        .trim_start_matches('#')
        .trim()
        .to_string()
}

/// A file whose content failed to parse at all: zero nodes, one error.
pub fn extraction_failure(file_path: &str, reason: String) -> ExtractionOutput {
    ExtractionOutput {
        nodes: Vec::new(),
        edges: Vec::new(),
        unresolved: Vec::new(),
        errors: vec![ExtractionError { message: reason, severity: ErrorSeverity::Error, line: None }],
    }
}

pub fn file_record(path: &str, content_hash: &str, language: &str, size: u64, modified_at: u64, indexed_at: u64, node_count: u32, errors: Vec<ExtractionError>) -> FileRecord {
    FileRecord {
        path: path.to_string(),
        content_hash: content_hash.to_string(),
        language: language.to_string(),
        size,
        modified_at,
        indexed_at,
        node_count,
        errors,
    }
}
