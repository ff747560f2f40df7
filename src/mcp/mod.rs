//! MCP (Model Context Protocol) tool surface (spec §6), grounded on the
//! teacher's `mcp::CodeIntelligenceServer`: `#[tool_router]`/`#[tool(..)]`
//! over `Parameters<T>` request structs, `CallToolResult::success`/`error`
//! text responses, and a `#[tool_handler] impl ServerHandler` carrying
//! `get_info`.

use crate::config::Settings;
use crate::context::{self, ContextOptions};
use crate::handlers::{self, ResolveOutcome, ResolveResult, SymbolQuery};
use crate::search::SearchOptions;
use crate::storage::Store;
use crate::sync as sync_engine;
use crate::types::NodeKind;
use crate::vector::Embedder;

use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{
    CallToolResult, Content, ErrorCode, ErrorData as McpError, Implementation, ProtocolVersion,
    ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

fn internal_error(msg: impl std::fmt::Display) -> McpError {
    McpError::new(ErrorCode::INTERNAL_ERROR, msg.to_string(), None)
}

fn invalid_params(msg: impl std::fmt::Display) -> McpError {
    McpError::new(ErrorCode::INVALID_PARAMS, msg.to_string(), None)
}

fn ok_text(text: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text.into())]))
}

/// One project's open store, settings, and optional embedder — reopened
/// on `init`/`set_root` and torn down on `uninit`.
struct ProjectHandle {
    root: PathBuf,
    settings: Settings,
    store: Store,
    embedder: Option<Arc<dyn Embedder>>,
}

#[derive(Default)]
struct ServerState {
    project: Option<ProjectHandle>,
}

impl ServerState {
    fn require(&self) -> Result<&ProjectHandle, McpError> {
        self.project
            .as_ref()
            .ok_or_else(|| McpError::new(ErrorCode::INVALID_REQUEST, "no project root set; call init or set_root first", None))
    }
}

fn parse_kind(kind: &Option<String>) -> Result<Option<NodeKind>, McpError> {
    match kind {
        None => Ok(None),
        Some(s) => NodeKind::from_str_opt(s).map(Some).ok_or_else(|| invalid_params(format!("unknown kind: {s}"))),
    }
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct InitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default)]
    pub include_files: bool,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ContextRequest {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default)]
    pub include_files: bool,
    #[serde(default = "default_true")]
    pub include_code: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SymbolRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ImpactRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_depth() -> usize {
    2
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct NodeRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default)]
    pub include_code: bool,
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct EmptyRequest {}

#[derive(Clone)]
pub struct GraphServer {
    state: Arc<RwLock<ServerState>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GraphServer {
    pub fn new() -> Self {
        GraphServer { state: Arc::new(RwLock::new(ServerState::default())), tool_router: Self::tool_router() }
    }

    /// Open (or create) the project at `root` and load it into this server.
    pub async fn open(&self, root: PathBuf, settings: Settings, store: Store) {
        let mut guard = self.state.write().await;
        guard.project = Some(ProjectHandle { root, settings, store, embedder: None });
    }

    #[tool(description = "Return the currently active project root, if any")]
    pub async fn get_root(&self, Parameters(_req): Parameters<EmptyRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        match &guard.project {
            Some(p) => ok_text(p.root.display().to_string()),
            None => ok_text("no project root set"),
        }
    }

    #[tool(description = "Switch the active project root without reinitializing its store")]
    pub async fn set_root(&self, Parameters(req): Parameters<PathRequest>) -> Result<CallToolResult, McpError> {
        let path = req.path.map(PathBuf::from).ok_or_else(|| invalid_params("path is required"))?;
        let settings = Settings::load(&path).map_err(internal_error)?;
        let store = open_store(&path).map_err(internal_error)?;
        let mut guard = self.state.write().await;
        guard.project = Some(ProjectHandle { root: path, settings, store, embedder: None });
        ok_text("root set")
    }

    #[tool(description = "Initialize a new project: writes .codegraph/config.json and creates an empty store")]
    pub async fn init(&self, Parameters(req): Parameters<InitRequest>) -> Result<CallToolResult, McpError> {
        let path = req.path.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        Settings::init_config_file(&path, req.force).map_err(internal_error)?;
        let settings = Settings::load(&path).map_err(internal_error)?;
        let store = open_store(&path).map_err(internal_error)?;
        let mut guard = self.state.write().await;
        guard.project = Some(ProjectHandle { root: path, settings, store, embedder: None });
        ok_text("initialized")
    }

    #[tool(description = "Full (re)index of the project's current file set")]
    pub async fn index(&self, Parameters(_req): Parameters<EmptyRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let report = sync_engine::sync(&project.store, &project.root, &project.settings).map_err(internal_error)?;
        ok_text(format!(
            "indexed: {} added, {} modified, {} unchanged, {} removed, {} resolved, {} unresolved",
            report.files_added, report.files_modified, report.files_unchanged, report.files_removed, report.nodes_resolved, report.nodes_unresolved
        ))
    }

    #[tool(description = "Incrementally reconcile the store with the current file set on disk")]
    pub async fn sync(&self, Parameters(_req): Parameters<EmptyRequest>) -> Result<CallToolResult, McpError> {
        self.index(Parameters(EmptyRequest {})).await
    }

    #[tool(description = "Remove the project's .codegraph directory")]
    pub async fn uninit(&self, Parameters(_req): Parameters<EmptyRequest>) -> Result<CallToolResult, McpError> {
        let mut guard = self.state.write().await;
        if let Some(project) = guard.project.take() {
            let dot_dir = project.root.join(crate::config::DOT_DIR);
            let _ = std::fs::remove_dir_all(&dot_dir);
        }
        ok_text("uninitialized")
    }

    #[tool(description = "Graph stats: node/edge counts, counts by kind and language")]
    pub async fn status(&self, Parameters(_req): Parameters<EmptyRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let nodes = project.store.node_count().map_err(internal_error)?;
        let edges = project.store.edge_count().map_err(internal_error)?;
        let by_kind = project.store.counts_by_kind().map_err(internal_error)?;
        let by_lang = project.store.counts_by_language().map_err(internal_error)?;
        let mut out = format!("## Status\n\n- root: {}\n- nodes: {nodes}\n- edges: {edges}\n\n### By kind\n", project.root.display());
        for (kind, count) in &by_kind {
            out.push_str(&format!("- {kind}: {count}\n"));
        }
        out.push_str("\n### By language\n");
        for (lang, count) in &by_lang {
            out.push_str(&format!("- {lang}: {count}\n"));
        }
        ok_text(out)
    }

    #[tool(description = "Ranked lexical search over indexed nodes")]
    pub async fn search(&self, Parameters(req): Parameters<SearchRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let kind = parse_kind(&req.kind)?;
        let mut opts = SearchOptions::with_defaults();
        opts.kinds = kind.map(|k| vec![k]);
        opts.languages = req.language.map(|l| vec![l]);
        opts.include_files = req.include_files;
        opts.limit = req.limit;
        if let Some(hint) = &req.path_hint {
            opts.include_patterns = Some(vec![format!("*{hint}*")]);
        }
        let results = handlers::search_symbols(&project.store, &req.query, &opts).map_err(internal_error)?;
        if results.is_empty() {
            return ok_text(format!("No matches for `{}`", req.query));
        }
        let mut out = format!("Found {} result(s) for `{}`:\n\n", results.len(), req.query);
        for r in &results {
            out.push_str(&format!(
                "- `{}` ({}) — {}:{} [score {:.2}]\n",
                r.node.name, r.node.kind.as_str(), r.node.file_path, r.node.range.start_line, r.final_score
            ));
        }
        ok_text(out)
    }

    #[tool(description = "Assemble a task-scoped subgraph and code excerpts as a markdown brief")]
    pub async fn context(&self, Parameters(req): Parameters<ContextRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let kind = parse_kind(&req.kind)?;
        let mut opts = ContextOptions::default();
        if let Some(n) = req.max_nodes {
            opts.max_nodes = n;
        }
        opts.kind = kind;
        opts.language = req.language.clone();
        opts.path_hint = req.path_hint.clone();
        opts.include_files = req.include_files;
        opts.include_code = req.include_code;

        let embedder = project.embedder.as_deref();
        let ctx = handlers::task_context(&project.store, embedder, &req.task, &opts).map_err(internal_error)?;
        ok_text(context::to_markdown(&ctx))
    }

    #[tool(description = "Immediate callers of a resolved symbol")]
    pub async fn callers(&self, Parameters(req): Parameters<SymbolRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let query = SymbolQuery { symbol: req.symbol.clone(), kind: parse_kind(&req.kind)?, path_hint: req.path_hint.clone(), language: None };
        match handlers::callers(&project.store, &query, &project.settings.search, req.limit).map_err(internal_error)? {
            ResolveOutcome::NotFound => ok_text(format!("Not found: `{}`", req.symbol)),
            ResolveOutcome::Ambiguous(nodes) => ok_text(handlers::ambiguous_to_markdown(&req.symbol, &nodes)),
            ResolveOutcome::Found { node, result } => {
                let mut out = format!("Callers of `{}`:\n\n", node.name);
                for n in &result {
                    out.push_str(&format!("- `{}` — {}:{}\n", n.name, n.file_path, n.range.start_line));
                }
                if result.is_empty() {
                    out.push_str("(none)\n");
                }
                ok_text(out)
            }
        }
    }

    #[tool(description = "Immediate callees of a resolved symbol")]
    pub async fn callees(&self, Parameters(req): Parameters<SymbolRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let query = SymbolQuery { symbol: req.symbol.clone(), kind: parse_kind(&req.kind)?, path_hint: req.path_hint.clone(), language: None };
        match handlers::callees(&project.store, &query, &project.settings.search, req.limit).map_err(internal_error)? {
            ResolveOutcome::NotFound => ok_text(format!("Not found: `{}`", req.symbol)),
            ResolveOutcome::Ambiguous(nodes) => ok_text(handlers::ambiguous_to_markdown(&req.symbol, &nodes)),
            ResolveOutcome::Found { node, result } => {
                let mut out = format!("Callees of `{}`:\n\n", node.name);
                for n in &result {
                    out.push_str(&format!("- `{}` — {}:{}\n", n.name, n.file_path, n.range.start_line));
                }
                if result.is_empty() {
                    out.push_str("(none)\n");
                }
                ok_text(out)
            }
        }
    }

    #[tool(description = "Dependency impact radius of a resolved symbol, grouped by file")]
    pub async fn impact(&self, Parameters(req): Parameters<ImpactRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let query = SymbolQuery { symbol: req.symbol.clone(), kind: parse_kind(&req.kind)?, path_hint: req.path_hint.clone(), language: None };
        match handlers::impact(&project.store, &query, &project.settings.search, req.depth).map_err(internal_error)? {
            ResolveOutcome::NotFound => ok_text(format!("Not found: `{}`", req.symbol)),
            ResolveOutcome::Ambiguous(nodes) => ok_text(handlers::ambiguous_to_markdown(&req.symbol, &nodes)),
            ResolveOutcome::Found { node, result } => {
                let mut by_file: std::collections::BTreeMap<&str, Vec<&crate::node::Node>> = std::collections::BTreeMap::new();
                for n in result.nodes.values() {
                    by_file.entry(n.file_path.as_str()).or_default().push(n);
                }
                let mut out = format!("Impact radius of `{}` (depth {}): {} node(s) across {} file(s)\n\n", node.name, req.depth, result.nodes.len(), by_file.len());
                for (file, nodes) in by_file {
                    out.push_str(&format!("### {file}\n"));
                    for n in nodes {
                        out.push_str(&format!("- `{}` ({})\n", n.name, n.kind.as_str()));
                    }
                }
                ok_text(out)
            }
        }
    }

    #[tool(description = "Resolve a symbol and return its node detail, optionally with source")]
    pub async fn node(&self, Parameters(req): Parameters<NodeRequest>) -> Result<CallToolResult, McpError> {
        let guard = self.state.read().await;
        let project = guard.require()?;
        let query = SymbolQuery { symbol: req.symbol.clone(), kind: parse_kind(&req.kind)?, path_hint: req.path_hint.clone(), language: None };
        match handlers::node_lookup(&project.store, &query, &project.settings.search).map_err(internal_error)? {
            ResolveResult::NotFound => ok_text(format!("Not found: `{}`", req.symbol)),
            ResolveResult::Ambiguous(nodes) => ok_text(handlers::ambiguous_to_markdown(&req.symbol, &nodes)),
            ResolveResult::Found(node) => {
                let mut out = handlers::node_to_markdown(&node);
                if req.include_code {
                    let full_path = project.root.join(&node.file_path);
                    if let Ok(source) = std::fs::read_to_string(&full_path) {
                        let snippet: String = source
                            .lines()
                            .skip(node.range.start_line.saturating_sub(1) as usize)
                            .take((node.range.end_line.saturating_sub(node.range.start_line) as usize + 1).max(1))
                            .collect::<Vec<_>>()
                            .join("\n");
                        out.push_str(&format!("\n```{}\n{}\n```\n", node.language, snippet));
                    }
                }
                ok_text(out)
            }
        }
    }
}

impl Default for GraphServer {
    fn default() -> Self {
        Self::new()
    }
}

fn open_store(root: &std::path::Path) -> crate::error::IndexResult<Store> {
    let db_path = root.join(crate::config::DOT_DIR).join("graph.db");
    Store::open(&db_path).map_err(crate::error::IndexError::Storage)
}

#[tool_handler]
impl ServerHandler for GraphServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::new(ServerCapabilities::builder().enable_tools().build());
        info.protocol_version = ProtocolVersion::V_2024_11_05;
        info.server_info = Implementation::new("codegraph", env!("CARGO_PKG_VERSION"))
            .with_title("Codegraph Code Intelligence");
        info.with_instructions(
            "Code intelligence tools over a local semantic graph of this project. \
                Start with `search` or `context` to locate relevant symbols, then use \
                `callers`/`callees`/`impact` to understand relationships, and `node` for detail. \
                Call `init` once per project, `sync` after edits.",
        )
    }
}
