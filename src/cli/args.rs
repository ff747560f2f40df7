//! CLI argument parsing (spec §6's "CLI surface"), styled the way the
//! teacher's `cli::args` styles its `clap::builder::styling::Styles`.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(name = "codegraph", version = env!("CARGO_PKG_VERSION"), about = "Local-first code intelligence engine", styles = clap_cargo_style())]
pub struct Cli {
    /// Project root (defaults to the current directory, or an ancestor containing .codegraph/)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .codegraph/config.json for this project
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Full (re)index of the current file set
    Index,
    /// Incrementally reconcile the store with files on disk
    Sync,
    /// Print graph stats: node/edge counts by kind and language
    Status,
    /// Ranked lexical search over indexed nodes
    Query {
        query: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        path_hint: Option<String>,
        #[arg(long)]
        include_files: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Assemble a task-scoped subgraph and code excerpts
    Context {
        task: String,
        #[arg(long)]
        max_nodes: Option<usize>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        path_hint: Option<String>,
        #[arg(long)]
        include_files: bool,
        #[arg(long, default_value_t = true)]
        include_code: bool,
    },
    /// Manage editor/VCS integration hooks
    Hooks {
        #[command(subcommand)]
        action: HooksAction,
    },
    /// Start the MCP (Model Context Protocol) server
    Serve {
        /// Serve over the MCP stdio transport (the only transport this build offers)
        #[arg(long)]
        mcp: bool,
    },
    /// Import a SCIP-shaped JSON occurrence index, wiring references/imports edges
    ImportScip {
        /// Path to the JSON file of documents/occurrences
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum HooksAction {
    /// Install a post-commit hook that runs `codegraph sync`
    Install,
    /// Remove the installed hook
    Remove,
    /// Report whether the hook is installed
    Status,
}
