//! Per-subsystem error taxonomy. Each enum names the failures a caller
//! needs to branch on; `recovery_suggestions` gives short, concrete next
//! steps the way a CLI or an MCP tool response can surface directly.

use std::path::PathBuf;
use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type RequestResult<T> = Result<T, RequestError>;
pub type VectorResult<T> = Result<T, VectorError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read file {path}: {source}")]
    FileRead { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to write file {path}: {source}")]
    FileWrite { path: PathBuf, #[source] source: std::io::Error },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("broken symlink skipped: {path}")]
    BrokenSymlink { path: PathBuf },

    #[error("invalid glob pattern {pattern}: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error("store error: {0}")]
    Storage(#[from] StorageError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("lock held by another process (pid {pid})")]
    LockHeld { pid: u32 },

    #[error("project not initialized at {path}")]
    NotInitialized { path: PathBuf },

    #[error("parallel worker failed on chunk {chunk}: {reason}")]
    WorkerFailed { chunk: usize, reason: String },

    #[error("{0}")]
    General(String),
}

impl IndexError {
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            IndexError::FileRead { .. } => vec!["check that the file exists and is readable"],
            IndexError::FileWrite { .. } => vec!["check that the parent directory is writable"],
            IndexError::PermissionDenied { .. } => {
                vec!["run with sufficient permissions or exclude the path via config"]
            }
            IndexError::BrokenSymlink { .. } => vec!["remove or repair the dangling symlink"],
            IndexError::InvalidGlob { .. } => {
                vec!["check glob syntax; `**` must be its own path segment"]
            }
            IndexError::ConfigError { .. } => {
                vec!["run `codegraph init --force` to regenerate the config"]
            }
            IndexError::Storage(e) => e.recovery_suggestions(),
            IndexError::Parse(_) => vec!["check the file for syntax errors"],
            IndexError::LockHeld { .. } => {
                vec!["wait for the other process to finish, or remove the stale lock file"]
            }
            IndexError::NotInitialized { .. } => vec!["run `codegraph init` first"],
            IndexError::WorkerFailed { .. } => vec!["retry the operation; check logs for detail"],
            IndexError::General(_) => vec![],
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parser registered for extension {extension:?}")]
    UnsupportedLanguage { extension: Option<String> },

    #[error("failed to initialize {language} grammar")]
    GrammarInit { language: String },

    #[error("syntax error in {path} at {line}:{column}: {reason}")]
    Syntax { path: PathBuf, line: u32, column: u32, reason: String },

    #[error("file {path} is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },

    #[error("file {path} exceeds max size ({size} > {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("database corrupted: {reason}")]
    Corrupted { reason: String },

    #[error("schema version mismatch: store is v{found}, engine expects v{expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("node not found: {0}")]
    NodeNotFound(String),
}

impl StorageError {
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StorageError::Sqlite(_) => vec!["check disk space and file permissions"],
            StorageError::MigrationFailed { .. } => {
                vec!["back up .codegraph/ and re-run `codegraph init --force`"]
            }
            StorageError::Corrupted { .. } => {
                vec!["the store is unrecoverable; re-run `codegraph index` from scratch"]
            }
            StorageError::SchemaMismatch { .. } => vec!["re-run `codegraph index` to migrate"],
            StorageError::Serialization(_) => vec![],
            StorageError::NodeNotFound(_) => vec!["the node may have been deleted by a sync"],
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolver worker panicked on chunk {chunk}")]
    WorkerPanic { chunk: usize },
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("embedder unavailable: {reason}")]
    EmbedderUnavailable { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model download failed: {reason}")]
    ModelDownload { reason: String },

    #[error("no embeddings indexed")]
    NoEmbeddings,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("type mismatch for argument {argument}: expected {expected}")]
    TypeMismatch { argument: &'static str, expected: &'static str },

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("ambiguous symbol: {0}")]
    Ambiguous(String),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Adapter trait mirroring the teacher's `ErrorContext`: attach a short
/// human message or a path to any underlying error as it crosses a
/// subsystem boundary.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> IndexResult<T>;
    fn with_path(self, path: impl Into<PathBuf>) -> IndexResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> IndexResult<T> {
        self.map_err(|e| IndexError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: impl Into<PathBuf>) -> IndexResult<T> {
        self.map_err(|e| IndexError::General(format!("{}: {e}", path.into().display())))
    }
}
