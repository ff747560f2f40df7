//! `codegraph serve --mcp` — launches the stdio MCP server, grounded on
//! the teacher's `rmcp::{ServiceExt, transport::stdio}` launch sequence.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::mcp::GraphServer;
use crate::storage::Store;
use rmcp::{transport::stdio, ServiceExt};
use std::path::Path;

pub async fn run(project_root: &Path, settings: Settings, store: Store) -> IndexResult<()> {
    let server = GraphServer::new();
    server.open(project_root.to_path_buf(), settings, store).await;

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| IndexError::General(format!("failed to start MCP server: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| IndexError::General(format!("MCP server error: {e}")))?;

    Ok(())
}
