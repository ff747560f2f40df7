//! `tracing` initialization. Logs go to stderr so stdout stays clean for
//! the line-delimited JSON-RPC transport used by `serve --mcp`.

use tracing_subscriber::EnvFilter;

pub fn init(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env("CODEGRAPH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
