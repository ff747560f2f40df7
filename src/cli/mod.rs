//! CLI entry point: argument parsing plus the command dispatcher that
//! resolves a project root, loads config, and maps errors onto exit
//! codes (spec §6: 0 success, 1 error, 2 not initialized, 3 locked).

pub mod args;
pub mod commands;

use crate::config::Settings;
use crate::error::IndexError;
use crate::lock::FileLock;
use crate::storage::Store;
use crate::vector::FastEmbedEmbedder;
use args::{Cli, Commands, HooksAction};
use std::path::PathBuf;
use std::process::ExitCode;

const LOCK_NAME: &str = "codegraph.lock";

fn print_error(err: &impl std::fmt::Display) {
    eprintln!("{} {err}", console::style("error:").red().bold());
}

fn resolve_root(root_flag: &Option<PathBuf>) -> Result<PathBuf, ExitCode> {
    let start = root_flag.clone().unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let found = match root_flag {
        // An explicit --root must itself be initialized; it's not a search start point.
        Some(_) => start.join(crate::config::DOT_DIR).is_dir().then(|| start.clone()),
        None => Settings::find_project_root(&start),
    };
    found.ok_or_else(|| {
        eprintln!("not a codegraph project (no .codegraph directory found); run `codegraph init`");
        ExitCode::from(2)
    })
}

fn exit_code_for(err: &IndexError) -> ExitCode {
    match err {
        IndexError::NotInitialized { .. } => ExitCode::from(2),
        IndexError::LockHeld { .. } => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

fn db_path(root: &std::path::Path) -> PathBuf {
    root.join(crate::config::DOT_DIR).join("graph.db")
}

pub async fn run(cli: Cli) -> ExitCode {
    let quiet = cli.quiet;

    if let Commands::Init { force } = &cli.command {
        let root = cli.root.clone().unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        return match commands::init::run(&root, *force, quiet) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                print_error(&e);
                exit_code_for(&e)
            }
        };
    }

    let root = match resolve_root(&cli.root) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let settings = match Settings::load(&root) {
        Ok(s) => s,
        Err(e) => {
            print_error(&e);
            return exit_code_for(&e);
        }
    };

    match &cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Index | Commands::Sync => {
            let _lock = match FileLock::acquire(&root.join(crate::config::DOT_DIR), LOCK_NAME) {
                Ok(l) => l,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&e);
                }
            };
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            let result = commands::index::run(&store, &root, &settings, quiet);
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::Status => {
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            match commands::status::run(&store) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::Query { query, kind, language, path_hint, include_files, limit } => {
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            let result = commands::query::run(
                &store,
                query,
                kind.as_deref(),
                language.as_deref(),
                path_hint.as_deref(),
                *include_files,
                *limit,
            );
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::Context { task, max_nodes, kind, language, path_hint, include_files, include_code } => {
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            let embedder = if settings.enable_embeddings { FastEmbedEmbedder::new().ok() } else { None };
            let embedder_ref: Option<&dyn crate::vector::Embedder> =
                embedder.as_ref().map(|e| e as &dyn crate::vector::Embedder);
            let result = commands::context::run(
                &store,
                embedder_ref,
                task,
                *max_nodes,
                kind.as_deref(),
                language.as_deref(),
                path_hint.as_deref(),
                *include_files,
                *include_code,
            );
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::Hooks { action } => {
            let result = match action {
                HooksAction::Install => commands::hooks::install(&root),
                HooksAction::Remove => commands::hooks::remove(&root),
                HooksAction::Status => commands::hooks::status(&root),
            };
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::Serve { mcp } => {
            if !mcp {
                eprintln!("error: only `serve --mcp` is supported");
                return ExitCode::FAILURE;
            }
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            match commands::serve::run(&root, settings, store).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }

        Commands::ImportScip { path } => {
            let store = match Store::open(&db_path(&root)) {
                Ok(s) => s,
                Err(e) => {
                    print_error(&e);
                    return exit_code_for(&IndexError::Storage(e));
                }
            };
            match commands::import_scip::run(&store, path) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    print_error(&e);
                    exit_code_for(&e)
                }
            }
        }
    }
}
