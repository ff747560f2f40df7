//! `codegraph hooks {install,remove,status}` — a git post-commit hook
//! that re-runs `codegraph sync`. Writes with the same temp-then-rename
//! idiom `config::Settings::save` uses for atomic on-disk updates.

use crate::error::{IndexError, IndexResult};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const MARKER: &str = "# installed-by: codegraph hooks install";

fn hook_path(project_root: &Path) -> PathBuf {
    project_root.join(".git").join("hooks").join("post-commit")
}

fn hook_body() -> String {
    format!("#!/bin/sh\n{MARKER}\ncodegraph sync --quiet || true\n")
}

pub fn install(project_root: &Path) -> IndexResult<()> {
    let git_dir = project_root.join(".git");
    if !git_dir.is_dir() {
        return Err(IndexError::General(format!("{} is not a git repository", project_root.display())));
    }
    let hooks_dir = git_dir.join("hooks");
    std::fs::create_dir_all(&hooks_dir).map_err(|e| IndexError::FileWrite { path: hooks_dir.clone(), source: e })?;

    let final_path = hook_path(project_root);
    let tmp_path = final_path.with_extension("tmp");
    std::fs::write(&tmp_path, hook_body()).map_err(|e| IndexError::FileWrite { path: tmp_path.clone(), source: e })?;
    let mut perms = std::fs::metadata(&tmp_path).map_err(|e| IndexError::FileWrite { path: tmp_path.clone(), source: e })?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&tmp_path, perms).map_err(|e| IndexError::FileWrite { path: tmp_path.clone(), source: e })?;
    std::fs::rename(&tmp_path, &final_path).map_err(|e| IndexError::FileWrite { path: final_path, source: e })?;
    println!("Installed post-commit hook");
    Ok(())
}

pub fn remove(project_root: &Path) -> IndexResult<()> {
    let path = hook_path(project_root);
    if let Ok(contents) = std::fs::read_to_string(&path) {
        if !contents.contains(MARKER) {
            return Err(IndexError::General("post-commit hook exists but was not installed by codegraph; refusing to remove".to_string()));
        }
        std::fs::remove_file(&path).map_err(|e| IndexError::FileWrite { path, source: e })?;
        println!("Removed post-commit hook");
    } else {
        println!("No hook installed");
    }
    Ok(())
}

pub fn status(project_root: &Path) -> IndexResult<()> {
    let path = hook_path(project_root);
    match std::fs::read_to_string(&path) {
        Ok(contents) if contents.contains(MARKER) => println!("installed: {}", path.display()),
        Ok(_) => println!("a post-commit hook exists but was not installed by codegraph"),
        Err(_) => println!("not installed"),
    }
    Ok(())
}
