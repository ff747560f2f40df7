//! Cross-process file lock with stale-PID recovery, per spec §5.
//!
//! The lock file at `.codegraph/<name>.lock` contains the holder's PID.
//! Acquisition uses exclusive-create; a holder whose PID is no longer
//! alive is evicted before retrying. Release only removes the file if the
//! PID recorded in it is still ours.

use crate::error::{IndexError, IndexResult};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub struct FileLock {
    path: PathBuf,
    pid: u32,
}

impl FileLock {
    /// Acquire the lock, evicting a stale holder first if present.
    pub fn acquire(dot_dir: &Path, name: &str) -> IndexResult<Self> {
        std::fs::create_dir_all(dot_dir)
            .map_err(|e| IndexError::FileWrite { path: dot_dir.to_path_buf(), source: e })?;
        let path = dot_dir.join(format!("{name}.lock"));
        let pid = std::process::id();

        match try_create_exclusive(&path, pid) {
            Ok(()) => return Ok(FileLock { path, pid }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(IndexError::FileWrite { path, source: e }),
        }

        if let Some(holder_pid) = read_holder_pid(&path) {
            if pid_is_alive(holder_pid) {
                return Err(IndexError::LockHeld { pid: holder_pid });
            }
            let _ = std::fs::remove_file(&path);
        }

        try_create_exclusive(&path, pid)
            .map(|()| FileLock { path: path.clone(), pid })
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    let holder = read_holder_pid(&path).unwrap_or(0);
                    IndexError::LockHeld { pid: holder }
                } else {
                    IndexError::FileWrite { path: path.clone(), source: e }
                }
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if read_holder_pid(&self.path) == Some(self.pid) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn try_create_exclusive(path: &Path, pid: u32) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    write!(file, "{pid}")?;
    Ok(())
}

fn read_holder_pid(path: &Path) -> Option<u32> {
    let mut contents = String::new();
    std::fs::File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
    // Best effort off Linux: assume any recorded holder might still be
    // alive rather than risk clobbering a live writer's lock.
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_then_drop_removes_lock_file() {
        let dir = TempDir::new().unwrap();
        let lock_path;
        {
            let lock = FileLock::acquire(dir.path(), "index").unwrap();
            lock_path = lock.path().to_path_buf();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = TempDir::new().unwrap();
        let _first = FileLock::acquire(dir.path(), "index").unwrap();
        let second = FileLock::acquire(dir.path(), "index");
        assert!(second.is_err());
    }

    #[test]
    fn stale_lock_with_dead_pid_is_recovered() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        let lock_path = dir.path().join("index.lock");
        // A PID essentially guaranteed not to be alive in test environments.
        std::fs::write(&lock_path, "999999999").unwrap();
        let lock = FileLock::acquire(dir.path(), "index");
        assert!(lock.is_ok());
    }
}
