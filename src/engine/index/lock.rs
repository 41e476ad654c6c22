//! Native lock file + crash recovery (§4.4 "Lock recovery"): the index
//! directory is guarded by a `write.lock` file encoding the owning PID, the
//! same shape as Lucene's `NativeFSLockFactory` but implemented directly
//! since the engine owns its own on-disk format rather than delegating to it.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

const LOCK_FILE_NAME: &str = "write.lock";

pub struct IndexLock {
    path: PathBuf,
}

#[cfg(unix)]
fn pid_is_live(pid: i32) -> bool {
    // signal 0 performs no-op permission/existence checks without actually
    // signaling the process (standard POSIX idiom for "is this PID alive").
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn pid_is_live(_pid: i32) -> bool {
    // conservatively assume live on platforms without a cheap liveness probe;
    // an operator can delete the stale lock by hand.
    true
}

impl IndexLock {
    /// Acquires the lock, recovering automatically from a stale lock file
    /// left by a process that is no longer alive, retrying exactly once.
    pub fn acquire(index_dir: &Path) -> EngineResult<Self> {
        let path = index_dir.join(LOCK_FILE_NAME);
        match Self::try_create(&path) {
            Ok(()) => Ok(IndexLock { path }),
            Err(_) => {
                if Self::owner_is_stale(&path) {
                    let _ = std::fs::remove_file(&path);
                    Self::try_create(&path).map_err(|e| {
                        EngineError::index_unavailable(format!("lock recovery failed: {e}"))
                    })?;
                    Ok(IndexLock { path })
                } else {
                    Err(EngineError::index_unavailable(
                        "index lock held by a live process".to_string(),
                    ))
                }
            }
        }
    }

    fn try_create(path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        write!(file, "{}", std::process::id())
    }

    fn owner_is_stale(path: &Path) -> bool {
        let Ok(mut file) = std::fs::File::open(path) else {
            return true;
        };
        let mut contents = String::new();
        if file.read_to_string(&mut contents).is_err() {
            return true;
        }
        match contents.trim().parse::<i32>() {
            Ok(pid) => !pid_is_live(pid),
            Err(_) => true,
        }
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
