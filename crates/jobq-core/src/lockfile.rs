//! PID-file-based single-instance guard and cross-invocation stop signal.

use std::path::{Path, PathBuf};

/// Wraps the `worker.pid` file: an ASCII decimal process identifier, written
/// once by the Supervisor and read by `worker stop` and `status`.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn new(path: PathBuf) -> Self {
        LockFile { path }
    }

    /// Reads the recorded pid, if the file exists and parses.
    pub fn read_pid(&self) -> Option<libc::pid_t> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse::<libc::pid_t>().ok())
    }

    /// Writes the current process's pid, creating the parent directory if
    /// needed.
    pub fn write_current_pid(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, std::process::id().to_string())
    }

    pub fn remove(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    /// True if a pid is recorded and a no-op signal probe against it
    /// succeeds. A recorded pid that is not live is treated as a stale lock,
    /// i.e. absent.
    pub fn holder_is_live(&self) -> bool {
        match self.read_pid() {
            Some(pid) => is_process_alive(pid),
            None => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A no-op signal probe: `kill(pid, 0)` succeeds iff the process exists and
/// is visible to us.
pub fn is_process_alive(pid: libc::pid_t) -> bool {
    // SAFETY: signal 0 sends nothing; this only inspects process existence
    // and permission.
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Sends `SIGTERM` to `pid`. Returns `true` if the signal was delivered.
pub fn terminate(pid: libc::pid_t) -> bool {
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}
