//! PID file for the running daemon.
//!
//! The daemon records its PID on startup so `waybar-eyes reset` (bound to the
//! waybar on-click action) can deliver `SIGUSR1` without `pkill` pattern
//! matching. The file is removed again when the daemon exits in order.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors that can occur while handling the PID file.
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PID file {path} does not contain a PID: {content:?}")]
    Parse { path: PathBuf, content: String },
    #[error("waybar-eyes is already running (pid {0})")]
    AlreadyRunning(u32),
    #[error("waybar-eyes is not running (stale pid {0})")]
    NotRunning(u32),
    #[error("Could not signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// A PID file owned by this process; removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Record the current process at `path`.
    ///
    /// Fails if the file names another live process.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, PidFileError> {
        let path = path.into();
        let pid = std::process::id();

        match read_pid(&path) {
            Ok(existing) if existing != pid && is_pid_alive(existing) => {
                return Err(PidFileError::AlreadyRunning(existing));
            }
            Ok(existing) if existing != pid => {
                debug!(stale = existing, path = %path.display(), "Replacing stale PID file");
            }
            _ => {}
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PidFileError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, format!("{pid}\n")).map_err(|source| PidFileError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Another instance may have taken over the file in the meantime.
        if read_pid(&self.path).ok() != Some(self.pid) {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(error = %e, path = %self.path.display(), "Could not remove PID file");
        }
    }
}

/// Read the PID recorded at `path`.
pub fn read_pid(path: &Path) -> Result<u32, PidFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| PidFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&pid| pid > 0)
        .ok_or_else(|| PidFileError::Parse {
            path: path.to_path_buf(),
            content: content.trim().to_string(),
        })
}

pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        // SAFETY: signal 0 only checks for existence and permission.
        if unsafe { libc::kill(raw, 0) } == 0 {
            return true;
        }
        std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Ask the daemon recorded at `path` to reset its counter.
///
/// Returns the PID that was signalled.
#[cfg(unix)]
pub fn send_reset(path: &Path) -> Result<u32, PidFileError> {
    let pid = read_pid(path)?;
    let raw = i32::try_from(pid).map_err(|_| PidFileError::NotRunning(pid))?;

    if !is_pid_alive(pid) {
        return Err(PidFileError::NotRunning(pid));
    }

    // SAFETY: SIGUSR1 delivery to a PID we just verified exists.
    if unsafe { libc::kill(raw, libc::SIGUSR1) } != 0 {
        return Err(PidFileError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        });
    }

    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Far above any kernel pid_max.
    const DEAD_PID: u32 = i32::MAX as u32;

    #[test]
    fn test_create_read_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("waybar-eyes.pid");

        {
            let pid_file = PidFile::create(&path).unwrap();
            assert_eq!(pid_file.pid(), std::process::id());
            assert_eq!(read_pid(&path).unwrap(), std::process::id());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_stale_pid_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waybar-eyes.pid");
        std::fs::write(&path, format!("{DEAD_PID}\n")).unwrap();

        let pid_file = PidFile::create(&path).unwrap();
        assert_eq!(read_pid(pid_file.path()).unwrap(), std::process::id());
    }

    #[cfg(unix)]
    #[test]
    fn test_live_pid_blocks_second_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waybar-eyes.pid");
        // SAFETY: getppid has no preconditions.
        let parent = unsafe { libc::getppid() } as u32;
        std::fs::write(&path, parent.to_string()).unwrap();

        assert!(matches!(
            PidFile::create(&path),
            Err(PidFileError::AlreadyRunning(pid)) if pid == parent
        ));
        assert_eq!(read_pid(&path).unwrap(), parent);
    }

    #[test]
    fn test_garbage_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waybar-eyes.pid");
        std::fs::write(&path, "not a pid").unwrap();

        assert!(matches!(read_pid(&path), Err(PidFileError::Parse { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_send_reset_to_dead_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waybar-eyes.pid");
        std::fs::write(&path, DEAD_PID.to_string()).unwrap();

        assert!(matches!(
            send_reset(&path),
            Err(PidFileError::NotRunning(DEAD_PID))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_send_reset_without_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            send_reset(&dir.path().join("missing.pid")),
            Err(PidFileError::Io { .. })
        ));
    }
}
