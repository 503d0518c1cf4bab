//! Single-instance guard built on a pid file.
//!
//! Format: the decimal pid of the owning process, nothing else.
//!
//! # Guards
//! - [`write_pid_file`]: read, probe, then overwrite. Not atomic; two
//!   processes starting at the same moment can both pass the check and both
//!   write. Any failure to read, parse or probe the stored pid counts as "no
//!   previous instance".
//! - [`PidLock`]: holds an advisory exclusive lock on the file for as long as
//!   the value lives, which closes that window. On drop the file is emptied
//!   and unlocked but left in place; the OS drops the lock if the process
//!   dies first.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, trace};

use crate::error::PidError;

#[cfg(unix)]
use nix::sys::signal;
#[cfg(unix)]
use nix::unistd::Pid;

#[cfg(unix)]
const PID_FILE_MODE: u32 = 0o664;

/// Write the current pid to `path` unless a live process already owns it.
pub fn write_pid_file(path: impl AsRef<Path>) -> Result<(), PidError> {
    let path = path.as_ref();

    if let Some(pid) = read_pid_file(path) {
        if is_process_running(pid) {
            return Err(PidError::AlreadyRunning { pid });
        }
        debug!(pid, path = %path.display(), "replacing stale pid file");
    }

    let pid = std::process::id();
    open_pid_file(path, true)
        .and_then(|mut file| file.write_all(pid.to_string().as_bytes()))
        .map_err(|source| PidError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Read and parse the pid stored at `path`.
///
/// Returns `None` if the file is missing, unreadable, or does not hold a
/// positive integer.
pub fn read_pid_file(path: impl AsRef<Path>) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    parse_pid(&content)
}

fn parse_pid(content: &str) -> Option<u32> {
    content.trim().parse::<u32>().ok().filter(|pid| *pid > 0)
}

/// Probe `pid` with the null signal.
///
/// # Platform behavior
/// - **Unix**: `kill(pid, 0)`. `true` only if the process exists and this
///   user may signal it; `ESRCH` and `EPERM` both report `false`.
/// - **Other**: Always returns `false`.
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match signal::kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(errno) => {
                trace!(pid, %errno, "liveness probe failed");
                false
            }
        }
    }

    #[cfg(not(unix))]
    {
        trace!(pid, "no liveness probe on this platform");
        false
    }
}

fn open_pid_file(path: &Path, truncate: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(truncate);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(PID_FILE_MODE);
    }
    options.open(path)
}

/// A pid file held under an exclusive advisory lock.
#[derive(Debug)]
pub struct PidLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl PidLock {
    /// Lock `path` and write the current pid into it.
    ///
    /// Fails with `AlreadyRunning` if another handle holds the lock. The pid
    /// reported is whatever the holder wrote, or 0 if it cannot be read.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, PidError> {
        let path = path.into();
        let write_err = |source| PidError::Write {
            path: path.clone(),
            source,
        };

        let mut file = open_pid_file(&path, false).map_err(write_err)?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                let pid = read_pid_file(&path).unwrap_or(0);
                return Err(PidError::AlreadyRunning { pid });
            }
            return Err(write_err(e));
        }

        let pid = std::process::id();
        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(pid.to_string().as_bytes()))
            .and_then(|()| file.flush())
            .map_err(write_err)?;

        debug!(pid, path = %path.display(), "pid lock acquired");
        Ok(Self { file, path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        // Truncate, never unlink: other acquirers may already hold a handle
        // to this inode.
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "pid lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_padded_pids() {
        assert_eq!(parse_pid("1234"), Some(1234));
        assert_eq!(parse_pid("1234\n"), Some(1234));
        assert_eq!(parse_pid("  77 "), Some(77));
    }

    #[test]
    fn rejects_corrupt_or_non_positive_pids() {
        assert_eq!(parse_pid(""), None);
        assert_eq!(parse_pid("abc"), None);
        assert_eq!(parse_pid("12 34"), None);
        assert_eq!(parse_pid("-5"), None);
        assert_eq!(parse_pid("0"), None);
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }

    #[test]
    fn out_of_range_pid_is_not_running() {
        assert!(!is_process_running(u32::MAX));
    }
}
