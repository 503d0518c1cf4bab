//! Pid-file guard behavior against real files in a temp directory.

use std::fs;

use dispatch_core::{read_pid_file, write_pid_file, PidError, PidLock};
use tempfile::TempDir;

fn own_pid() -> u32 {
    std::process::id()
}

#[test]
fn fresh_path_gets_current_pid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");

    write_pid_file(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), own_pid().to_string());
    assert_eq!(read_pid_file(&path), Some(own_pid()));
}

#[cfg(unix)]
#[test]
fn second_call_from_live_process_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");

    write_pid_file(&path).unwrap();
    let err = write_pid_file(&path).unwrap_err();

    assert!(matches!(err, PidError::AlreadyRunning { pid } if pid == own_pid()));
    assert_eq!(err.to_string(), format!("pid already running: {}", own_pid()));
}

#[cfg(unix)]
#[test]
fn dead_pid_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");

    // A reaped child's pid no longer refers to a running process.
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead = child.id();
    child.wait().unwrap();
    fs::write(&path, dead.to_string()).unwrap();

    write_pid_file(&path).unwrap();

    assert_eq!(read_pid_file(&path), Some(own_pid()));
}

#[test]
fn corrupt_content_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");
    fs::write(&path, "not a pid\nat all").unwrap();

    write_pid_file(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), own_pid().to_string());
}

#[test]
fn longer_stale_content_is_truncated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");
    fs::write(&path, "0000000000000000000000").unwrap();

    write_pid_file(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), own_pid().to_string());
}

#[test]
fn missing_directory_is_a_write_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("app.pid");

    let err = write_pid_file(&path).unwrap_err();

    assert!(matches!(err, PidError::Write { .. }));
}

#[cfg(unix)]
#[test]
fn pid_file_is_owner_and_group_writable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.pid");
    write_pid_file(&path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o600, 0o600);
    assert_eq!(mode & 0o111, 0);
}

// ---------------------------------------------------------------------------
// PidLock
// ---------------------------------------------------------------------------

#[test]
fn lock_writes_pid_and_empties_file_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.pid");

    let lock = PidLock::acquire(&path).unwrap();
    assert_eq!(lock.pid(), own_pid());
    assert_eq!(lock.path(), path.as_path());
    assert_eq!(read_pid_file(&path), Some(own_pid()));

    drop(lock);
    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
    assert_eq!(read_pid_file(&path), None);
}

#[cfg(unix)]
#[test]
fn held_lock_rejects_second_holder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.pid");

    let _lock = PidLock::acquire(&path).unwrap();
    let err = PidLock::acquire(&path).unwrap_err();

    assert!(matches!(err, PidError::AlreadyRunning { pid } if pid == own_pid()));
}

#[test]
fn lock_can_be_reacquired_after_release() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.pid");

    drop(PidLock::acquire(&path).unwrap());
    let lock = PidLock::acquire(&path).unwrap();

    assert_eq!(read_pid_file(lock.path()), Some(own_pid()));
}

#[cfg(unix)]
#[test]
fn reacquired_lock_holds_the_file_at_the_path() {
    use std::os::unix::fs::MetadataExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.pid");

    let first = PidLock::acquire(&path).unwrap();
    let inode = fs::metadata(&path).unwrap().ino();
    drop(first);

    let second = PidLock::acquire(&path).unwrap();
    assert_eq!(fs::metadata(second.path()).unwrap().ino(), inode);
    assert_eq!(read_pid_file(&path), Some(own_pid()));

    let err = PidLock::acquire(&path).unwrap_err();
    assert!(matches!(err, PidError::AlreadyRunning { pid } if pid == own_pid()));
}

#[test]
fn lock_replaces_stale_unlocked_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.pid");
    fs::write(&path, "99999999999").unwrap();

    let _lock = PidLock::acquire(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), own_pid().to_string());
}
