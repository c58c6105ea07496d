//! Advisory file locking for the record store.
//!
//! Each data file is paired with a `<file>.lock` sentinel; the sentinel is
//! only ever `flock(2)`-ed, never parsed as data. The lock is advisory: it
//! serializes cooperating processes on one machine and degrades to undefined
//! behavior on network filesystems.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// An acquired-on-demand `flock` over a `.lock` sentinel file.
///
/// The lock (if held) is released when the value is dropped, so error paths
/// release it too.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Open (creating if needed) the sentinel for `path`, without locking yet.
    /// Parent directories are created so first use of a workspace works.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(Path::new(&lock_path))?;
        Ok(Self { file })
    }

    /// Block until an exclusive (writer) lock is held.
    pub fn lock_exclusive(&self) -> io::Result<()> {
        self.flock(libc::LOCK_EX)
    }

    /// Block until a shared (reader) lock is held.
    pub fn lock_shared(&self) -> io::Result<()> {
        self.flock(libc::LOCK_SH)
    }

    fn flock(&self, operation: libc::c_int) -> io::Result<()> {
        let rc = unsafe { libc::flock(self.file.as_raw_fd(), operation) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
