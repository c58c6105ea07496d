//! Daemon process control: PID file, liveness probing, stop signal.
//!
//! Liveness is a `kill(pid, 0)` probe — if the signal cannot be delivered
//! the recorded PID is treated as dead and the PID file as stale. There is
//! no separate IPC channel; the PID file is the whole control surface.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Control files for one daemon instance under a runtime directory.
#[derive(Debug, Clone)]
pub struct DaemonFiles {
    dir: PathBuf,
}

impl DaemonFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pid_path(&self) -> PathBuf {
        self.dir.join("daemon.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join("daemon.log")
    }

    pub fn port_path(&self) -> PathBuf {
        self.dir.join("http.port")
    }

    /// PID recorded in the PID file, if the file exists and parses.
    pub fn read_pid(&self) -> Option<i32> {
        let content = fs::read_to_string(self.pid_path()).ok()?;
        content.trim().parse().ok()
    }

    /// Port recorded by the running daemon, if any.
    pub fn read_port(&self) -> Option<u16> {
        let content = fs::read_to_string(self.port_path()).ok()?;
        content.trim().parse().ok()
    }

    /// (running, pid) as observed via the PID file plus a liveness probe.
    pub fn status(&self) -> (bool, Option<i32>) {
        match self.read_pid() {
            Some(pid) if pid_alive(pid) => (true, Some(pid)),
            Some(pid) => (false, Some(pid)),
            None => (false, None),
        }
    }

    /// Refuse when a live daemon holds the PID file; clear a stale one.
    pub fn ensure_not_running(&self) -> Result<(), String> {
        if let Some(pid) = self.read_pid() {
            if pid_alive(pid) {
                return Err(format!("daemon already running with PID {pid}"));
            }
            // Stale PID file from a dead process.
            let _ = fs::remove_file(self.pid_path());
            let _ = fs::remove_file(self.port_path());
        }
        Ok(())
    }

    /// Record the current process as the daemon.
    pub fn write_pid(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.pid_path(), std::process::id().to_string())
    }

    /// Record the dashboard's actually-bound port.
    pub fn write_port(&self, port: u16) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.port_path(), port.to_string())
    }

    /// Remove control files on shutdown; missing files are not an error.
    pub fn cleanup(&self) {
        let _ = fs::remove_file(self.pid_path());
        let _ = fs::remove_file(self.port_path());
    }

    /// Send SIGTERM to the recorded daemon.
    pub fn stop(&self) -> Result<i32, String> {
        let (running, pid) = self.status();
        let Some(pid) = pid else {
            return Err("daemon is not running".to_string());
        };
        if !running {
            self.cleanup();
            return Err(format!("daemon is not running (stale PID {pid})"));
        }
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            return Err(format!(
                "failed to signal PID {pid}: {}",
                io::Error::last_os_error()
            ));
        }
        Ok(pid)
    }
}

/// Whether `pid` names a live process (signal-0 probe).
pub fn pid_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}
