//! Daemon control: spawn, stop, and probe the `flotillad` process.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use flotilla_core::config;
use flotilla_core::supervisor::DaemonFiles;

pub fn cmd_daemon(workspace: &Path, args: &[String]) -> i32 {
    match args.first().map(|s| s.as_str()) {
        Some("start") => cmd_start(workspace, &args[1..]),
        Some("stop") => cmd_stop(),
        Some("status") => cmd_status(&args[1..]),
        _ => {
            eprintln!("Usage: flotilla daemon <start|stop|status>");
            1
        }
    }
}

fn cmd_start(workspace: &Path, args: &[String]) -> i32 {
    let cfg = config::load();
    let mut foreground = false;
    let mut interval_secs = cfg.interval_secs;
    let mut port = cfg.port;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--foreground" => foreground = true,
            "--interval" => {
                let Some(value) = iter.next() else {
                    eprintln!("--interval requires a value in seconds");
                    return 1;
                };
                match value.parse() {
                    Ok(v) => interval_secs = v,
                    Err(_) => {
                        eprintln!("invalid interval: {value}");
                        return 1;
                    }
                }
            }
            "--port" => {
                let Some(value) = iter.next() else {
                    eprintln!("--port requires a value");
                    return 1;
                };
                match value.parse() {
                    Ok(v) => port = v,
                    Err(_) => {
                        eprintln!("invalid port: {value}");
                        return 1;
                    }
                }
            }
            other => {
                eprintln!("unknown daemon start argument: {other}");
                return 1;
            }
        }
    }

    if interval_secs == 0 {
        eprintln!("interval must be positive");
        return 1;
    }

    // Reject before spawning anything; a stale PID file is cleared here.
    let files = DaemonFiles::new(config::runtime_dir());
    if let Err(e) = files.ensure_not_running() {
        eprintln!("{e}");
        return 1;
    }

    let exe = match daemon_binary() {
        Ok(exe) => exe,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let mut cmd = Command::new(&exe);
    cmd.arg("--workspace")
        .arg(workspace)
        .arg("--interval")
        .arg(interval_secs.to_string())
        .arg("--port")
        .arg(port.to_string());

    if foreground {
        return match cmd.status() {
            Ok(status) => status.code().unwrap_or(1),
            Err(e) => {
                eprintln!("failed to run {}: {e}", exe.display());
                1
            }
        };
    }

    let log_path = files.log_path();
    if let Err(e) = std::fs::create_dir_all(files.dir()) {
        eprintln!("failed to create {}: {e}", files.dir().display());
        return 1;
    }
    let log = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open {}: {e}", log_path.display());
            return 1;
        }
    };
    let log_err = match log.try_clone() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to clone log handle: {e}");
            return 1;
        }
    };

    cmd.stdin(Stdio::null()).stdout(log).stderr(log_err);
    // Detach from our process group so the daemon survives this exit.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    match cmd.spawn() {
        Ok(child) => {
            println!("daemon started (PID {})", child.id());
            println!("logs: {}", log_path.display());
            0
        }
        Err(e) => {
            eprintln!("failed to spawn {}: {e}", exe.display());
            1
        }
    }
}

/// Find `flotillad`: next to the current executable first, then $PATH.
fn daemon_binary() -> Result<PathBuf, String> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("flotillad");
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Ok(PathBuf::from("flotillad"))
}

fn cmd_stop() -> i32 {
    let files = DaemonFiles::new(config::runtime_dir());
    match files.stop() {
        Ok(pid) => {
            println!("sent stop signal to daemon (PID {pid})");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn cmd_status(args: &[String]) -> i32 {
    let json = args.iter().any(|a| a == "--json");
    let files = DaemonFiles::new(config::runtime_dir());
    let (running, pid) = files.status();

    if json {
        let mut out = serde_json::json!({ "running": running });
        if running {
            out["pid"] = serde_json::json!(pid);
            if let Some(port) = files.read_port() {
                out["port"] = serde_json::json!(port);
            }
        }
        println!("{out}");
        return 0;
    }

    if running {
        match pid {
            Some(pid) => println!("running (PID {pid})"),
            None => println!("running"),
        }
        if let Some(port) = files.read_port() {
            println!("dashboard: http://127.0.0.1:{port}");
        }
    } else {
        println!("not running");
    }
    0
}
