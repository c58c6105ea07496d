mod activity;
mod broadcast;
mod http;
mod reconciler;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flotilla_core::config;
use flotilla_core::registry::Registry;
use flotilla_core::supervisor::DaemonFiles;

use broadcast::Broadcaster;
use http::AppState;
use reconciler::Reconciler;

#[derive(Debug, Clone, PartialEq)]
struct DaemonArgs {
    workspace: PathBuf,
    interval_secs: u64,
    port: u16,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<DaemonArgs, String> {
    let cfg = config::load();
    let mut workspace: Option<PathBuf> = None;
    let mut interval_secs = cfg.interval_secs;
    let mut port = cfg.port;
    let mut args = args.into_iter();

    while let Some(argument) = args.next() {
        match argument.as_str() {
            "--workspace" | "-w" => {
                let Some(path) = args.next() else {
                    return Err("--workspace requires a path".to_string());
                };
                workspace = Some(PathBuf::from(path));
            }
            "--interval" => {
                let Some(value) = args.next() else {
                    return Err("--interval requires a value in seconds".to_string());
                };
                interval_secs = value
                    .parse()
                    .map_err(|_| format!("invalid interval: {value}"))?;
            }
            "--port" => {
                let Some(value) = args.next() else {
                    return Err("--port requires a value".to_string());
                };
                port = value.parse().map_err(|_| format!("invalid port: {value}"))?;
            }
            _ => {
                return Err(format!("unknown flotillad argument: {argument}"));
            }
        }
    }

    if interval_secs == 0 {
        return Err("interval must be positive".to_string());
    }

    let workspace = match workspace {
        Some(w) => w,
        None => std::env::current_dir().map_err(|e| format!("cannot resolve cwd: {e}"))?,
    };

    Ok(DaemonArgs {
        workspace,
        interval_secs,
        port,
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("flotillad: {e}");
            process::exit(1);
        }
    };

    // PID file protocol: refuse a duplicate reconciler against the same
    // files, clear stale leftovers, then claim the file.
    let files = DaemonFiles::new(config::runtime_dir());
    if let Err(e) = files.ensure_not_running() {
        eprintln!("flotillad: {e}");
        process::exit(1);
    }
    if let Err(e) = files.write_pid() {
        eprintln!("flotillad: failed to write PID file: {e}");
        process::exit(1);
    }

    let broadcaster = Arc::new(Broadcaster::new());
    let shutdown = Arc::new(Notify::new());

    // Dashboard server: preferred port first, any free port as fallback,
    // the bound port recorded for clients.
    let state = Arc::new(AppState {
        registry: Registry::new(&args.workspace),
        broadcaster: broadcaster.clone(),
    });
    let app = http::router(state);
    let preferred = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = match tokio::net::TcpListener::bind(preferred).await {
        Ok(l) => l,
        Err(_) => match tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await
        {
            Ok(l) => l,
            Err(e) => {
                eprintln!("flotillad: cannot bind dashboard listener: {e}");
                files.cleanup();
                process::exit(1);
            }
        },
    };
    let bound = listener.local_addr().map(|a| a.port()).unwrap_or(args.port);
    if let Err(e) = files.write_port(bound) {
        warn!(error = %e, "failed to record dashboard port");
    }
    info!(port = bound, "dashboard listening on http://127.0.0.1:{bound}");

    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.notified().await })
            .await;
        if let Err(e) = result {
            error!(error = %e, "dashboard server error");
        }
    });

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("flotillad: failed to register SIGTERM: {e}");
            files.cleanup();
            process::exit(1);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("flotillad: failed to register SIGINT: {e}");
            files.cleanup();
            process::exit(1);
        }
    };
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("flotillad: failed to register SIGHUP: {e}");
            files.cleanup();
            process::exit(1);
        }
    };

    let mut reconciler = Reconciler::new(&args.workspace, broadcaster);
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    // A cycle that overruns the interval delays the next tick instead of
    // bursting; cycles never overlap.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        pid = process::id(),
        interval_secs = args.interval_secs,
        workspace = %args.workspace.display(),
        "daemon running"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // External-process work is blocking; keep the HTTP tasks
                // responsive while a cycle runs.
                tokio::task::block_in_place(|| reconciler.run_cycle());
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, stopping");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, stopping");
                break;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, stopping");
                break;
            }
        }
    }

    // Let in-flight HTTP responses finish; open event streams would hold
    // the server forever, so the wait is bounded.
    shutdown.notify_waiters();
    if tokio::time::timeout(Duration::from_secs(5), &mut server)
        .await
        .is_err()
    {
        server.abort();
    }
    files.cleanup();
    info!("daemon stopped");
}
