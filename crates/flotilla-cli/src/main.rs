mod commands;

use std::path::PathBuf;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let code = run(&args);
    std::process::exit(code);
}

fn run(args: &[String]) -> i32 {
    let mut idx = 1;
    let mut workspace: Option<PathBuf> = None;

    // Global workspace flag, before the subcommand.
    while idx < args.len() {
        match args[idx].as_str() {
            "-w" | "--workspace" => {
                let Some(path) = args.get(idx + 1) else {
                    eprintln!("--workspace requires a path");
                    return 1;
                };
                workspace = Some(PathBuf::from(path));
                idx += 2;
            }
            _ => break,
        }
    }

    let workspace = workspace
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match args.get(idx).map(|s| s.as_str()) {
        Some("help") | Some("--help") | Some("-h") => cmd_help(),
        Some("daemon") => commands::daemon::cmd_daemon(&workspace, &args[idx + 1..]),
        Some("new") => commands::new::cmd_new(&workspace, &args[idx + 1..]),
        Some("register") => commands::register::cmd_register(&workspace, &args[idx + 1..]),
        Some("cleanup") => commands::cleanup::cmd_cleanup(&workspace, &args[idx + 1..]),
        Some("list") => commands::list::cmd_list(&workspace, &args[idx + 1..]),
        Some("sync") => commands::sync::cmd_sync(&workspace, &args[idx + 1..]),
        Some("check") => commands::check::cmd_check(&workspace, &args[idx + 1..]),
        Some("projects") => commands::projects::cmd_projects(&workspace, &args[idx + 1..]),
        _ => {
            cmd_help();
            1
        }
    }
}

fn cmd_help() -> i32 {
    println!("flotilla {}", env!("CARGO_PKG_VERSION"));
    println!("Worktree fleet management for parallel AI-assisted development.");
    println!();
    println!("Usage: flotilla [-w <workspace>] <command> [options]");
    println!();
    println!("Commands:");
    println!("  new <repo> <branch>       Create a worktree on a new branch");
    println!("    --based-on <branch>     Start point (default: main)");
    println!("    --purpose <text>        Purpose recorded in the workflow log");
    println!("  register <folder>         Register an existing folder as a worktree");
    println!("  cleanup <repo> <branch>   Remove a worktree and update manifests");
    println!("  list [--workflow] [--json]");
    println!("                            List worktrees or workflow entries");
    println!("  sync                      Rebuild the worktree manifest from disk");
    println!("  check [--quiet] [--json]  Check worktree health, exit 1 on problems");
    println!("  projects list             List project mappings");
    println!("  projects add <name> <github-repo> [path]");
    println!("                            Add a project mapping");
    println!("  daemon start [--foreground] [--interval <secs>] [--port <port>]");
    println!("  daemon stop");
    println!("  daemon status [--json]");
    println!();
    println!("Examples:");
    println!("  flotilla new app feat/widgets --purpose \"widget support\"");
    println!("  flotilla list --json");
    println!("  flotilla daemon start --interval 300");
    0
}
