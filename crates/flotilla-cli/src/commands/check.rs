//! One-shot health check over the registered worktrees.
//!
//! Reports per-folder problems (missing folder, undeterminable or
//! mismatched branch, dirty base checkout) and exits non-zero when any
//! folder has one.

use std::path::Path;

use serde::Serialize;

use flotilla_core::git::Repo;
use flotilla_core::registry::Registry;

#[derive(Debug, Serialize)]
struct CheckResult {
    folder: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    problems: Vec<String>,
    ok: bool,
}

pub fn cmd_check(workspace: &Path, args: &[String]) -> i32 {
    let mut quiet = false;
    let mut json = false;
    for arg in args {
        match arg.as_str() {
            "--quiet" | "-q" => quiet = true,
            "--json" => json = true,
            other => {
                eprintln!("unknown check argument: {other}");
                return 1;
            }
        }
    }

    let registry = Registry::new(workspace);
    let entries = match registry.worktrees() {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to read worktree manifest: {e}");
            return 1;
        }
    };

    let mut results = Vec::new();
    let mut has_problems = false;

    for entry in &entries {
        let folder_path = workspace.join(&entry.folder);
        let mut problems = Vec::new();

        if !folder_path.exists() {
            problems.push("folder missing".to_string());
        } else {
            let repo = Repo::new(&folder_path);
            match repo.current_branch() {
                Ok(branch) if branch != entry.branch => {
                    problems.push(format!(
                        "branch mismatch: expected {}, got {branch}",
                        entry.branch
                    ));
                }
                Ok(_) => {}
                Err(_) => problems.push("cannot determine branch".to_string()),
            }
            if entry.base && repo.is_dirty().unwrap_or(false) {
                problems.push("base folder has uncommitted changes".to_string());
            }
        }

        let ok = problems.is_empty();
        if !ok {
            has_problems = true;
        }
        results.push(CheckResult {
            folder: entry.folder.clone(),
            problems,
            ok,
        });
    }

    if json {
        match serde_json::to_string(&results) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("failed to encode results: {e}");
                return 1;
            }
        }
    } else {
        for result in &results {
            if quiet && result.ok {
                continue;
            }
            if result.ok {
                println!("ok  {}", result.folder);
            } else {
                println!("BAD {}", result.folder);
                for problem in &result.problems {
                    println!("  - {problem}");
                }
            }
        }
    }

    if has_problems {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::records::WorktreeEntry;
    use std::process::{Command, Stdio};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .expect("run git");
        assert!(status.success());
    }

    fn init_repo(dir: &Path, branch: &str) {
        std::fs::create_dir(dir).unwrap();
        git(dir, &["init", "-b", branch]);
        git(dir, &["config", "user.email", "test@test"]);
        git(dir, &["config", "user.name", "test"]);
        git(dir, &["commit", "--allow-empty", "-m", "init"]);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(cmd_check(tmp.path(), &strings(&["--bogus"])), 1);
    }

    #[test]
    fn empty_workspace_passes() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(cmd_check(tmp.path(), &[]), 0);
    }

    #[test]
    fn healthy_worktree_passes() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(&tmp.path().join("app"), "main");
        Registry::new(tmp.path())
            .register_worktree(&WorktreeEntry {
                folder: "app".into(),
                repo: "app".into(),
                branch: "main".into(),
                base: true,
            })
            .unwrap();
        assert_eq!(cmd_check(tmp.path(), &[]), 0);
        assert_eq!(cmd_check(tmp.path(), &strings(&["--quiet", "--json"])), 0);
    }

    #[test]
    fn missing_folder_is_a_problem() {
        let tmp = tempfile::tempdir().unwrap();
        Registry::new(tmp.path())
            .register_worktree(&WorktreeEntry {
                folder: "ghost".into(),
                repo: "ghost".into(),
                branch: "main".into(),
                base: true,
            })
            .unwrap();
        assert_eq!(cmd_check(tmp.path(), &[]), 1);
    }

    #[test]
    fn dirty_base_is_a_problem() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("app");
        init_repo(&base, "main");
        std::fs::write(base.join("wip.txt"), "uncommitted").unwrap();
        Registry::new(tmp.path())
            .register_worktree(&WorktreeEntry {
                folder: "app".into(),
                repo: "app".into(),
                branch: "main".into(),
                base: true,
            })
            .unwrap();
        assert_eq!(cmd_check(tmp.path(), &[]), 1);
    }

    #[test]
    fn branch_mismatch_is_a_problem() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(&tmp.path().join("app"), "other");
        Registry::new(tmp.path())
            .register_worktree(&WorktreeEntry {
                folder: "app".into(),
                repo: "app".into(),
                branch: "main".into(),
                base: true,
            })
            .unwrap();
        assert_eq!(cmd_check(tmp.path(), &[]), 1);
    }
}
