//! List worktree or workflow manifest entries.

use std::path::Path;

use flotilla_core::registry::Registry;

pub fn cmd_list(workspace: &Path, args: &[String]) -> i32 {
    let mut json = false;
    let mut workflow = false;
    for arg in args {
        match arg.as_str() {
            "--json" => json = true,
            "--workflow" => workflow = true,
            other => {
                eprintln!("unknown list argument: {other}");
                return 1;
            }
        }
    }

    let registry = Registry::new(workspace);
    if workflow {
        list_workflow(&registry, json)
    } else {
        list_worktrees(&registry, json)
    }
}

fn list_worktrees(registry: &Registry, json: bool) -> i32 {
    let entries = match registry.worktrees() {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to read worktree manifest: {e}");
            return 1;
        }
    };

    if json {
        match serde_json::to_string(&entries) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("failed to encode entries: {e}");
                return 1;
            }
        }
        return 0;
    }

    println!("{:<24} {:<16} {:<20} BASE", "FOLDER", "REPO", "BRANCH");
    for e in &entries {
        let base = if e.base { "yes" } else { "" };
        println!("{:<24} {:<16} {:<20} {}", e.folder, e.repo, e.branch, base);
    }
    0
}

fn list_workflow(registry: &Registry, json: bool) -> i32 {
    let entries = match registry.workflow() {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to read workflow manifest: {e}");
            return 1;
        }
    };

    if json {
        match serde_json::to_string(&entries) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("failed to encode entries: {e}");
                return 1;
            }
        }
        return 0;
    }

    println!("{:<16} {:<20} {:<12} PURPOSE", "REPO", "BRANCH", "STATUS");
    for e in &entries {
        println!(
            "{:<16} {:<20} {:<12} {}",
            e.repo,
            e.branch,
            e.status.to_string(),
            e.purpose
        );
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::records::WorktreeEntry;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(cmd_list(tmp.path(), &strings(&["--bogus"])), 1);
    }

    #[test]
    fn empty_workspace_lists_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(cmd_list(tmp.path(), &[]), 0);
        assert_eq!(cmd_list(tmp.path(), &strings(&["--json"])), 0);
        assert_eq!(cmd_list(tmp.path(), &strings(&["--workflow"])), 0);
    }

    #[test]
    fn lists_registered_entries() {
        let tmp = tempfile::tempdir().unwrap();
        Registry::new(tmp.path())
            .register_worktree(&WorktreeEntry {
                folder: "app".into(),
                repo: "app".into(),
                branch: "main".into(),
                base: true,
            })
            .unwrap();
        assert_eq!(cmd_list(tmp.path(), &[]), 0);
        assert_eq!(cmd_list(tmp.path(), &strings(&["--json"])), 0);
    }
}
