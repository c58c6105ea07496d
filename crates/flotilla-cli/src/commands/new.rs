//! Create a worktree on a new branch and record it in both manifests.

use std::path::Path;

use chrono::Utc;

use flotilla_core::git::Repo;
use flotilla_core::records::{WorkflowEntry, WorkflowStatus, WorktreeEntry};
use flotilla_core::registry::Registry;

pub fn cmd_new(workspace: &Path, args: &[String]) -> i32 {
    let mut positional = Vec::new();
    let mut based_on = String::new();
    let mut purpose = String::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--based-on" => {
                let Some(value) = iter.next() else {
                    eprintln!("--based-on requires a branch name");
                    return 1;
                };
                based_on = value.clone();
            }
            "--purpose" => {
                let Some(value) = iter.next() else {
                    eprintln!("--purpose requires a description");
                    return 1;
                };
                purpose = value.clone();
            }
            other => positional.push(other.to_string()),
        }
    }

    let [repo_name, branch] = positional.as_slice() else {
        eprintln!("Usage: flotilla new <repo> <branch> [--based-on <branch>] [--purpose <text>]");
        return 1;
    };

    // Branch separators become dashes in the folder name.
    let folder = format!("{repo_name}-{}", branch.replace('/', "-"));
    let worktree_path = workspace.join(&folder);

    let registry = Registry::new(workspace);
    let base_repo = Repo::new(registry.repo_path_for(repo_name));

    if based_on.is_empty() {
        based_on = "main".to_string();
    }

    println!("Creating worktree: {}", worktree_path.display());
    if let Err(e) = base_repo.worktree_add(&worktree_path, branch, &based_on) {
        eprintln!("failed to create worktree: {e}");
        return 1;
    }

    let workflow = WorkflowEntry {
        repo: repo_name.clone(),
        branch: branch.clone(),
        based_on,
        purpose,
        status: WorkflowStatus::Active,
        created: Utc::now(),
    };
    if let Err(e) = registry.append_workflow(&workflow) {
        eprintln!("failed to update workflow manifest: {e}");
        return 1;
    }

    let entry = WorktreeEntry {
        folder: folder.clone(),
        repo: repo_name.clone(),
        branch: branch.clone(),
        base: false,
    };
    if let Err(e) = registry.register_worktree(&entry) {
        eprintln!("failed to update worktree manifest: {e}");
        return 1;
    }

    println!("Done. Worktree created at: {}", worktree_path.display());
    0
}
