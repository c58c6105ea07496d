//! Remove a worktree and settle its manifests.
//!
//! The branch is deleted with a non-force `-d`: success means git considers
//! it fully merged and the workflow entry advances to `merged`; refusal
//! means unmerged work is being walked away from, recorded as `abandoned`.

use std::path::Path;

use flotilla_core::git::Repo;
use flotilla_core::records::WorkflowStatus;
use flotilla_core::registry::Registry;

pub fn cmd_cleanup(workspace: &Path, args: &[String]) -> i32 {
    let [repo_name, branch] = args else {
        eprintln!("Usage: flotilla cleanup <repo> <branch>");
        return 1;
    };

    let folder = format!("{repo_name}-{}", branch.replace('/', "-"));
    let worktree_path = workspace.join(&folder);

    let registry = Registry::new(workspace);
    let base_repo = Repo::new(registry.repo_path_for(repo_name));

    println!("Removing worktree: {}", worktree_path.display());
    if let Err(e) = base_repo.worktree_remove(&worktree_path) {
        eprintln!("failed to remove worktree: {e}");
        return 1;
    }

    let status = match base_repo.branch_delete(branch, false) {
        Ok(()) => WorkflowStatus::Merged,
        Err(_) => WorkflowStatus::Abandoned,
    };

    if let Err(e) = registry.set_workflow_status(repo_name, branch, status) {
        eprintln!("failed to update workflow manifest: {e}");
        return 1;
    }
    if let Err(e) = registry.remove_worktree(&folder) {
        eprintln!("failed to update worktree manifest: {e}");
        return 1;
    }

    println!("Done. Worktree removed: {folder} ({status})");
    0
}
