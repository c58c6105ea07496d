//! Register an existing checkout as a tracked worktree.

use std::path::Path;

use flotilla_core::git::Repo;
use flotilla_core::records::WorktreeEntry;
use flotilla_core::registry::Registry;

pub fn cmd_register(workspace: &Path, args: &[String]) -> i32 {
    let [folder] = args else {
        eprintln!("Usage: flotilla register <folder>");
        return 1;
    };

    let folder_path = workspace.join(folder);
    let repo = Repo::new(&folder_path);

    let branch = match repo.current_branch() {
        Ok(branch) => branch,
        Err(e) => {
            eprintln!("failed to get branch: {e}");
            return 1;
        }
    };

    let is_base = branch == "main" || branch == "master";
    let repo_name = infer_repo_name(folder, &branch, is_base);

    let entry = WorktreeEntry {
        folder: folder.clone(),
        repo: repo_name.clone(),
        branch: branch.clone(),
        base: is_base,
    };
    let registry = Registry::new(workspace);
    if let Err(e) = registry.register_worktree(&entry) {
        eprintln!("failed to update worktree manifest: {e}");
        return 1;
    }

    let base_suffix = if is_base { " (base)" } else { "" };
    println!("Registered: {folder} -> {repo_name}@{branch}{base_suffix}");
    0
}

/// Non-base folders named `<repo>-<branch>` yield `<repo>`; everything else
/// keeps the folder name as the repo identifier.
pub fn infer_repo_name(folder: &str, branch: &str, is_base: bool) -> String {
    if !is_base && !branch.is_empty() {
        let suffix = format!("-{}", branch.replace('/', "-"));
        if folder.len() > suffix.len() {
            if let Some(stripped) = folder.strip_suffix(&suffix) {
                return stripped.to_string();
            }
        }
    }
    folder.to_string()
}
