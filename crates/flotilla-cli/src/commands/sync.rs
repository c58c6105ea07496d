//! Rebuild the worktree manifest from what is actually on disk.
//!
//! Every directory in the workspace with a `.git` entry (directory for a
//! full checkout, file for a linked worktree) becomes one manifest entry.
//! The rebuilt set replaces the file whole.

use std::path::Path;

use flotilla_core::git::Repo;
use flotilla_core::records::WorktreeEntry;
use flotilla_core::registry::Registry;

use crate::commands::register::infer_repo_name;

pub fn cmd_sync(workspace: &Path, args: &[String]) -> i32 {
    if !args.is_empty() {
        eprintln!("Usage: flotilla sync");
        return 1;
    }

    let dir_entries = match std::fs::read_dir(workspace) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to read workspace: {e}");
            return 1;
        }
    };

    let mut entries: Vec<WorktreeEntry> = Vec::new();
    let mut folders: Vec<_> = dir_entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.path())
        .collect();
    folders.sort();

    for folder_path in folders {
        // `.git` is a directory in a primary checkout, a file in a worktree.
        if !folder_path.join(".git").exists() {
            continue;
        }
        let folder = folder_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let repo = Repo::new(&folder_path);
        let branch = match repo.current_branch() {
            Ok(branch) => branch,
            Err(_) => continue,
        };

        let is_base = branch == "main" || branch == "master";
        let repo_name = infer_repo_name(&folder, &branch, is_base);

        let base_suffix = if is_base { " (base)" } else { "" };
        println!("Found: {folder} -> {repo_name}@{branch}{base_suffix}");

        entries.push(WorktreeEntry {
            folder,
            repo: repo_name,
            branch,
            base: is_base,
        });
    }

    let registry = Registry::new(workspace);
    if let Err(e) = registry.write_worktrees(&entries) {
        eprintln!("failed to write worktree manifest: {e}");
        return 1;
    }

    println!();
    println!("Synced {} entries", entries.len());
    0
}
