//! Git capability: everything the fleet needs from a repository, via the
//! `git` binary. Failures surface as `Err(String)` with the command context;
//! callers that can degrade (the reconciler) treat them as "unknown".

use std::path::{Path, PathBuf};
use std::process::Command;

/// Operations against one repository checkout (base folder or worktree).
#[derive(Debug, Clone)]
pub struct Repo {
    path: PathBuf,
}

impl Repo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| format!("git {}: {e}", args.join(" ")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {}: {}", args.join(" "), stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Current branch name (`HEAD` when detached).
    pub fn current_branch(&self) -> Result<String, String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Whether the working tree has uncommitted changes.
    pub fn is_dirty(&self) -> Result<bool, String> {
        let out = self.run(&["status", "--porcelain"])?;
        Ok(!out.is_empty())
    }

    /// Commits on `branch` not yet on `origin/<branch>`. A branch without an
    /// upstream counts as zero, not an error.
    pub fn unpushed_count(&self, branch: &str) -> Result<u32, String> {
        let range = format!("origin/{branch}..{branch}");
        match self.run(&["rev-list", "--count", &range]) {
            Ok(out) => Ok(out.parse().unwrap_or(0)),
            Err(_) => Ok(0),
        }
    }

    /// Hash of the current HEAD commit.
    pub fn head_commit(&self) -> Result<String, String> {
        self.run(&["rev-parse", "HEAD"])
    }

    /// Subject line of a commit.
    pub fn commit_message(&self, commit: &str) -> Result<String, String> {
        self.run(&["log", "-1", "--format=%s", commit])
    }

    /// `git worktree add -b <branch> <path> [start_point]`
    pub fn worktree_add(&self, path: &Path, branch: &str, start_point: &str) -> Result<(), String> {
        let path = path.to_string_lossy();
        let mut args: Vec<&str> = vec!["worktree", "add", "-b", branch, path.as_ref()];
        if !start_point.is_empty() {
            args.push(start_point);
        }
        self.run(&args).map(|_| ())
    }

    /// Attach a worktree to an existing branch.
    pub fn worktree_add_existing(&self, path: &Path, branch: &str) -> Result<(), String> {
        self.run(&["worktree", "add", &path.to_string_lossy(), branch])
            .map(|_| ())
    }

    pub fn worktree_remove(&self, path: &Path) -> Result<(), String> {
        self.run(&["worktree", "remove", &path.to_string_lossy()])
            .map(|_| ())
    }

    /// All worktrees of this repository, porcelain-parsed.
    pub fn worktree_list(&self) -> Result<Vec<WorktreeInfo>, String> {
        let out = self.run(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list(&out))
    }

    /// Delete a branch; `force` uses `-D`.
    pub fn branch_delete(&self, branch: &str, force: bool) -> Result<(), String> {
        let flag = if force { "-D" } else { "-d" };
        self.run(&["branch", flag, branch]).map(|_| ())
    }

    pub fn fetch(&self) -> Result<(), String> {
        self.run(&["fetch", "--prune"]).map(|_| ())
    }

    pub fn remote_branch_exists(&self, branch: &str) -> bool {
        let refname = format!("origin/{branch}");
        self.run(&["rev-parse", "--verify", &refname]).is_ok()
    }

    /// Remote branch names with the `origin/` prefix stripped.
    pub fn list_remote_branches(&self) -> Result<Vec<String>, String> {
        let out = self.run(&["branch", "-r", "--format=%(refname:short)"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "origin/HEAD")
            .filter_map(|l| l.strip_prefix("origin/"))
            .map(String::from)
            .collect())
    }
}

/// One entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: String,
    pub bare: bool,
}

fn parse_worktree_list(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in output.lines() {
        if line.is_empty() {
            if let Some(info) = current.take() {
                worktrees.push(info);
            }
            continue;
        }
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(info) = current.take() {
                worktrees.push(info);
            }
            current = Some(WorktreeInfo {
                path: PathBuf::from(path),
                branch: String::new(),
                bare: false,
            });
        } else if let Some(refname) = line.strip_prefix("branch ") {
            if let Some(info) = current.as_mut() {
                // refs/heads/feat -> feat
                info.branch = refname.rsplit('/').next().unwrap_or(refname).to_string();
            }
        } else if line == "bare" {
            if let Some(info) = current.as_mut() {
                info.bare = true;
            }
        }
    }
    if let Some(info) = current {
        worktrees.push(info);
    }
    worktrees
}
