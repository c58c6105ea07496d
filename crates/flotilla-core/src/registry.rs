//! Typed façade over the record store.
//!
//! One read/write pair per record kind plus the common lookups. Every
//! convenience operation issues a single store call per critical section:
//! remove-by-folder is lock/read/filter/write as one read and one overwrite,
//! never two writes.

use std::io;
use std::path::{Path, PathBuf};

use crate::records::{
    ActivityEvent, HealthSnapshot, ProjectEntry, WorkflowEntry, WorkflowStatus, WorktreeEntry,
};
use crate::store::{RecordKind, Store};

/// Per-process view over one workspace's record files. Constructed once by
/// the invoking command or daemon and passed explicitly; there is no global
/// cached instance.
#[derive(Debug, Clone)]
pub struct Registry {
    store: Store,
}

impl Registry {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            store: Store::new(workspace),
        }
    }

    pub fn workspace(&self) -> &Path {
        self.store.base_dir()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // --- worktree entries ---

    pub fn worktrees(&self) -> io::Result<Vec<WorktreeEntry>> {
        self.store.read_all(RecordKind::Worktrees)
    }

    pub fn write_worktrees(&self, entries: &[WorktreeEntry]) -> io::Result<()> {
        self.store.overwrite(RecordKind::Worktrees, entries)
    }

    pub fn register_worktree(&self, entry: &WorktreeEntry) -> io::Result<()> {
        self.store.append(RecordKind::Worktrees, entry)
    }

    pub fn find_worktree(&self, folder: &str) -> io::Result<Option<WorktreeEntry>> {
        Ok(self.worktrees()?.into_iter().find(|e| e.folder == folder))
    }

    /// Drop the entry for `folder`. Returns whether anything was removed.
    pub fn remove_worktree(&self, folder: &str) -> io::Result<bool> {
        let entries = self.worktrees()?;
        let kept: Vec<WorktreeEntry> = entries
            .iter()
            .filter(|e| e.folder != folder)
            .cloned()
            .collect();
        let removed = kept.len() != entries.len();
        if removed {
            self.write_worktrees(&kept)?;
        }
        Ok(removed)
    }

    // --- workflow entries ---

    pub fn workflow(&self) -> io::Result<Vec<WorkflowEntry>> {
        self.store.read_all(RecordKind::Workflow)
    }

    pub fn write_workflow(&self, entries: &[WorkflowEntry]) -> io::Result<()> {
        self.store.overwrite(RecordKind::Workflow, entries)
    }

    pub fn append_workflow(&self, entry: &WorkflowEntry) -> io::Result<()> {
        self.store.append(RecordKind::Workflow, entry)
    }

    pub fn find_workflow(&self, repo: &str, branch: &str) -> io::Result<Option<WorkflowEntry>> {
        Ok(self
            .workflow()?
            .into_iter()
            .find(|e| e.repo == repo && e.branch == branch))
    }

    /// Advance the status of the repo+branch entry. Transitions that would
    /// revert a terminal status are ignored. Returns whether any entry
    /// changed.
    pub fn set_workflow_status(
        &self,
        repo: &str,
        branch: &str,
        status: WorkflowStatus,
    ) -> io::Result<bool> {
        let mut entries = self.workflow()?;
        let mut changed = false;
        for entry in &mut entries {
            if entry.repo == repo
                && entry.branch == branch
                && entry.status != status
                && entry.status.can_advance_to(status)
            {
                entry.status = status;
                changed = true;
            }
        }
        if changed {
            self.write_workflow(&entries)?;
        }
        Ok(changed)
    }

    // --- health snapshots ---

    pub fn health(&self) -> io::Result<Vec<HealthSnapshot>> {
        self.store.read_all(RecordKind::Health)
    }

    pub fn write_health(&self, snapshots: &[HealthSnapshot]) -> io::Result<()> {
        self.store.overwrite(RecordKind::Health, snapshots)
    }

    // --- activity events ---

    pub fn activity(&self) -> io::Result<Vec<ActivityEvent>> {
        self.store.read_all(RecordKind::Activity)
    }

    pub fn append_activity(&self, event: &ActivityEvent) -> io::Result<()> {
        self.store.append(RecordKind::Activity, event)
    }

    // --- project mappings ---

    pub fn projects(&self) -> io::Result<Vec<ProjectEntry>> {
        self.store.read_all(RecordKind::Projects)
    }

    pub fn write_projects(&self, entries: &[ProjectEntry]) -> io::Result<()> {
        self.store.overwrite(RecordKind::Projects, entries)
    }

    pub fn append_project(&self, entry: &ProjectEntry) -> io::Result<()> {
        self.store.append(RecordKind::Projects, entry)
    }

    /// GitHub `owner/repo` for a project name, empty when unmapped.
    pub fn github_repo_for(&self, name: &str) -> String {
        self.projects()
            .ok()
            .and_then(|ps| ps.into_iter().find(|p| p.name == name))
            .map(|p| p.github_repo)
            .unwrap_or_default()
    }

    /// Local checkout path for a project name. Unmapped names fall back to
    /// treating the folder name itself as the repo identifier.
    pub fn repo_path_for(&self, name: &str) -> PathBuf {
        let rel = self
            .projects()
            .ok()
            .and_then(|ps| ps.into_iter().find(|p| p.name == name))
            .map(|p| p.path)
            .unwrap_or_else(|| name.to_string());
        self.workspace().join(rel)
    }
}
