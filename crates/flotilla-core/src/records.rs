//! Record types persisted by the store, one kind per file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A checked-out worktree folder under the workspace (`worktrees.jsonl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeEntry {
    pub folder: String,
    pub repo: String,
    pub branch: String,
    pub base: bool,
}

/// Lifecycle status of a branch's workflow entry.
///
/// Transitions are forward-only: `Active` may advance to any terminal
/// status, terminal statuses never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Active,
    Merged,
    Abandoned,
    Completed,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkflowStatus::Active)
    }

    /// Whether moving from `self` to `next` respects the forward-only rule.
    pub fn can_advance_to(self, next: WorkflowStatus) -> bool {
        self == next || !self.is_terminal()
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStatus::Active => "active",
            WorkflowStatus::Merged => "merged",
            WorkflowStatus::Abandoned => "abandoned",
            WorkflowStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Branch lifecycle bookkeeping (`workflow.jsonl`), keyed by repo+branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntry {
    pub repo: String,
    pub branch: String,
    #[serde(rename = "basedOn", default, skip_serializing_if = "String::is_empty")]
    pub based_on: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub purpose: String,
    pub status: WorkflowStatus,
    pub created: DateTime<Utc>,
}

/// Most recent observation of one folder (`health.jsonl`).
///
/// The file is a snapshot, not a log: the reconciler rewrites it whole each
/// cycle, implicitly dropping folders that are no longer discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub folder: String,
    pub dirty: bool,
    pub unpushed: u32,
    #[serde(rename = "prState", default, skip_serializing_if = "Option::is_none")]
    pub pr_state: Option<String>,
    #[serde(rename = "prTitle", default, skip_serializing_if = "Option::is_none")]
    pub pr_title: Option<String>,
    #[serde(rename = "lastCheck")]
    pub last_check: DateTime<Utc>,
}

/// Kind tag on an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PrOpened,
    PrMerged,
    PrClosed,
    CommitPushed,
}

/// One immutable state-transition record (`activity.jsonl`, append-only).
///
/// File write order is the authoritative ordering; the timestamp is
/// informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub repo: String,
    pub branch: String,
    #[serde(rename = "prNumber", default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Project-name to GitHub-repo mapping (`projects.jsonl`), rarely mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub github_repo: String,
    pub path: String,
}
