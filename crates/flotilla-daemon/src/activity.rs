//! State-transition detection for reconciliation cycles.
//!
//! The tracker keeps the last known PR state and head commit per folder,
//! in daemon memory only. The first observation of a folder records its
//! value silently; later observations emit exactly one event per change.

use std::collections::HashMap;

use chrono::Utc;

use flotilla_core::gh::PrInfo;
use flotilla_core::records::{ActivityEvent, ActivityKind, HealthSnapshot, WorktreeEntry};

pub struct ActivityTracker {
    pr_states: HashMap<String, String>, // folder -> last known PR state
    commits: HashMap<String, String>,   // folder -> last known head commit
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            pr_states: HashMap::new(),
            commits: HashMap::new(),
        }
    }

    /// Seed PR states from persisted snapshots, so a daemon restart does not
    /// swallow the next genuine transition. Snapshots carry no commit hash,
    /// so commit tracking always starts empty.
    pub fn seed_from_health(snapshots: &[HealthSnapshot]) -> Self {
        let mut tracker = Self::new();
        for snap in snapshots {
            if let Some(state) = &snap.pr_state {
                tracker
                    .pr_states
                    .insert(snap.folder.clone(), state.clone());
            }
        }
        tracker
    }

    /// Diff a PR observation against the last known state for the folder.
    ///
    /// Base folders never produce PR events. An absent PR leaves the last
    /// known state untouched. Unrecognized states emit nothing.
    pub fn observe_pr(
        &mut self,
        entry: &WorktreeEntry,
        pr: Option<&PrInfo>,
    ) -> Option<ActivityEvent> {
        if entry.base {
            return None;
        }
        let pr = pr?;

        let Some(last) = self.pr_states.get(&entry.folder) else {
            // First observation: record, no event.
            self.pr_states
                .insert(entry.folder.clone(), pr.state.clone());
            return None;
        };
        if *last == pr.state {
            return None;
        }

        let kind = match pr.state.as_str() {
            "OPEN" => ActivityKind::PrOpened,
            "MERGED" => ActivityKind::PrMerged,
            "CLOSED" => ActivityKind::PrClosed,
            _ => return None,
        };
        self.pr_states
            .insert(entry.folder.clone(), pr.state.clone());
        Some(ActivityEvent {
            timestamp: Utc::now(),
            kind,
            repo: entry.repo.clone(),
            branch: entry.branch.clone(),
            pr_number: Some(pr.number),
            title: Some(pr.title.clone()),
            commit: None,
            message: None,
        })
    }

    /// Diff a head-commit observation against the last known hash.
    pub fn observe_commit(
        &mut self,
        entry: &WorktreeEntry,
        commit: &str,
        message: &str,
    ) -> Option<ActivityEvent> {
        let Some(last) = self.commits.get(&entry.folder) else {
            self.commits
                .insert(entry.folder.clone(), commit.to_string());
            return None;
        };
        if last == commit {
            return None;
        }

        self.commits
            .insert(entry.folder.clone(), commit.to_string());
        Some(ActivityEvent {
            timestamp: Utc::now(),
            kind: ActivityKind::CommitPushed,
            repo: entry.repo.clone(),
            branch: entry.branch.clone(),
            pr_number: None,
            title: None,
            commit: Some(commit.to_string()),
            message: Some(message.to_string()),
        })
    }
}
