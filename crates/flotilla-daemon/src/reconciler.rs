//! The health-check cycle: discover worktrees, observe their state, diff
//! against last known values, persist the snapshot file, notify clients.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use flotilla_core::gh::PrClient;
use flotilla_core::git::Repo;
use flotilla_core::records::{HealthSnapshot, WorktreeEntry};
use flotilla_core::registry::Registry;

use crate::activity::ActivityTracker;
use crate::broadcast::{Broadcaster, CycleSummary};

pub struct Reconciler {
    workspace: PathBuf,
    registry: Registry,
    tracker: ActivityTracker,
    broadcaster: Arc<Broadcaster>,
}

impl Reconciler {
    /// The tracker is seeded from the persisted snapshots so a daemon
    /// restart does not swallow the next PR transition.
    pub fn new(workspace: impl Into<PathBuf>, broadcaster: Arc<Broadcaster>) -> Self {
        let workspace = workspace.into();
        let registry = Registry::new(&workspace);
        let seed = registry.health().unwrap_or_default();
        Self {
            workspace,
            registry,
            tracker: ActivityTracker::seed_from_health(&seed),
            broadcaster,
        }
    }

    /// Run one discover→observe→diff→persist→broadcast cycle.
    /// Returns the number of folders checked.
    pub fn run_cycle(&mut self) -> usize {
        let entries = self.discover();
        let mut health = Vec::with_capacity(entries.len());

        for entry in &entries {
            let snapshot = self.observe(entry);
            health.push(snapshot);
        }

        // The snapshot write must land before clients are nudged, so a
        // re-fetch sees data at least as fresh as this cycle.
        if let Err(e) = self.registry.write_health(&health) {
            warn!(error = %e, "failed to write health snapshots, will retry next cycle");
        }

        self.broadcaster.broadcast(
            "health",
            CycleSummary {
                timestamp: Utc::now(),
                worktree_count: health.len(),
            },
        );

        info!(folders = health.len(), "reconciliation cycle complete");
        health.len()
    }

    /// Current worktree set: live `git worktree list` output per project,
    /// merged with registered entries git does not know about. Discovered
    /// entries win on folder collision.
    fn discover(&self) -> Vec<WorktreeEntry> {
        let mut discovered: HashMap<String, WorktreeEntry> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        let projects = self.registry.projects().unwrap_or_default();
        for project in &projects {
            let base_path = self.workspace.join(&project.path);
            let repo = Repo::new(&base_path);
            let worktrees = match repo.worktree_list() {
                Ok(list) => list,
                Err(e) => {
                    warn!(project = %project.name, error = %e, "worktree discovery failed");
                    continue;
                }
            };
            for wt in worktrees {
                if wt.bare {
                    continue;
                }
                let folder = wt
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if folder.is_empty() {
                    continue;
                }
                let is_base = folder == project.path;
                if !discovered.contains_key(&folder) {
                    order.push(folder.clone());
                }
                discovered.insert(
                    folder.clone(),
                    WorktreeEntry {
                        folder,
                        repo: project.name.clone(),
                        branch: wt.branch,
                        base: is_base,
                    },
                );
            }
        }

        // Registered-only entries (e.g. manually registered folders) are
        // kept when git does not mention them.
        let registered = self.registry.worktrees().unwrap_or_default();
        for entry in registered {
            if !discovered.contains_key(&entry.folder) {
                order.push(entry.folder.clone());
                discovered.insert(entry.folder.clone(), entry);
            }
        }

        order
            .into_iter()
            .filter_map(|folder| discovered.remove(&folder))
            .collect()
    }

    /// Observe one folder and record any activity its changes imply.
    /// Per-folder failures degrade to defaults; they never abort the cycle.
    fn observe(&mut self, entry: &WorktreeEntry) -> HealthSnapshot {
        let folder_path = self.workspace.join(&entry.folder);
        let repo = Repo::new(&folder_path);

        let mut snapshot = HealthSnapshot {
            folder: entry.folder.clone(),
            dirty: false,
            unpushed: 0,
            pr_state: None,
            pr_title: None,
            last_check: Utc::now(),
        };

        snapshot.dirty = repo.is_dirty().unwrap_or(false);
        snapshot.unpushed = repo.unpushed_count(&entry.branch).unwrap_or(0);

        // Only non-base folders have an associated pull request.
        let pr = if entry.base {
            None
        } else {
            match PrClient::new(&folder_path).view(&entry.branch) {
                Ok(pr) => pr,
                Err(e) => {
                    debug!(folder = %entry.folder, error = %e, "pr lookup failed");
                    None
                }
            }
        };
        if let Some(pr) = &pr {
            snapshot.pr_state = Some(pr.state.clone());
            snapshot.pr_title = Some(pr.title.clone());
        }

        if let Some(event) = self.tracker.observe_pr(entry, pr.as_ref()) {
            if let Err(e) = self.registry.append_activity(&event) {
                warn!(error = %e, "failed to append activity event");
            }
        }

        if let Ok(commit) = repo.head_commit() {
            let message = repo.commit_message(&commit).unwrap_or_default();
            if let Some(event) = self.tracker.observe_commit(entry, &commit, &message) {
                if let Err(e) = self.registry.append_activity(&event) {
                    warn!(error = %e, "failed to append activity event");
                }
            }
        }

        snapshot
    }
}

/// Whether a snapshot is older than `max_age`.
pub fn is_stale(snapshot: &HealthSnapshot, max_age: chrono::Duration) -> bool {
    Utc::now() - snapshot.last_check > max_age
}

/// Whether a worktree needs user attention: a dirty base folder, a non-base
/// folder with unpushed commits, or an open PR waiting on someone.
pub fn needs_attention(snapshot: &HealthSnapshot, entry: &WorktreeEntry) -> bool {
    if entry.base && snapshot.dirty {
        return true;
    }
    if !entry.base && snapshot.unpushed > 0 {
        return true;
    }
    snapshot.pr_state.as_deref() == Some("OPEN")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(dirty: bool, unpushed: u32, pr_state: Option<&str>) -> HealthSnapshot {
        HealthSnapshot {
            folder: "app-feat".into(),
            dirty,
            unpushed,
            pr_state: pr_state.map(String::from),
            pr_title: None,
            last_check: Utc::now(),
        }
    }

    fn entry(base: bool) -> WorktreeEntry {
        WorktreeEntry {
            folder: "app-feat".into(),
            repo: "app".into(),
            branch: "feat".into(),
            base,
        }
    }

    #[test]
    fn staleness_by_age() {
        let mut snap = snapshot(false, 0, None);
        assert!(!is_stale(&snap, Duration::minutes(10)));
        snap.last_check = Utc::now() - Duration::minutes(20);
        assert!(is_stale(&snap, Duration::minutes(10)));
    }

    #[test]
    fn attention_rules() {
        // Dirty base folder.
        assert!(needs_attention(&snapshot(true, 0, None), &entry(true)));
        // Clean base folder.
        assert!(!needs_attention(&snapshot(false, 0, None), &entry(true)));
        // Non-base with unpushed commits.
        assert!(needs_attention(&snapshot(false, 2, None), &entry(false)));
        // Open PR always needs attention.
        assert!(needs_attention(&snapshot(false, 0, Some("OPEN")), &entry(false)));
        // Merged PR, clean, nothing unpushed.
        assert!(!needs_attention(&snapshot(false, 0, Some("MERGED")), &entry(false)));
    }

    #[test]
    fn cycle_on_empty_workspace_produces_empty_snapshot_file() {
        let tmp = tempfile::tempdir().unwrap();
        let broadcaster = Arc::new(Broadcaster::new());
        let mut reconciler = Reconciler::new(tmp.path(), broadcaster.clone());

        let mut rx = broadcaster.subscribe();
        let checked = reconciler.run_cycle();
        assert_eq!(checked, 0);

        let registry = Registry::new(tmp.path());
        assert!(registry.health().unwrap().is_empty());

        // The refresh nudge still fires.
        let msg = rx.try_recv().unwrap();
        assert!(msg.contains("\"worktreeCount\":0"));
    }

    mod end_to_end {
        use super::*;
        use flotilla_core::records::ProjectEntry;
        use std::path::Path;
        use std::process::{Command, Stdio};

        fn git(dir: &Path, args: &[&str]) {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .expect("run git");
            assert!(status.success(), "git {args:?} failed in {dir:?}");
        }

        fn commit_file(dir: &Path, name: &str, message: &str) {
            std::fs::write(dir.join(name), message).unwrap();
            git(dir, &["add", "."]);
            git(dir, &["commit", "-m", message]);
        }

        /// Workspace with a base checkout `app-main` (pushed, clean) and a
        /// worktree `app-feat` that is dirty with two unpushed commits.
        fn make_workspace() -> (tempfile::TempDir, std::path::PathBuf) {
            let tmp = tempfile::tempdir().expect("create temp dir");
            let workspace = tmp.path().join("ws");
            std::fs::create_dir(&workspace).unwrap();

            let origin = tmp.path().join("origin.git");
            std::fs::create_dir(&origin).unwrap();
            git(&origin, &["init", "--bare"]);

            let base = workspace.join("app-main");
            std::fs::create_dir(&base).unwrap();
            git(&base, &["init", "-b", "main"]);
            git(&base, &["config", "user.email", "test@test"]);
            git(&base, &["config", "user.name", "test"]);
            git(&base, &["remote", "add", "origin", &origin.to_string_lossy()]);
            commit_file(&base, "README.md", "init");
            git(&base, &["push", "-u", "origin", "main"]);

            let feat = workspace.join("app-feat");
            git(
                &base,
                &["worktree", "add", "-b", "feat", &feat.to_string_lossy(), "main"],
            );
            git(&feat, &["push", "-u", "origin", "feat"]);
            commit_file(&feat, "a.txt", "first change");
            commit_file(&feat, "b.txt", "second change");
            std::fs::write(feat.join("wip.txt"), "uncommitted").unwrap();

            let registry = Registry::new(&workspace);
            registry
                .write_projects(&[ProjectEntry {
                    name: "app".into(),
                    github_repo: String::new(),
                    path: "app-main".into(),
                }])
                .unwrap();

            (tmp, workspace)
        }

        #[test]
        fn one_cycle_snapshots_discovered_worktrees() {
            let (_tmp, workspace) = make_workspace();
            let broadcaster = Arc::new(Broadcaster::new());
            let mut rx = broadcaster.subscribe();
            let mut reconciler = Reconciler::new(&workspace, broadcaster);

            let checked = reconciler.run_cycle();
            assert_eq!(checked, 2);

            let registry = Registry::new(&workspace);
            let health = registry.health().unwrap();
            assert_eq!(health.len(), 2);

            let base = health.iter().find(|h| h.folder == "app-main").unwrap();
            assert!(!base.dirty);
            assert_eq!(base.unpushed, 0);

            let feat = health.iter().find(|h| h.folder == "app-feat").unwrap();
            assert!(feat.dirty);
            assert_eq!(feat.unpushed, 2);

            // lastCheck is populated on every snapshot.
            for h in &health {
                assert!(h.last_check <= Utc::now());
            }

            let msg = rx.try_recv().unwrap();
            assert!(msg.contains("\"worktreeCount\":2"));
        }

        #[test]
        fn second_cycle_emits_commit_pushed_on_new_commit() {
            let (_tmp, workspace) = make_workspace();
            let broadcaster = Arc::new(Broadcaster::new());
            let mut reconciler = Reconciler::new(&workspace, broadcaster);

            reconciler.run_cycle();
            let registry = Registry::new(&workspace);
            assert!(registry.activity().unwrap().is_empty());

            commit_file(&workspace.join("app-feat"), "c.txt", "third change");
            reconciler.run_cycle();

            let events = registry.activity().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(
                events[0].kind,
                flotilla_core::records::ActivityKind::CommitPushed
            );
            assert_eq!(events[0].repo, "app");
            assert_eq!(events[0].branch, "feat");
            assert_eq!(events[0].message.as_deref(), Some("third change"));
        }

        #[test]
        fn vanished_worktrees_drop_out_of_the_snapshot() {
            let (_tmp, workspace) = make_workspace();
            let broadcaster = Arc::new(Broadcaster::new());
            let mut reconciler = Reconciler::new(&workspace, broadcaster);
            reconciler.run_cycle();

            let base = workspace.join("app-main");
            git(
                &base,
                &[
                    "worktree",
                    "remove",
                    "--force",
                    &workspace.join("app-feat").to_string_lossy(),
                ],
            );
            reconciler.run_cycle();

            let registry = Registry::new(&workspace);
            let health = registry.health().unwrap();
            assert_eq!(health.len(), 1);
            assert_eq!(health[0].folder, "app-main");
        }
    }

    #[test]
    fn registered_only_folders_survive_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::new(tmp.path());
        registry.register_worktree(&entry(false)).unwrap();

        let broadcaster = Arc::new(Broadcaster::new());
        let mut reconciler = Reconciler::new(tmp.path(), broadcaster);
        let checked = reconciler.run_cycle();
        assert_eq!(checked, 1);

        let health = registry.health().unwrap();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].folder, "app-feat");
        // The folder does not exist on disk: everything degrades to defaults.
        assert!(!health[0].dirty);
        assert_eq!(health[0].unpushed, 0);
        assert!(health[0].pr_state.is_none());
    }
}
