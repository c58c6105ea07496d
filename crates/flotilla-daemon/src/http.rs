//! Read-only dashboard API over the record files, plus the SSE push channel.
//!
//! Every endpoint re-reads the store on request — the files are the source
//! of truth and the push channel is only a refresh nudge. Empty workspaces
//! serve `[]`/zero values, never null; non-GET methods get 405 from the
//! method router; store errors surface as 500 with a text body.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use flotilla_core::plans::{self, PlanMeta};
use flotilla_core::records::{HealthSnapshot, WorkflowEntry};
use flotilla_core::registry::Registry;

use crate::broadcast::Broadcaster;

pub struct AppState {
    pub registry: Registry,
    pub broadcaster: Arc<Broadcaster>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/worktrees", get(worktrees))
        .route("/api/projects", get(projects))
        .route("/api/plans", get(plans_index))
        .route("/api/prs", get(prs))
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/events", get(events))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Deserialize)]
struct WorktreeQuery {
    project: Option<String>,
}

/// Worktree entry joined with workflow purpose/status and latest health.
#[derive(Debug, Clone, Serialize)]
struct WorktreeResponse {
    folder: String,
    repo: String,
    branch: String,
    base: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    dirty: bool,
    unpushed: u32,
    #[serde(rename = "prState", skip_serializing_if = "Option::is_none")]
    pr_state: Option<String>,
}

async fn worktrees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorktreeQuery>,
) -> Result<Json<Vec<WorktreeResponse>>, ApiError> {
    let entries = state.registry.worktrees().map_err(internal)?;
    let workflow = state.registry.workflow().unwrap_or_default();
    let health = state.registry.health().unwrap_or_default();

    let workflow_map: HashMap<(String, String), WorkflowEntry> = workflow
        .into_iter()
        .map(|w| ((w.repo.clone(), w.branch.clone()), w))
        .collect();
    let health_map: HashMap<String, HealthSnapshot> = health
        .into_iter()
        .map(|h| (h.folder.clone(), h))
        .collect();

    let mut resp = Vec::new();
    for entry in entries {
        if let Some(project) = &query.project {
            if entry.repo != *project {
                continue;
            }
        }
        let mut wt = WorktreeResponse {
            folder: entry.folder.clone(),
            repo: entry.repo.clone(),
            branch: entry.branch.clone(),
            base: entry.base,
            purpose: None,
            status: None,
            dirty: false,
            unpushed: 0,
            pr_state: None,
        };
        if let Some(wf) = workflow_map.get(&(entry.repo.clone(), entry.branch.clone())) {
            if !wf.purpose.is_empty() {
                wt.purpose = Some(wf.purpose.clone());
            }
            wt.status = Some(wf.status.to_string());
        }
        if let Some(h) = health_map.get(&entry.folder) {
            wt.dirty = h.dirty;
            wt.unpushed = h.unpushed;
            wt.pr_state = h.pr_state.clone();
        }
        resp.push(wt);
    }
    Ok(Json(resp))
}

#[derive(Debug, Clone, Serialize)]
struct ProjectResponse {
    name: String,
    count: usize,
}

async fn projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let entries = state.registry.worktrees().map_err(internal)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in &entries {
        *counts.entry(entry.repo.clone()).or_default() += 1;
    }

    // One row per distinct repo, in first-seen order.
    let mut seen = HashMap::new();
    let mut resp = Vec::new();
    for entry in &entries {
        if seen.insert(entry.repo.clone(), ()).is_none() {
            resp.push(ProjectResponse {
                name: entry.repo.clone(),
                count: counts[&entry.repo],
            });
        }
    }
    Ok(Json(resp))
}

async fn plans_index(State(state): State<Arc<AppState>>) -> Json<Vec<PlanMeta>> {
    Json(plans::scan_plans(state.registry.workspace()))
}

#[derive(Debug, Clone, Serialize)]
struct PrResponse {
    folder: String,
    repo: String,
    branch: String,
    state: String,
}

async fn prs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PrResponse>>, ApiError> {
    let health = state.registry.health().map_err(internal)?;
    let entries = state.registry.worktrees().unwrap_or_default();
    let by_folder: HashMap<&str, _> = entries.iter().map(|e| (e.folder.as_str(), e)).collect();

    let mut resp = Vec::new();
    for snap in health {
        let Some(pr_state) = snap.pr_state else { continue };
        if let Some(entry) = by_folder.get(snap.folder.as_str()) {
            resp.push(PrResponse {
                folder: snap.folder.clone(),
                repo: entry.repo.clone(),
                branch: entry.branch.clone(),
                state: pr_state,
            });
        }
    }
    Ok(Json(resp))
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    #[serde(rename = "daemonRunning")]
    daemon_running: bool,
    #[serde(rename = "lastCheck")]
    last_check: Option<DateTime<Utc>>,
    #[serde(rename = "worktreeCount")]
    worktree_count: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let health = state.registry.health().map_err(internal)?;
    let last_check = health.iter().map(|h| h.last_check).max();
    Ok(Json(HealthResponse {
        daemon_running: true,
        last_check,
        worktree_count: health.len(),
    }))
}

#[derive(Debug, Clone, Serialize)]
struct StatusResponse {
    running: bool,
    version: &'static str,
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Server-Sent Events stream: `event: connected` once, then one
/// `event: update` per reconciler broadcast.
async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let connected = tokio_stream::once(Ok(Event::default()
        .event("connected")
        .data(r#"{"status":"ok"}"#)));
    let updates =
        ReceiverStream::new(rx).map(|msg| Ok(Event::default().event("update").data(msg)));
    Sse::new(connected.chain(updates)).keep_alive(KeepAlive::default())
}
