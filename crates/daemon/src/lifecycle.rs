// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle Control (C10) — `initialize`, `status`, `pause`, `resume`,
//! `stop`, each scoped by `project_id` (spec.md §4.8). Plain async
//! functions over `Arc<DevTeamDaemon>`; the HTTP router binding is out of
//! scope.

use std::sync::Arc;

use devteam_core::{validate_project_id, Clock, DevTeamError, Event, EventId, ExecutionStatus, TaskContext};
use devteam_wire::{Envelope, EnvelopeType, InitializeRequest, InitializeResponse, StatusResponse};

use crate::daemon::DevTeamDaemon;

const RECENT_EVENT_SCAN_LIMIT: usize = 100;

/// Construct the submission payload, persist a fresh Event, and enqueue
/// it — the same path `submit_event` takes, plus the idempotency check
/// and `execution_id` minting specific to this endpoint (spec.md §4.1
/// "lifecycle.initialize").
pub async fn initialize<C: Clock + 'static>(daemon: &Arc<DevTeamDaemon<C>>, request: InitializeRequest) -> Result<InitializeResponse, DevTeamError> {
    validate_project_id(&request.project_id)?;

    let project_id = request.project_id.clone();
    let idempotency_key = request.options.idempotency_key.clone();

    if let Some(key) = &idempotency_key {
        if let Some(execution_id) = daemon.check_idempotency(&project_id, key) {
            return Err(DevTeamError::Conflict(format!("idempotency key already used by execution {execution_id}")));
        }
    }

    let payload = request.into_submission_payload();
    payload.validate()?;

    let execution_id = format!("exec_{}", EventId::new());
    let now = daemon.clock.rfc3339();
    let mut event = Event::new(EventId::new(), payload.submission_type.workflow_type(), execution_id.clone(), payload.clone(), now.clone());

    let mut ctx = TaskContext::seed(payload, execution_id.clone(), project_id.clone(), None);
    ctx.metadata.execution_id = Some(execution_id.clone());
    event.replace_task_context(ctx, now);

    let event_id = event.id;
    daemon.store.insert_event(event)?;

    if let Some(key) = &idempotency_key {
        daemon.record_idempotency(&project_id, key, &execution_id);
    }

    daemon.enqueue(event_id);

    Ok(InitializeResponse { execution_id, event_id: event_id.to_string() })
}

pub async fn status<C: Clock>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str) -> Result<StatusResponse, DevTeamError> {
    validate_project_id(project_id)?;
    let event = load_current_event(daemon, project_id)?;
    let ctx = event.task_context.unwrap_or_default();
    let now = daemon.clock.rfc3339();
    let projection = devteam_engine::project(&ctx, &event.id.to_string(), project_id, &now);
    Ok(StatusResponse { projection })
}

pub async fn pause<C: Clock + 'static>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str) -> Result<(), DevTeamError> {
    transition(daemon, project_id, ExecutionStatus::Paused).await
}

pub async fn resume<C: Clock + 'static>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str) -> Result<(), DevTeamError> {
    transition(daemon, project_id, ExecutionStatus::Running).await
}

pub async fn stop<C: Clock + 'static>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str) -> Result<(), DevTeamError> {
    transition(daemon, project_id, ExecutionStatus::Stopping).await
}

/// Shared body for pause/resume/stop (spec.md §4.8 steps 1-5).
async fn transition<C: Clock + 'static>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str, target: ExecutionStatus) -> Result<(), DevTeamError> {
    validate_project_id(project_id)?;
    let event = load_current_event(daemon, project_id)?;
    let event_id = event.id;
    let mut ctx = event.task_context.unwrap_or_default();

    let now = daemon.clock.rfc3339();
    let current = devteam_engine::project(&ctx, &event_id.to_string(), project_id, &now).status;

    if !devteam_engine::is_allowed_transition(current, target) {
        let allowed = devteam_engine::allowed_transitions(current);
        return Err(invalid_transition_error(current, allowed));
    }

    ctx.metadata.status = Some(status_label(target).to_string());
    daemon.store.replace_task_context(event_id, ctx.clone(), now.clone())?;

    let projection = devteam_engine::project(&ctx, &event_id.to_string(), project_id, &now);
    if let Ok(payload) = serde_json::to_value(&projection) {
        let envelope = Envelope::new(EnvelopeType::ExecutionUpdate, now, project_id, payload);
        if let Err(err) = daemon.hub.broadcast(envelope) {
            tracing::warn!(%err, "dropping an invalid outgoing envelope");
        }
    }

    Ok(())
}

fn load_current_event<C: Clock>(daemon: &Arc<DevTeamDaemon<C>>, project_id: &str) -> Result<Event, DevTeamError> {
    daemon
        .store
        .scan_recent_for_project(project_id, RECENT_EVENT_SCAN_LIMIT)
        .ok_or_else(|| DevTeamError::NotFound(format!("no execution found for project {project_id}")))
}

fn status_label(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Idle => "idle",
        ExecutionStatus::Initializing => "prepared",
        ExecutionStatus::Running => "running",
        ExecutionStatus::Paused => "paused",
        ExecutionStatus::Stopping => "stopping",
        ExecutionStatus::Stopped => "stopped",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Error => "error",
    }
}

/// A caller building the 409 body (spec.md §4.8 step 3) re-derives the
/// allowed set itself via [`devteam_engine::allowed_transitions`]; this
/// just carries enough to log and to match on `error_code()`.
fn invalid_transition_error(current: ExecutionStatus, allowed: Vec<ExecutionStatus>) -> DevTeamError {
    let allowed: Vec<&str> = allowed.iter().copied().map(status_label).collect();
    DevTeamError::Conflict(format!("{} does not allow this transition; valid: {:?}", status_label(current), allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_adapters::fake::FakeContainerAdapter;
    use devteam_core::{FakeClock, SubmissionOptions};
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> crate::config::Config {
        crate::config::Config {
            state_dir: dir.to_path_buf(),
            wal_dir: dir.join("events"),
            ws_auth_token: None,
            idempotency_ttl: Duration::from_secs(6 * 3600),
            reclamation_interval: Duration::from_secs(3600),
            container_ttl_days: 7,
        }
    }

    fn daemon(dir: &std::path::Path) -> (Arc<DevTeamDaemon<FakeClock>>, tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        DevTeamDaemon::start(config(dir), Arc::new(FakeContainerAdapter::new()), FakeClock::new()).unwrap()
    }

    fn init_request(project_id: &str) -> InitializeRequest {
        InitializeRequest {
            project_id: project_id.to_string(),
            repository_url: "https://example.com/r.git".to_string(),
            branch: "main".to_string(),
            description: String::new(),
            options: SubmissionOptions { retry_count: 2, ..Default::default() },
        }
    }

    #[tokio::test]
    async fn initialize_persists_and_enqueues_an_event() {
        let dir = tempdir().unwrap();
        let (daemon, dispatch, reclaim) = daemon(dir.path());

        let resp = initialize(&daemon, init_request("acme/widgets")).await.unwrap();
        assert!(resp.execution_id.starts_with("exec_"));
        assert_eq!(daemon.store.len(), 1);

        dispatch.abort();
        reclaim.abort();
    }

    #[tokio::test]
    async fn initialize_replays_the_idempotency_key_as_a_conflict() {
        let dir = tempdir().unwrap();
        let (daemon, dispatch, reclaim) = daemon(dir.path());

        let mut req = init_request("acme/widgets");
        req.options.idempotency_key = Some("key-1".to_string());
        initialize(&daemon, req.clone()).await.unwrap();

        let err = initialize(&daemon, req).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        dispatch.abort();
        reclaim.abort();
    }

    #[tokio::test]
    async fn status_before_any_execution_is_not_found() {
        let dir = tempdir().unwrap();
        let (daemon, dispatch, reclaim) = daemon(dir.path());

        let err = status(&daemon, "acme/widgets").await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        dispatch.abort();
        reclaim.abort();
    }

    #[tokio::test]
    async fn pause_while_still_initializing_is_disallowed() {
        let dir = tempdir().unwrap();
        let (daemon, dispatch, reclaim) = daemon(dir.path());
        dispatch.abort();
        reclaim.abort();

        // Seed the store directly (bypassing `enqueue`) so no background
        // dispatcher races this test past `initializing`.
        let payload = devteam_core::test_support::submission_payload("acme/widgets", "https://example.com/r.git");
        let ctx = TaskContext::seed(payload.clone(), "corr-1".to_string(), "acme/widgets".to_string(), None);
        let mut event = Event::new(EventId::new(), "DEVTEAM_AUTOMATION", "corr-1", payload, "2026-01-01T00:00:00Z");
        event.replace_task_context(ctx, "2026-01-01T00:00:00Z");
        daemon.store.insert_event(event).unwrap();

        let err = pause(&daemon, "acme/widgets").await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }
}
