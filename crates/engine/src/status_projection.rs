// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status Projection (C6) — a pure function from `task_context` to the
//! public status shape (spec.md §4.6). No I/O, no locking; by
//! construction this can't panic on a well-typed `TaskContext`, so there
//! is no `catch_unwind` here the way there is around node execution.

use devteam_core::task_context::{NodeStatus, TaskContext};
use devteam_core::{Artifacts, ExecutionStatus, StatusProjection, Totals};

/// Derive the public projection for one execution. `now` is stamped into
/// `updated_at`; callers own formatting (RFC3339, typically via
/// [`devteam_core::Clock`]).
pub fn project(ctx: &TaskContext, execution_id: &str, project_id: &str, now: &str) -> StatusProjection {
    let total = ctx.nodes.len() as u32;
    let completed = ctx.nodes.values().filter(|n| n.status == Some(NodeStatus::Completed)).count() as u32;
    let any_error = ctx.nodes.values().any(|n| n.status == Some(NodeStatus::Error));
    let any_running = ctx.nodes.values().any(|n| n.status == Some(NodeStatus::Running));

    // spec.md §4.6 step 3: precedence is error > completed > running >
    // initializing > idle. Deliberately not the source's bug where
    // "prepared" only takes effect when the derived status is already
    // idle.
    let status = if any_error {
        ExecutionStatus::Error
    } else if total > 0 && completed == total {
        ExecutionStatus::Completed
    } else if any_running || completed > 0 {
        ExecutionStatus::Running
    } else if ctx.metadata.status.as_deref() == Some("prepared") {
        ExecutionStatus::Initializing
    } else {
        ExecutionStatus::Idle
    };

    let progress = if total > 0 { ((100 * completed) / total).min(100) as u8 } else { 0 };

    let current_task = if status == ExecutionStatus::Idle { None } else { ctx.metadata.task_id.clone() };

    let customer_id = project_id.split_once('/').map(|(customer, _)| customer.to_string());

    let artifacts = Artifacts {
        repo_path: ctx.metadata.repo_path.clone(),
        branch: ctx.metadata.branch.clone(),
        logs: ctx.metadata.logs.clone(),
        files_modified: ctx.metadata.files_modified.clone(),
    };

    StatusProjection {
        execution_id: execution_id.to_string(),
        project_id: project_id.to_string(),
        customer_id,
        status,
        progress,
        current_task,
        totals: Totals { completed, total },
        branch: ctx.metadata.branch.clone(),
        artifacts,
        started_at: ctx.metadata.started_at.clone(),
        updated_at: now.to_string(),
    }
}

/// Returns `true` if `to` is a legal next status from `from` (spec.md
/// §4.6 transition table).
pub fn is_allowed_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    use ExecutionStatus::*;
    matches!(
        (from, to),
        (Idle, Initializing)
            | (Idle, Error)
            | (Initializing, Running)
            | (Initializing, Error)
            | (Running, Paused)
            | (Running, Stopping)
            | (Running, Completed)
            | (Running, Error)
            | (Paused, Running)
            | (Paused, Error)
            | (Stopping, Stopped)
            | (Stopping, Error)
            | (Stopped, Error)
            | (Completed, Error)
    )
}

/// The set of statuses reachable in one step from `from`, for 409
/// responses (spec.md §4.8 step 3).
pub fn allowed_transitions(from: ExecutionStatus) -> Vec<ExecutionStatus> {
    use ExecutionStatus::*;
    [Idle, Initializing, Running, Paused, Stopping, Stopped, Completed, Error]
        .into_iter()
        .filter(|&to| is_allowed_transition(from, to))
        .collect()
}
