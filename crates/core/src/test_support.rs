// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::event::{Event, EventId};
use crate::submission::{SubmissionOptions, SubmissionPayload, SubmissionType, TaskSpec};
use crate::task_context::TaskContext;

pub mod strategies {
    use crate::status::{Artifacts, ExecutionStatus, StatusProjection, Totals};
    use proptest::prelude::*;

    pub fn arb_execution_status() -> impl Strategy<Value = ExecutionStatus> {
        prop_oneof![
            Just(ExecutionStatus::Idle),
            Just(ExecutionStatus::Initializing),
            Just(ExecutionStatus::Running),
            Just(ExecutionStatus::Paused),
            Just(ExecutionStatus::Stopping),
            Just(ExecutionStatus::Stopped),
            Just(ExecutionStatus::Completed),
            Just(ExecutionStatus::Error),
        ]
    }

    /// Strategy biased toward boundary progress values (0, 10, 100) which
    /// is where the invariants in `StatusProjection::invariants_hold` are
    /// most likely to be violated by an off-by-one.
    pub fn arb_progress() -> impl Strategy<Value = u8> {
        prop_oneof![Just(0u8), Just(10u8), Just(100u8), 0u8..=100u8]
    }

    pub fn arb_totals() -> impl Strategy<Value = Totals> {
        (0u32..=20, 0u32..=20).prop_map(|(completed, total)| Totals { completed, total })
    }

    pub fn arb_status_projection() -> impl Strategy<Value = StatusProjection> {
        (arb_execution_status(), arb_progress(), arb_totals(), any::<bool>()).prop_map(
            |(status, progress, totals, has_current_task)| StatusProjection {
                execution_id: "exec_test".to_string(),
                project_id: "proj".to_string(),
                customer_id: None,
                status,
                progress,
                current_task: has_current_task.then(|| "BuildNode".to_string()),
                totals,
                branch: None,
                artifacts: Artifacts::default(),
                started_at: None,
                updated_at: "2026-01-01T00:00:00Z".to_string(),
            },
        )
    }
}

pub fn submission_payload(project_id: &str, repository_url: &str) -> SubmissionPayload {
    SubmissionPayload {
        submission_type: SubmissionType::DevteamAutomation,
        project_id: project_id.to_string(),
        task: TaskSpec { repository_url: repository_url.to_string(), branch: "main".to_string(), description: "test task".to_string() },
        options: SubmissionOptions { retry_count: 2, timeout_seconds: 300, ..Default::default() },
    }
}

pub fn placeholder_payload(project_id: &str) -> SubmissionPayload {
    SubmissionPayload {
        submission_type: SubmissionType::Placeholder,
        project_id: project_id.to_string(),
        task: TaskSpec::default(),
        options: SubmissionOptions::default(),
    }
}

pub fn fresh_event(project_id: &str) -> Event {
    Event::new(
        EventId::new(),
        "DEVTEAM_AUTOMATION",
        "corr-test",
        submission_payload(project_id, "https://example.com/r.git"),
        "2026-01-01T00:00:00Z",
    )
}

pub fn seeded_task_context(project_id: &str) -> TaskContext {
    TaskContext::seed(submission_payload(project_id, "https://example.com/r.git"), "corr-test".to_string(), project_id.to_string(), Some("task-test".to_string()))
}
