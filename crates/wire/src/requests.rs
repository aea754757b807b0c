// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response DTOs for the ingestion (C7) and lifecycle control (C10)
//! HTTP handlers. The router itself is out of scope; these types are what
//! a thin adapter deserializes into and serializes out of.

use devteam_core::{ExecutionStatus, SubmissionPayload, SubmissionOptions, TaskSpec};
use serde::{Deserialize, Serialize};

/// `POST /events` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitEventRequest {
    pub payload: SubmissionPayload,
}

/// `POST /events` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitEventResponse {
    pub event_id: String,
    pub task_id: Option<String>,
    pub correlation_id: String,
    pub status: &'static str,
    pub event_type: String,
}

impl SubmitEventResponse {
    pub fn accepted(event_id: String, task_id: Option<String>, correlation_id: String, event_type: String) -> Self {
        Self { event_id, task_id, correlation_id, status: "accepted", event_type }
    }
}

/// `POST /api/devteam/automation/initialize` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub project_id: String,
    pub repository_url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: SubmissionOptions,
}

impl InitializeRequest {
    /// Build the submission payload `lifecycle.initialize` constructs
    /// internally (spec.md §4.1).
    pub fn into_submission_payload(self) -> SubmissionPayload {
        SubmissionPayload {
            submission_type: devteam_core::SubmissionType::DevteamAutomation,
            project_id: self.project_id,
            task: TaskSpec { repository_url: self.repository_url, branch: self.branch, description: self.description },
            options: self.options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub execution_id: String,
    pub event_id: String,
}

/// `GET /api/devteam/automation/status/{project_id}` success body. Wraps
/// [`devteam_core::StatusProjection`] unchanged; kept as a distinct wire
/// type so the HTTP boundary can evolve independently of the domain shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub projection: devteam_core::StatusProjection,
}

/// 409 body for a disallowed pause/resume/stop transition — carries the
/// valid transitions from the current status so the client can react.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidTransitionResponse {
    pub current_status: ExecutionStatus,
    pub allowed_transitions: Vec<ExecutionStatus>,
}
