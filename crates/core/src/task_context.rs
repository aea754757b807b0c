// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `task_context` — the evolving structured result a workflow accumulates
//! on an [`crate::event::Event`].

use crate::submission::SubmissionPayload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-node status recorded in `task_context.nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Idle,
    Running,
    Completed,
    Error,
}

/// `task_context.nodes[name]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub status: Option<NodeStatus>,
    pub message: Option<String>,
    pub event_data: Option<serde_json::Value>,
}

impl NodeState {
    pub fn running() -> Self {
        Self { status: Some(NodeStatus::Running), message: None, event_data: None }
    }

    pub fn completed(event_data: Option<serde_json::Value>) -> Self {
        Self { status: Some(NodeStatus::Completed), message: None, event_data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: Some(NodeStatus::Error), message: Some(message.into()), event_data: None }
    }
}

/// `task_context.metadata`. Known fields are typed; anything a node
/// chooses to record beyond these lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub correlation_id: Option<String>,
    pub status: Option<String>,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub execution_id: Option<String>,
    pub branch: Option<String>,
    pub repo_path: Option<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub enqueue_latency_ms: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The conventional `{event, metadata, nodes}` shape (spec.md §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub event: Option<SubmissionPayload>,
    pub metadata: TaskMetadata,
    pub nodes: BTreeMap<String, NodeState>,
}

impl TaskContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Seed a context for a freshly-dispatched workflow run (spec.md §4.3
    /// step 1).
    pub fn seed(payload: SubmissionPayload, correlation_id: String, project_id: String, task_id: Option<String>) -> Self {
        let metadata = TaskMetadata {
            correlation_id: Some(correlation_id),
            status: Some("prepared".to_string()),
            project_id: Some(project_id),
            task_id,
            ..Default::default()
        };
        Self { event: Some(payload), metadata, nodes: BTreeMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{SubmissionOptions, SubmissionType, TaskSpec};

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            submission_type: SubmissionType::DevteamAutomation,
            project_id: "p".into(),
            task: TaskSpec::default(),
            options: SubmissionOptions::default(),
        }
    }

    #[test]
    fn seed_sets_prepared_status() {
        let ctx = TaskContext::seed(payload(), "corr-1".into(), "p".into(), Some("t-1".into()));
        assert_eq!(ctx.metadata.status.as_deref(), Some("prepared"));
        assert_eq!(ctx.metadata.project_id.as_deref(), Some("p"));
        assert!(ctx.nodes.is_empty());
    }

    #[test]
    fn node_state_transitions_round_trip_json() {
        let mut ctx = TaskContext::empty();
        ctx.nodes.insert("SelectNode".into(), NodeState::running());
        let json = serde_json::to_string(&ctx).unwrap();
        let back: TaskContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }

    #[test]
    fn unknown_metadata_fields_land_in_extra() {
        let json = r#"{"event":null,"metadata":{"custom_field":"x"},"nodes":{}}"#;
        let ctx: TaskContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.metadata.extra.get("custom_field").unwrap(), "x");
    }
}
