// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable event record (C1) — the sole persistence boundary.

use crate::define_uuid_id;
use crate::submission::SubmissionPayload;
use crate::task_context::TaskContext;
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Server-assigned identity of an [`Event`].
    pub struct EventId;
}

/// The durable record of one submission.
///
/// `data` is the immutable submission payload as received at ingestion.
/// `task_context` starts empty (`None`) and is mutated exclusively by the
/// worker dispatcher through full replacement — never a partial patch, so
/// a crash mid-update can never leave a half-written context on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub workflow_type: String,
    /// The caller-supplied correlation id from ingestion, carried across
    /// the dispatch boundary so the dispatcher can seed `task_context`
    /// with it without needing a separate side-channel.
    pub correlation_id: String,
    pub data: SubmissionPayload,
    pub task_context: Option<TaskContext>,
    pub created_at: String,
    pub updated_at: String,
}

impl Event {
    /// Construct a freshly-ingested event with an empty `task_context`.
    pub fn new(
        id: EventId,
        workflow_type: impl Into<String>,
        correlation_id: impl Into<String>,
        data: SubmissionPayload,
        now: impl Into<String>,
    ) -> Self {
        let now = now.into();
        Self {
            id,
            workflow_type: workflow_type.into(),
            correlation_id: correlation_id.into(),
            data,
            task_context: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Replace `task_context` wholesale and bump `updated_at`. This is the
    /// only mutation path the dispatcher is allowed to take.
    pub fn replace_task_context(&mut self, ctx: TaskContext, now: impl Into<String>) {
        self.task_context = Some(ctx);
        self.updated_at = now.into();
    }
}
