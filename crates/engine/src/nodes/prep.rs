// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::node::Node;
use async_trait::async_trait;
use devteam_core::TaskContext;

/// Asserts the minimum metadata a pipeline needs before it touches a
/// container (spec.md §4.3: "`PrepNode` asserts minimum metadata").
pub struct PrepNode;

#[async_trait]
impl Node for PrepNode {
    fn name(&self) -> &'static str {
        "PrepNode"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskContext, NodeError> {
        let event = ctx.event.as_ref().ok_or_else(|| NodeError::new("task_context.event is missing"))?;

        if event.project_id.is_empty() {
            return Err(NodeError::new("event.project_id is empty"));
        }
        if event.task.repository_url.is_empty() {
            return Err(NodeError::new("event.task.repository_url is empty"));
        }
        if ctx.metadata.project_id.as_deref().unwrap_or_default().is_empty() {
            return Err(NodeError::new("metadata.project_id is missing"));
        }

        Ok(ctx)
    }
}
