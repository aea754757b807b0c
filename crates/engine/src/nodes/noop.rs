// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::node::Node;
use async_trait::async_trait;
use devteam_core::TaskContext;

/// The `PLACEHOLDER` workflow's single node. Marks the run complete
/// without touching a container.
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    fn name(&self) -> &'static str {
        "NoopNode"
    }

    async fn run(&self, mut ctx: TaskContext) -> Result<TaskContext, NodeError> {
        ctx.metadata.status = Some("completed".to_string());
        Ok(ctx)
    }
}
