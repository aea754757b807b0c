// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::node::Node;
use async_trait::async_trait;
use devteam_adapters::ContainerAdapter;
use devteam_core::TaskContext;
use std::sync::Arc;

/// Pushes the branch the container has been building on. Out of scope
/// for the Command Executor's install/build retry machinery (spec.md
/// §4.5 names only those two), so this runs once against the adapter
/// directly and surfaces any failure as a terminal node error.
pub struct PushNode<A: ContainerAdapter> {
    adapter: Arc<A>,
}

impl<A: ContainerAdapter> PushNode<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<A: ContainerAdapter + 'static> Node for PushNode<A> {
    fn name(&self) -> &'static str {
        "PushNode"
    }

    async fn run(&self, mut ctx: TaskContext) -> Result<TaskContext, NodeError> {
        let project_id = ctx.metadata.project_id.clone().ok_or_else(|| NodeError::new("metadata.project_id is missing"))?;
        let branch = ctx.event.as_ref().map(|e| e.task.branch.clone()).filter(|b| !b.is_empty()).ok_or_else(|| NodeError::new("event.task.branch is missing"))?;

        let output = self.adapter.exec(&project_id, &["git", "push", "origin", &branch]).await?;
        if !output.succeeded() {
            return Err(NodeError::new(format!("git push exited {}: {}", output.exit_code, output.stderr)));
        }

        ctx.metadata.branch = Some(branch);
        ctx.metadata.logs.push("push: completed".to_string());

        Ok(ctx)
    }
}
