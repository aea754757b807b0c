// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::node::Node;
use async_trait::async_trait;
use devteam_adapters::ContainerAdapter;
use devteam_core::TaskContext;
use serde_json::json;
use std::sync::Arc;

/// Calls the Container Manager's `start_or_reuse` (spec.md §4.4) and
/// records the resulting container identity on `task_context.metadata`.
pub struct ProvisionContainerNode<A: ContainerAdapter> {
    adapter: Arc<A>,
}

impl<A: ContainerAdapter> ProvisionContainerNode<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<A: ContainerAdapter + 'static> Node for ProvisionContainerNode<A> {
    fn name(&self) -> &'static str {
        "ProvisionContainerNode"
    }

    async fn run(&self, mut ctx: TaskContext) -> Result<TaskContext, NodeError> {
        let project_id = ctx.metadata.project_id.clone().ok_or_else(|| NodeError::new("metadata.project_id is missing"))?;
        let execution_id = ctx.metadata.execution_id.clone().unwrap_or_else(|| project_id.clone());

        let outcome = self.adapter.start_or_reuse(&project_id, &execution_id).await?;

        ctx.metadata.extra.insert("container_id".to_string(), json!(outcome.container_id));
        ctx.metadata.extra.insert("container_status".to_string(), json!(outcome.container_status));
        ctx.metadata.extra.insert("health_checks".to_string(), json!(outcome.health_checks));
        ctx.metadata.extra.insert("resource_limits".to_string(), json!(outcome.resource_limits));

        if !outcome.health_checks.all_passed() {
            return Err(NodeError::new("container health checks did not all pass"));
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_adapters::fake::FakeContainerAdapter;
    use devteam_core::test_support::seeded_task_context;

    #[tokio::test]
    async fn records_container_id_on_success() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        let node = ProvisionContainerNode::new(adapter);
        let ctx = seeded_task_context("acme");
        let ctx = node.run(ctx).await.unwrap();
        assert!(ctx.metadata.extra.contains_key("container_id"));
        assert!(ctx.metadata.extra.contains_key("container_status"));
    }

    #[tokio::test]
    async fn fails_without_a_project_id() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        let node = ProvisionContainerNode::new(adapter);
        let err = node.run(TaskContext::empty()).await.unwrap_err();
        assert!(err.message.contains("project_id"));
    }

    #[tokio::test]
    async fn propagates_adapter_failures() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.fail_next_start("simulated outage");
        let node = ProvisionContainerNode::new(adapter);
        let ctx = seeded_task_context("acme");
        assert!(node.run(ctx).await.is_err());
    }
}
