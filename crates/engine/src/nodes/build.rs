// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::executor::{CommandExecutor, CommandKind};
use crate::node::Node;
use crate::nodes::DEFAULT_BUILD_SCRIPT;
use async_trait::async_trait;
use devteam_adapters::{ContainerAdapter, RepoRef};
use devteam_core::TaskContext;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Runs the project's build command through the Command Executor
/// (spec.md §4.5). The script name isn't part of the submission schema
/// yet, so this always runs [`DEFAULT_BUILD_SCRIPT`].
pub struct BuildNode<A: ContainerAdapter> {
    executor: CommandExecutor<A>,
}

impl<A: ContainerAdapter> BuildNode<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { executor: CommandExecutor::new(adapter) }
    }
}

#[async_trait]
impl<A: ContainerAdapter + 'static> Node for BuildNode<A> {
    fn name(&self) -> &'static str {
        "BuildNode"
    }

    async fn run(&self, mut ctx: TaskContext) -> Result<TaskContext, NodeError> {
        let project_id = ctx.metadata.project_id.clone().ok_or_else(|| NodeError::new("metadata.project_id is missing"))?;
        let execution_id = ctx.metadata.execution_id.clone().unwrap_or_else(|| project_id.clone());
        let options = ctx.event.as_ref().map(|e| e.options.clone()).unwrap_or_default();
        let task = ctx.event.as_ref().map(|e| e.task.clone()).ok_or_else(|| NodeError::new("event.task is missing"))?;
        let repo = RepoRef::new(task.repository_url, task.branch);

        let result = self
            .executor
            .execute(
                &project_id,
                &execution_id,
                CommandKind::Build { script: DEFAULT_BUILD_SCRIPT.to_string() },
                &repo,
                options.retry_count,
                Duration::from_secs(options.timeout_seconds),
            )
            .await?;

        ctx.metadata.files_modified.extend(result.files_modified.clone());
        ctx.metadata.logs.push(format!("build: exit {} in {}ms", result.exit_code, result.total_duration_ms));
        ctx.metadata.extra.insert("build_result".to_string(), json!(result));

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_adapters::fake::{FakeContainerAdapter, ScriptedExec};
    use devteam_core::test_support::seeded_task_context;

    #[tokio::test]
    async fn records_build_result_on_success() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.script_exec("acme", ScriptedExec::ok("created dist/bundle.js"));

        let node = BuildNode::new(adapter);
        let ctx = seeded_task_context("acme");
        let ctx = node.run(ctx).await.unwrap();

        assert_eq!(ctx.metadata.files_modified, vec!["dist/bundle.js".to_string()]);
        assert!(ctx.metadata.extra.contains_key("build_result"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_a_node_error() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.script_exec("acme", ScriptedExec::failed(1, "build broke"));
        adapter.script_exec("acme", ScriptedExec::failed(1, "still broken"));

        let node = BuildNode::new(adapter);
        let ctx = seeded_task_context("acme");
        assert!(node.run(ctx).await.is_err());
    }
}
