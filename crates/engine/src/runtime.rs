// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow Runtime (C2/C5) — resolves a workflow by event type and
//! drives its nodes to completion, owning per-node status transitions
//! and the run's `started_at`/`completed_at` stamps (spec.md §4.3).

use crate::node::Node;
use crate::workflow::{WorkflowRegistry, PLACEHOLDER};
use devteam_core::task_context::{NodeState, NodeStatus};
use devteam_core::{Clock, SystemClock, TaskContext};
use std::sync::Arc;

/// Drives one workflow run. Nodes themselves stay clock-agnostic and
/// pure over `TaskContext`; all status bookkeeping happens here.
pub struct Runtime<C: Clock = SystemClock> {
    registry: Arc<WorkflowRegistry>,
    clock: C,
}

impl Runtime<SystemClock> {
    pub fn new(registry: Arc<WorkflowRegistry>) -> Self {
        Self { registry, clock: SystemClock }
    }
}

impl<C: Clock> Runtime<C> {
    pub fn with_clock(registry: Arc<WorkflowRegistry>, clock: C) -> Self {
        Self { registry, clock }
    }

    /// Execute every node of the workflow resolved for `ctx.event`'s
    /// submission type, in order (spec.md §4.3 step 2). Stops at the
    /// first node error; the error is recorded on that node's state and
    /// the context is still returned so the caller can persist and
    /// project it.
    pub async fn run(&self, mut ctx: TaskContext) -> TaskContext {
        let workflow_type = ctx.event.as_ref().map(|e| e.submission_type.workflow_type()).unwrap_or(PLACEHOLDER);
        let workflow = self.registry.resolve(workflow_type);

        if ctx.metadata.started_at.is_none() {
            ctx.metadata.started_at = Some(self.clock.rfc3339());
        }

        for node in &workflow {
            ctx = self.run_one(node.as_ref(), ctx).await;
            if ctx.nodes.get(node.name()).and_then(|s| s.status) == Some(NodeStatus::Error) {
                break;
            }
        }

        ctx.metadata.completed_at = Some(self.clock.rfc3339());
        ctx
    }

    async fn run_one(&self, node: &(dyn Node + '_), mut ctx: TaskContext) -> TaskContext {
        ctx.nodes.insert(node.name().to_string(), NodeState::running());
        let before = ctx.clone();
        match node.run(ctx).await {
            Ok(mut ctx) => {
                ctx.nodes.insert(node.name().to_string(), NodeState::completed(None));
                ctx.metadata.task_id = Some(node.name().to_string());
                ctx
            }
            Err(err) => {
                let mut ctx = before;
                ctx.nodes.insert(node.name().to_string(), NodeState::error(err.message));
                ctx
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_adapters::fake::FakeContainerAdapter;
    use devteam_core::test_support::seeded_task_context;
    use devteam_core::{FakeClock, SubmissionType};

    #[tokio::test]
    async fn placeholder_workflow_completes_with_noop() {
        let registry = Arc::new(WorkflowRegistry::with_defaults(Arc::new(FakeContainerAdapter::new())));
        let runtime = Runtime::with_clock(registry, FakeClock::new());

        let mut ctx = seeded_task_context("acme");
        ctx.event.as_mut().unwrap().submission_type = SubmissionType::Placeholder;

        let ctx = runtime.run(ctx).await;
        assert_eq!(ctx.nodes.get("NoopNode").and_then(|s| s.status), Some(NodeStatus::Completed));
        assert!(ctx.metadata.started_at.is_some());
        assert!(ctx.metadata.completed_at.is_some());
    }

    #[tokio::test]
    async fn devteam_automation_runs_select_and_prep_then_fails_at_provisioning_without_a_container() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.fail_next_start("simulated outage");
        let registry = Arc::new(WorkflowRegistry::with_defaults(adapter));
        let runtime = Runtime::with_clock(registry, FakeClock::new());

        let ctx = seeded_task_context("acme");
        let ctx = runtime.run(ctx).await;

        assert_eq!(ctx.nodes.get("ProvisionContainerNode").and_then(|s| s.status), Some(NodeStatus::Error));
        assert_eq!(ctx.nodes.get("SelectNode").and_then(|s| s.status), Some(NodeStatus::Completed));
        assert_eq!(ctx.nodes.get("PrepNode").and_then(|s| s.status), Some(NodeStatus::Completed));
    }

    #[tokio::test]
    async fn current_task_tracks_the_last_node_that_completed() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.fail_next_start("simulated outage");
        let registry = Arc::new(WorkflowRegistry::with_defaults(adapter));
        let runtime = Runtime::with_clock(registry, FakeClock::new());

        let ctx = seeded_task_context("acme");
        let ctx = runtime.run(ctx).await;

        // PrepNode is the last node to complete before ProvisionContainerNode errors.
        assert_eq!(ctx.metadata.task_id.as_deref(), Some("PrepNode"));
    }

    #[tokio::test]
    async fn unseeded_context_falls_back_to_placeholder() {
        let registry = Arc::new(WorkflowRegistry::with_defaults(Arc::new(FakeContainerAdapter::new())));
        let runtime = Runtime::with_clock(registry, FakeClock::new());
        let ctx = runtime.run(TaskContext::empty()).await;
        assert_eq!(ctx.nodes.get("NoopNode").and_then(|s| s.status), Some(NodeStatus::Completed));
    }
}
