// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::NodeError;
use crate::node::Node;
use async_trait::async_trait;
use devteam_core::TaskContext;
use serde_json::json;

/// Records a fixed plan so even a pipeline that fails downstream leaves a
/// well-formed projection (spec.md §4.3: "partial progress is still
/// meaningful").
pub struct SelectNode;

#[async_trait]
impl Node for SelectNode {
    fn name(&self) -> &'static str {
        "SelectNode"
    }

    async fn run(&self, mut ctx: TaskContext) -> Result<TaskContext, NodeError> {
        ctx.metadata.extra.insert(
            "plan".to_string(),
            json!(["provision_container", "install_dependencies", "build", "push"]),
        );
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_core::test_support::fresh_event;

    #[tokio::test]
    async fn records_the_fixed_plan() {
        let node = SelectNode;
        let ctx = TaskContext { event: Some(fresh_event("acme").data), ..TaskContext::empty() };
        let ctx = node.run(ctx).await.unwrap();
        assert!(ctx.metadata.extra.contains_key("plan"));
    }
}
