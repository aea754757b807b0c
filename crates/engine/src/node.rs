// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A Node is one step of a [`crate::workflow::Workflow`]; pure over
//! `TaskContext` modulo the I/O side effects it declares (spec.md
//! GLOSSARY).

use crate::error::NodeError;
use async_trait::async_trait;
use devteam_core::TaskContext;

#[async_trait]
pub trait Node: Send + Sync {
    /// The key under which this node's status lands in
    /// `task_context.nodes`.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: TaskContext) -> Result<TaskContext, NodeError>;
}
