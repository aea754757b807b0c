// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use devteam_core::DevTeamError;
use thiserror::Error;

/// Raised by a [`crate::node::Node`]'s `run`. Carries the node's own name
/// so the Runtime can record it under `nodes[name]` without the node
/// having to know its own position in the pipeline.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NodeError {
    pub message: String,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<DevTeamError> for NodeError {
    fn from(err: DevTeamError) -> Self {
        Self { message: err.to_string() }
    }
}

impl From<devteam_adapters::ContainerAdapterError> for NodeError {
    fn from(err: devteam_adapters::ContainerAdapterError) -> Self {
        Self { message: err.to_string() }
    }
}

impl From<ExecutorError> for NodeError {
    fn from(err: ExecutorError) -> Self {
        Self { message: err.to_string() }
    }
}

/// The Command Executor's (C4) error surface.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("retry limit invalid for {op}: must be 1 or 2, got {n}")]
    InvalidRetryLimit { op: String, n: u8 },

    #[error("command exhausted retries after {attempt_count} attempt(s): last exit code {exit_code}, stderr tail: {stderr_tail}")]
    Exhausted { attempt_count: u8, exit_code: i32, stderr_tail: String },

    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Container(#[from] devteam_adapters::ContainerAdapterError),
}

impl From<ExecutorError> for DevTeamError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::InvalidRetryLimit { op, n } => {
                DevTeamError::Validation(format!("retry limit invalid for {op}: must be 1 or 2, got {n}"))
            }
            ExecutorError::Exhausted { attempt_count: _, exit_code, stderr_tail } => {
                DevTeamError::Execution(format!("exit code {exit_code}: {stderr_tail}"))
            }
            ExecutorError::Cancelled => DevTeamError::Cancelled,
            ExecutorError::Container(err) => err.into(),
        }
    }
}
