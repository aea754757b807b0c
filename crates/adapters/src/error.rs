// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use devteam_core::DevTeamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerAdapterError {
    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("container capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("docker command failed: {0}")]
    CommandFailed(String),

    #[error("health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("container not found for project {0}")]
    NotFound(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<ContainerAdapterError> for DevTeamError {
    fn from(err: ContainerAdapterError) -> Self {
        match err {
            ContainerAdapterError::InvalidProjectId(msg) => DevTeamError::Validation(msg),
            ContainerAdapterError::NotFound(id) => DevTeamError::NotFound(format!("container for project {id}")),
            ContainerAdapterError::Cancelled => DevTeamError::Cancelled,
            other => DevTeamError::Container(other.to_string()),
        }
    }
}
