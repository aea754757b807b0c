// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-internal error type, converted to `devteam_core::DevTeamError`
//! at the crate boundary.

use devteam_core::DevTeamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("event not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for DevTeamError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => DevTeamError::NotFound(format!("event {id} not found")),
            other => DevTeamError::Repository(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        not_found = { StorageError::NotFound("evt-1".to_string()), "NOT_FOUND" },
        snapshot  = { StorageError::Snapshot("bad checkpoint".to_string()), "REPOSITORY_ERROR" },
        io        = { StorageError::Io(std::io::Error::other("disk full")), "REPOSITORY_ERROR" },
    )]
    fn storage_error_maps_to_error_code(err: StorageError, expected: &str) {
        let mapped: DevTeamError = err.into();
        assert_eq!(mapped.error_code(), expected);
    }
}
