// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-internal error type, converted to `devteam_core::DevTeamError`
//! at the crate boundary (mirroring every other crate in the workspace).

use devteam_core::DevTeamError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] devteam_storage::StorageError),
}

impl From<DaemonError> for DevTeamError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::Config(err) => DevTeamError::Service(err.to_string()),
            DaemonError::Storage(err) => err.into(),
        }
    }
}
