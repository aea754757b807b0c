// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy.
//!
//! Each subsystem crate keeps its own `thiserror` enum for internal detail
//! (`ExecuteError`, `ContainerAdapterError`, `ConnectionError`, ...) and
//! converts into [`DevTeamError`] at its public boundary, mirroring the
//! per-crate error pattern this workspace already uses elsewhere. The
//! boundary type is what the wire envelope and HTTP handlers see.

use thiserror::Error;

/// The UPPER_SNAKE_CASE taxonomy reported in the wire envelope's
/// `error_code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Container,
    Execution,
    Repository,
    Service,
    Cancelled,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Container => "CONTAINER_ERROR",
            ErrorKind::Execution => "EXECUTION_ERROR",
            ErrorKind::Repository => "REPOSITORY_ERROR",
            ErrorKind::Service => "SERVICE_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }

    pub const fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Container => 502,
            ErrorKind::Execution => 500,
            ErrorKind::Repository => 500,
            ErrorKind::Service => 503,
            ErrorKind::Cancelled => 499,
        }
    }
}

/// The error type crossing crate boundaries: ingestion responses, lifecycle
/// control handlers, and anything surfaced in the WebSocket envelope's
/// `error` field.
#[derive(Debug, Error)]
pub enum DevTeamError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("container error: {0}")]
    Container(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("cancelled")]
    Cancelled,
}

impl DevTeamError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            DevTeamError::Validation(_) => ErrorKind::Validation,
            DevTeamError::NotFound(_) => ErrorKind::NotFound,
            DevTeamError::Conflict(_) => ErrorKind::Conflict,
            DevTeamError::Container(_) => ErrorKind::Container,
            DevTeamError::Execution(_) => ErrorKind::Execution,
            DevTeamError::Repository(_) => ErrorKind::Repository,
            DevTeamError::Service(_) => ErrorKind::Service,
            DevTeamError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        self.kind().code()
    }

    pub const fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}
