// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! devteam-core: domain types for the DevTeam automation orchestrator.
//!
//! This crate has no I/O. It defines the `Event`/`task_context` data model,
//! the status projection types, the container configuration, the shared
//! error taxonomy, and small ambient utilities (ids, clock, secret
//! redaction) used by every other crate in the workspace.

pub mod macros;

pub mod clock;
pub mod container;
pub mod error;
pub mod event;
pub mod id;
pub mod redact;
pub mod status;
pub mod submission;
pub mod task_context;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use container::{ContainerConfig, ContainerRecord, ResourceLimits};
pub use error::{DevTeamError, ErrorKind};
pub use event::{Event, EventId};
pub use id::short;
pub use redact::SecretRedactor;
pub use status::{Artifacts, ExecutionStatus, StatusProjection, Totals};
pub use submission::{validate_project_id, SubmissionOptions, SubmissionPayload, SubmissionType, TaskSpec};
pub use task_context::{NodeState, NodeStatus, TaskContext, TaskMetadata};
