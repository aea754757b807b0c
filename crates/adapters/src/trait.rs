// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Container Manager's (C3) adapter seam. `docker` shells out to the
//! real runtime; `fake` (test-support only) backs the engine's own tests
//! without a daemon on the box.

use crate::error::ContainerAdapterError;
use async_trait::async_trait;
use devteam_core::container::ResourceLimits;
use serde::{Deserialize, Serialize};

/// Whether `start_or_reuse` found a healthy container already running, or
/// had to create one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Started,
    Reused,
}

/// The four mandatory probes (spec.md §4.4). All must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthCheckReport {
    pub running: bool,
    pub git_ok: bool,
    pub node_ok: bool,
    pub workspace_ok: bool,
}

impl HealthCheckReport {
    pub fn all_passed(&self) -> bool {
        self.running && self.git_ok && self.node_ok && self.workspace_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOrReuseOutcome {
    pub success: bool,
    pub container_id: String,
    pub container_status: ContainerStatus,
    pub container_name: String,
    pub performance_metrics: PerformanceMetrics,
    pub health_checks: HealthCheckReport,
    pub resource_limits: ResourceLimits,
}

/// Tally from `cleanup_expired`: never fails the whole operation on a
/// single removal error, so callers get a report instead of a `Result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub errors: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn merge(&mut self, other: CleanupReport) {
        self.removed.extend(other.removed);
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// The repository the Command Executor (C4) clones into the project
/// container before running a command (spec.md §4.5 step 1.b).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub url: String,
    pub branch: String,
}

impl RepoRef {
    pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { url: url.into(), branch: branch.into() }
    }

    /// The directory name the repo lands in under `/workspace`: the
    /// final path segment of the URL with a trailing `.git` stripped.
    pub fn dir_name(&self) -> String {
        let trimmed = self.url.trim_end_matches('/').trim_end_matches(".git");
        match trimmed.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "repo".to_string(),
        }
    }
}

/// Single-quote `s` for safe interpolation into a POSIX `sh -c` script,
/// escaping embedded single quotes the standard `'\''` way. `url`/`branch`
/// and any derived path come from submission data a caller doesn't
/// control, so every value that reaches a shell script built by this
/// crate goes through this first.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// The seam the Command Executor (C4) and Lifecycle Control (C10) drive
/// against. One live implementation ([`crate::DockerContainerAdapter`]),
/// one test double ([`crate::fake::FakeContainerAdapter`], behind
/// `test-support`).
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    /// §4.4 steps 1-9. `execution_id` is carried through only for tracing.
    async fn start_or_reuse(
        &self,
        project_id: &str,
        execution_id: &str,
    ) -> Result<StartOrReuseOutcome, ContainerAdapterError>;

    /// Run `argv` inside the project's current container via `docker
    /// exec`. The container must already exist (call `start_or_reuse`
    /// first); this does not provision one.
    async fn exec(
        &self,
        project_id: &str,
        argv: &[&str],
    ) -> Result<ExecOutput, ContainerAdapterError>;

    /// §4.5 step 1.b: ensure `repo` is cloned at `/workspace/<repo.dir_name()>`
    /// pinned to `repo.branch`. Idempotent — if the directory already
    /// exists and its `origin` remote matches `repo.url`, this is a no-op.
    async fn ensure_repo(
        &self,
        project_id: &str,
        repo: &RepoRef,
    ) -> Result<(), ContainerAdapterError>;

    /// §4.5 step 1.c: verify the toolchain is usable — `npm --version`
    /// exits 0, `package.json` exists in the cloned repo, and, when
    /// `required_script` is given (the `build` kind), that the named
    /// script is present in `package.json`.
    async fn verify_toolchain(
        &self,
        project_id: &str,
        repo: &RepoRef,
        required_script: Option<&str>,
    ) -> Result<(), ContainerAdapterError>;

    /// Remove the project's container and volume unconditionally. Used
    /// by the Command Executor's between-attempt cleanup (`max_age_days
    /// = 0`) and by explicit lifecycle teardown.
    async fn remove(&self, project_id: &str) -> Result<(), ContainerAdapterError>;

    /// §4.4 reclamation. Idempotent; tallies successes and per-item
    /// errors rather than failing outright.
    async fn cleanup_expired(&self, max_age_days: u32) -> CleanupReport;

    /// Current count of live (registered) containers, for callers that
    /// want to report capacity without going through `start_or_reuse`.
    async fn live_count(&self) -> usize;
}
