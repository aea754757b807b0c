// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`ContainerAdapter`] for the engine's own tests — no
//! `docker` binary required. Health checks always pass; `exec` returns
//! a caller-supplied canned result.

use crate::error::ContainerAdapterError;
use crate::naming;
use crate::r#trait::{
    CleanupReport, ContainerAdapter, ContainerStatus, ExecOutput, HealthCheckReport,
    PerformanceMetrics, RepoRef, StartOrReuseOutcome,
};
use async_trait::async_trait;
use devteam_core::clock::{Clock, FakeClock};
use devteam_core::container::{ContainerRecord, ResourceLimits, MAX_GLOBAL_CONTAINERS};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

fn rfc3339_from_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn ms_from_rfc3339(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis())
}

/// Scripted response for [`FakeContainerAdapter::exec`], keyed by the
/// joined argv the test expects to be run.
#[derive(Debug, Clone)]
pub struct ScriptedExec {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptedExec {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: 0, stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: String::new(), stderr: stderr.into() }
    }
}

#[derive(Default)]
pub struct FakeContainerAdapter {
    registry: Mutex<BTreeMap<String, ContainerRecord>>,
    scripted: Mutex<BTreeMap<String, Vec<ScriptedExec>>>,
    fail_start: Mutex<Option<String>>,
    fail_ensure_repo: Mutex<Option<String>>,
    fail_verify_toolchain: Mutex<Option<String>>,
    clock: FakeClock,
    remove_calls: std::sync::atomic::AtomicUsize,
}

impl FakeContainerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next `exec` result for `project_id`; consumed FIFO.
    pub fn script_exec(&self, project_id: &str, result: ScriptedExec) {
        self.scripted.lock().entry(project_id.to_string()).or_default().push(result);
    }

    /// Make the next `start_or_reuse` for any project fail with
    /// `Container(reason)`, once.
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        *self.fail_start.lock() = Some(reason.into());
    }

    /// Make the next `ensure_repo` for any project fail, once.
    pub fn fail_next_ensure_repo(&self, reason: impl Into<String>) {
        *self.fail_ensure_repo.lock() = Some(reason.into());
    }

    /// Make the next `verify_toolchain` for any project fail, once.
    pub fn fail_next_verify_toolchain(&self, reason: impl Into<String>) {
        *self.fail_verify_toolchain.lock() = Some(reason.into());
    }

    /// Advance the clock `cleanup_expired` measures ages against.
    pub fn set_now_ms(&self, now_ms: u64) {
        self.clock.set_epoch_ms(now_ms);
    }

    /// Back-date an already-started project's `created` label, so a test
    /// can stage containers of different ages without waiting on a real
    /// clock. Stored as RFC3339, the same contract `DockerContainerAdapter`
    /// uses (spec.md §4.4's `created(ISO-8601)` label).
    pub fn set_created_at_ms(&self, project_id: &str, created_at_ms: u64) {
        if let Some(record) = self.registry.lock().get_mut(project_id) {
            record.created_at = rfc3339_from_ms(created_at_ms);
        }
    }

    /// Number of `remove` calls observed so far, for asserting
    /// between-attempt cleanup ran the expected number of times.
    pub fn remove_call_count(&self) -> usize {
        self.remove_calls.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl ContainerAdapter for FakeContainerAdapter {
    async fn start_or_reuse(
        &self,
        project_id: &str,
        _execution_id: &str,
    ) -> Result<StartOrReuseOutcome, ContainerAdapterError> {
        let container_id = naming::sanitize_project_id(project_id)?;
        if let Some(reason) = self.fail_start.lock().take() {
            return Err(ContainerAdapterError::CommandFailed(reason));
        }

        let already_registered = self.registry.lock().contains_key(project_id);
        if !already_registered && self.registry.lock().len() >= MAX_GLOBAL_CONTAINERS {
            return Err(ContainerAdapterError::CapacityExceeded("global container limit reached".to_string()));
        }

        let container_name = naming::container_name(&container_id);
        let volume_name = naming::volume_name(&container_id);
        let status = if already_registered { ContainerStatus::Reused } else { ContainerStatus::Started };
        self.registry.lock().insert(
            project_id.to_string(),
            ContainerRecord {
                project_id: project_id.to_string(),
                container_id: container_name.clone(),
                container_name: container_name.clone(),
                volume_name,
                created_at: self.clock.rfc3339(),
            },
        );
        Ok(StartOrReuseOutcome {
            success: true,
            container_id: container_name.clone(),
            container_status: status,
            container_name,
            performance_metrics: PerformanceMetrics { duration_ms: 0 },
            health_checks: HealthCheckReport { running: true, git_ok: true, node_ok: true, workspace_ok: true },
            resource_limits: ResourceLimits::default(),
        })
    }

    async fn ensure_repo(&self, project_id: &str, _repo: &RepoRef) -> Result<(), ContainerAdapterError> {
        if !self.registry.lock().contains_key(project_id) {
            return Err(ContainerAdapterError::NotFound(project_id.to_string()));
        }
        if let Some(reason) = self.fail_ensure_repo.lock().take() {
            return Err(ContainerAdapterError::CommandFailed(reason));
        }
        Ok(())
    }

    async fn verify_toolchain(
        &self,
        project_id: &str,
        _repo: &RepoRef,
        _required_script: Option<&str>,
    ) -> Result<(), ContainerAdapterError> {
        if !self.registry.lock().contains_key(project_id) {
            return Err(ContainerAdapterError::NotFound(project_id.to_string()));
        }
        if let Some(reason) = self.fail_verify_toolchain.lock().take() {
            return Err(ContainerAdapterError::CommandFailed(reason));
        }
        Ok(())
    }

    async fn exec(&self, project_id: &str, _argv: &[&str]) -> Result<ExecOutput, ContainerAdapterError> {
        if !self.registry.lock().contains_key(project_id) {
            return Err(ContainerAdapterError::NotFound(project_id.to_string()));
        }
        let next = self.scripted.lock().get_mut(project_id).and_then(|queue| {
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        let scripted = next.unwrap_or_else(|| ScriptedExec::ok(""));
        Ok(ExecOutput { exit_code: scripted.exit_code, stdout: scripted.stdout, stderr: scripted.stderr })
    }

    async fn remove(&self, project_id: &str) -> Result<(), ContainerAdapterError> {
        self.remove_calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.registry
            .lock()
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| ContainerAdapterError::NotFound(project_id.to_string()))
    }

    /// Same cutoff logic as [`crate::docker::DockerContainerAdapter`]:
    /// anything older than `max_age_days` against the fake's clock is
    /// dropped from the registry, with no actual process to tear down.
    async fn cleanup_expired(&self, max_age_days: u32) -> CleanupReport {
        let cutoff_ms = self.clock.epoch_ms() as i64 - i64::from(max_age_days) * 24 * 60 * 60 * 1000;
        let expired: Vec<String> = self
            .registry
            .lock()
            .iter()
            .filter(|(_, record)| ms_from_rfc3339(&record.created_at).map(|ts| ts < cutoff_ms).unwrap_or(false))
            .map(|(project_id, _)| project_id.clone())
            .collect();

        let mut report = CleanupReport::default();
        for project_id in expired {
            self.registry.lock().remove(&project_id);
            report.removed.push(project_id);
        }
        report
    }

    async fn live_count(&self) -> usize {
        self.registry.lock().len()
    }
}
