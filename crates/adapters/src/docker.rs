// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live [`ContainerAdapter`]: shells out to the `docker` CLI via
//! `tokio::process::Command`, the same shape as the teacher's
//! `DockerAdapter::docker_spawn`/`run_docker`. No Docker SDK dependency.

use crate::error::ContainerAdapterError;
use crate::health;
use crate::naming;
use crate::r#trait::{
    shell_quote, CleanupReport, ContainerAdapter, ContainerStatus, ExecOutput, HealthCheckReport,
    PerformanceMetrics, RepoRef, StartOrReuseOutcome,
};
use async_trait::async_trait;
use devteam_core::container::{
    ContainerConfig, ContainerRecord, CONTAINER_TTL_DAYS, MAX_GLOBAL_CONTAINERS, NETWORK_NAME,
};
use devteam_core::redact::GIT_AUTH_ENV_VARS;
use devteam_core::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Project containers are kept alive by a no-op foreground command so the
/// adapter can `docker exec` into them on demand.
const KEEPALIVE_CMD: &[&str] = &["tail", "-f", "/dev/null"];

/// The label every project container and volume carries, and the sole
/// source of truth `cleanup_expired` queries against (spec.md §4.4
/// "Reclamation") — never the in-process registry, which only reflects
/// what this process has started or reused since it came up.
const COMPONENT_LABEL_FILTER: &str = "label=component=clarity-project";

fn parse_rfc3339_ms(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis())
}

/// Docker CLI adapter. One instance per daemon process; cheap to clone
/// (everything inside is `Arc`).
#[derive(Clone)]
pub struct DockerContainerAdapter<C: Clock = SystemClock> {
    /// Gates the in-process registry. Held only for O(1) lookups/inserts.
    registry: Arc<Mutex<BTreeMap<String, ContainerRecord>>>,
    /// Gates the first `docker info` probe; subsequent calls see it's
    /// already been done. Mirrors the "lazy connection" lock in spec.md
    /// §4.4 — there's no persistent connection with a CLI adapter, but
    /// the first real call still pays for discovering the daemon.
    connected: Arc<AsyncMutex<bool>>,
    clock: C,
}

impl Default for DockerContainerAdapter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerContainerAdapter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> DockerContainerAdapter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { registry: Arc::new(Mutex::new(BTreeMap::new())), connected: Arc::new(AsyncMutex::new(false)), clock }
    }

    async fn ensure_connected(&self) -> Result<(), ContainerAdapterError> {
        let mut guard = self.connected.lock().await;
        if *guard {
            return Ok(());
        }
        run_docker(&["info"]).await?;
        *guard = true;
        Ok(())
    }

    fn forwarded_env(&self) -> BTreeMap<String, String> {
        GIT_AUTH_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| ((*name).to_string(), v)))
            .collect()
    }

    async fn ensure_network_exists(&self) -> Result<(), ContainerAdapterError> {
        if run_docker(&["network", "inspect", NETWORK_NAME]).await.is_ok() {
            return Ok(());
        }
        run_docker(&["network", "create", "--label", "component=clarity-project", NETWORK_NAME])
            .await
            .map(|_| ())
    }

    async fn ensure_volume_exists(&self, volume_name: &str, project_id: &str, created_at: &str) -> Result<(), ContainerAdapterError> {
        if run_docker(&["volume", "inspect", volume_name]).await.is_ok() {
            return Ok(());
        }
        let created_label = format!("created={created_at}");
        let project_label = format!("project_id={project_id}");
        run_docker(&[
            "volume",
            "create",
            "--label",
            "component=clarity-project",
            "--label",
            &project_label,
            "--label",
            &created_label,
            "--label",
            &format!("ttl_days={CONTAINER_TTL_DAYS}"),
            volume_name,
        ])
        .await
        .map(|_| ())
    }

    async fn inspect_status(&self, container_name: &str) -> Option<String> {
        run_docker(&["inspect", "-f", "{{.State.Status}}", container_name]).await.ok()
    }

    async fn run_health_checks(&self, container_name: &str) -> HealthCheckReport {
        let running = self.inspect_status(container_name).await.map(|s| health::is_running(&s)).unwrap_or(false);
        if !running {
            return HealthCheckReport { running: false, git_ok: false, node_ok: false, workspace_ok: false };
        }
        let git_ok = health::exec_ok(run_docker(&["exec", container_name, "git", "--version"]).await.is_ok());
        let node_ok = health::exec_ok(run_docker(&["exec", container_name, "node", "--version"]).await.is_ok());
        let workspace_ok = health::exec_ok(run_docker(&["exec", container_name, "ls", "/workspace"]).await.is_ok());
        HealthCheckReport { running, git_ok, node_ok, workspace_ok }
    }

    async fn create_container(&self, cfg: &ContainerConfig) -> Result<String, ContainerAdapterError> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            cfg.container_name.clone(),
            "--network".into(),
            cfg.network_name.clone(),
            "--cpus".into(),
            cfg.resource_limits.cpus.to_string(),
            "--memory".into(),
            cfg.resource_limits.memory_bytes.to_string(),
            "-v".into(),
            format!("{}:/workspace", cfg.volume_name),
        ];
        for (k, v) in &cfg.labels {
            args.push("--label".into());
            args.push(format!("{k}={v}"));
        }
        for (k, v) in &cfg.env {
            args.push("-e".into());
            args.push(format!("{k}={v}"));
        }
        args.push(cfg.image.clone());
        for word in KEEPALIVE_CMD {
            args.push((*word).to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_docker(&arg_refs)
    .await
    }

    async fn remove_container_and_volume(&self, container_name: &str, volume_name: &str) {
        if let Err(err) = run_docker(&["rm", "-f", container_name]).await {
            tracing::warn!(%container_name, %err, "failed to remove container");
        }
        if let Err(err) = run_docker(&["volume", "rm", volume_name]).await {
            tracing::warn!(%volume_name, %err, "failed to remove volume");
        }
    }

    /// Drop any in-process registry entry that points at `container_name`,
    /// so a reclamation the daemon didn't itself initiate (another
    /// process, a restart) doesn't leave a stale record behind.
    fn forget_by_container_name(&self, container_name: &str) {
        let stale: Vec<String> = self
            .registry
            .lock()
            .iter()
            .filter(|(_, record)| record.container_name == container_name)
            .map(|(project_id, _)| project_id.clone())
            .collect();
        for project_id in stale {
            self.registry.lock().remove(&project_id);
        }
    }

    async fn list_container_names(&self) -> Result<Vec<String>, ContainerAdapterError> {
        let out = run_docker(&["ps", "-a", "--filter", COMPONENT_LABEL_FILTER, "--format", "{{.Names}}"]).await?;
        Ok(out.lines().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
    }

    async fn list_volume_names(&self) -> Result<Vec<String>, ContainerAdapterError> {
        let out = run_docker(&["volume", "ls", "--filter", COMPONENT_LABEL_FILTER, "--format", "{{.Name}}"]).await?;
        Ok(out.lines().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
    }

    async fn container_created_label(&self, container_name: &str) -> Option<String> {
        run_docker(&["inspect", "-f", "{{index .Config.Labels \"created\"}}", container_name])
            .await
            .ok()
            .filter(|v| !v.is_empty() && v != "<no value>")
    }

    async fn volume_created_label(&self, volume_name: &str) -> Option<String> {
        run_docker(&["volume", "inspect", "-f", "{{index .Labels \"created\"}}", volume_name])
            .await
            .ok()
            .filter(|v| !v.is_empty() && v != "<no value>")
    }

    fn container_name_for(&self, project_id: &str) -> Result<String, ContainerAdapterError> {
        self.registry
            .lock()
            .get(project_id)
            .map(|r| r.container_name.clone())
            .ok_or_else(|| ContainerAdapterError::NotFound(project_id.to_string()))
    }
}

#[async_trait]
impl<C: Clock> ContainerAdapter for DockerContainerAdapter<C> {
    async fn start_or_reuse(
        &self,
        project_id: &str,
        execution_id: &str,
    ) -> Result<StartOrReuseOutcome, ContainerAdapterError> {
        let start = std::time::Instant::now();
        let container_id = naming::sanitize_project_id(project_id)?;
        self.ensure_connected().await?;

        let already_registered = self.registry.lock().contains_key(project_id);
        if !already_registered {
            let global_count = self.registry.lock().len();
            if global_count >= MAX_GLOBAL_CONTAINERS {
                return Err(ContainerAdapterError::CapacityExceeded(format!(
                    "global container limit reached ({global_count}/{MAX_GLOBAL_CONTAINERS})"
                )));
            }
        }

        let hash8 = naming::hash8(&container_id);
        let container_name = naming::container_name(&container_id);
        let volume_name = naming::volume_name(&container_id);
        let created_at = self.clock.rfc3339();

        if let Some(status) = self.inspect_status(&container_name).await {
            if health::is_running(&status) {
                let health_checks = self.run_health_checks(&container_name).await;
                if health_checks.all_passed() {
                    tracing::info!(%project_id, %execution_id, %container_name, "reusing healthy container");
                    let record = ContainerRecord {
                        project_id: project_id.to_string(),
                        container_id: container_name.clone(),
                        container_name: container_name.clone(),
                        volume_name: volume_name.clone(),
                        created_at: created_at.clone(),
                    };
                    self.registry.lock().insert(project_id.to_string(), record);
                    return Ok(StartOrReuseOutcome {
                        success: true,
                        container_id: container_name.clone(),
                        container_status: ContainerStatus::Reused,
                        container_name,
                        performance_metrics: PerformanceMetrics { duration_ms: start.elapsed().as_millis() as u64 },
                        health_checks,
                        resource_limits: Default::default(),
                    });
                }
            }
            tracing::warn!(%project_id, %container_name, "existing container unhealthy, removing");
            self.remove_container_and_volume(&container_name, &volume_name).await;
        }

        self.ensure_network_exists().await?;
        self.ensure_volume_exists(&volume_name, project_id, &created_at).await?;

        let cfg = ContainerConfig::new(&container_id, project_id, &hash8, &created_at, self.forwarded_env());
        self.create_container(&cfg).await?;

        let health_checks = self.run_health_checks(&container_name).await;
        if !health_checks.all_passed() {
            self.remove_container_and_volume(&container_name, &volume_name).await;
            return Err(ContainerAdapterError::HealthCheckFailed(format!("{health_checks:?}")));
        }

        let record = ContainerRecord {
            project_id: project_id.to_string(),
            container_id: container_name.clone(),
            container_name: container_name.clone(),
            volume_name,
            created_at,
        };
        self.registry.lock().insert(project_id.to_string(), record);

        tracing::info!(%project_id, %execution_id, %container_name, "container started");
        Ok(StartOrReuseOutcome {
            success: true,
            container_id: container_name.clone(),
            container_status: ContainerStatus::Started,
            container_name,
            performance_metrics: PerformanceMetrics { duration_ms: start.elapsed().as_millis() as u64 },
            health_checks,
            resource_limits: cfg.resource_limits,
        })
    }

    async fn ensure_repo(&self, project_id: &str, repo: &RepoRef) -> Result<(), ContainerAdapterError> {
        let container_name = self.container_name_for(project_id)?;
        let dir = format!("/workspace/{}", repo.dir_name());
        let dir_q = shell_quote(&dir);
        let url_q = shell_quote(&repo.url);
        let branch_q = shell_quote(&repo.branch);
        let script = format!(
            "set -e; if [ -d {dir_q}/.git ] && [ \"$(git -C {dir_q} remote get-url origin 2>/dev/null)\" = {url_q} ]; then exit 0; fi; rm -rf {dir_q}; git clone --branch {branch_q} {url_q} {dir_q}"
        );
        let output = run_docker_full(&["exec", &container_name, "sh", "-c", &script]).await?;
        if output.succeeded() {
            Ok(())
        } else {
            Err(ContainerAdapterError::CommandFailed(format!("repository clone failed: {}", output.stderr)))
        }
    }

    async fn verify_toolchain(
        &self,
        project_id: &str,
        repo: &RepoRef,
        required_script: Option<&str>,
    ) -> Result<(), ContainerAdapterError> {
        let container_name = self.container_name_for(project_id)?;
        let dir = format!("/workspace/{}", repo.dir_name());
        let dir_q = shell_quote(&dir);
        let mut script = format!("set -e; cd {dir_q}; npm --version >/dev/null; test -f package.json");
        if let Some(name) = required_script {
            // The script name is passed as an argv element (`process.argv[1]`),
            // never spliced into the JS source itself.
            script.push_str(&format!(
                "; node -e 'const p=require(\"./package.json\"); if(!p.scripts || !p.scripts[process.argv[1]]) process.exit(1)' -- {}",
                shell_quote(name)
            ));
        }
        let output = run_docker_full(&["exec", &container_name, "sh", "-c", &script]).await?;
        if output.succeeded() {
            Ok(())
        } else {
            Err(ContainerAdapterError::CommandFailed(format!("toolchain verification failed: {}", output.stderr)))
        }
    }

    async fn exec(&self, project_id: &str, argv: &[&str]) -> Result<ExecOutput, ContainerAdapterError> {
        let container_name = self.container_name_for(project_id)?;
        let mut args = vec!["exec", container_name.as_str()];
        args.extend_from_slice(argv);
        run_docker_full(&args).await
    }

    async fn remove(&self, project_id: &str) -> Result<(), ContainerAdapterError> {
        let record = {
            self.registry
                .lock()
                .remove(project_id)
                .ok_or_else(|| ContainerAdapterError::NotFound(project_id.to_string()))?
        };
        self.remove_container_and_volume(&record.container_name, &record.volume_name).await;
        Ok(())
    }

    /// Reclamation is label-driven (spec.md §4.4): the live `docker
    /// ps`/`volume ls` output labeled `component=clarity-project` is the
    /// sole source of truth, not the in-process registry, so containers
    /// started by another process or a prior run of this daemon are
    /// still reclaimed. Never fails the whole operation on one bad item.
    async fn cleanup_expired(&self, max_age_days: u32) -> CleanupReport {
        let cutoff_ms = self.clock.epoch_ms() as i64 - i64::from(max_age_days) * 24 * 60 * 60 * 1000;
        let mut report = CleanupReport::default();

        match self.list_container_names().await {
            Ok(names) => {
                for name in names {
                    let Some(created) = self.container_created_label(&name).await else { continue };
                    let Some(created_ms) = parse_rfc3339_ms(&created) else { continue };
                    if created_ms >= cutoff_ms {
                        continue;
                    }
                    match run_docker(&["rm", "-f", &name]).await {
                        Ok(_) => {
                            self.forget_by_container_name(&name);
                            report.removed.push(name);
                        }
                        Err(err) => report.errors.push((name, err.to_string())),
                    }
                }
            }
            Err(err) => report.errors.push(("containers".to_string(), err.to_string())),
        }

        match self.list_volume_names().await {
            Ok(names) => {
                for name in names {
                    let Some(created) = self.volume_created_label(&name).await else { continue };
                    let Some(created_ms) = parse_rfc3339_ms(&created) else { continue };
                    if created_ms >= cutoff_ms {
                        continue;
                    }
                    match run_docker(&["volume", "rm", "-f", &name]).await {
                        Ok(_) => report.removed.push(name),
                        Err(err) => report.errors.push((name, err.to_string())),
                    }
                }
            }
            Err(err) => report.errors.push(("volumes".to_string(), err.to_string())),
        }

        report
    }

    async fn live_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Run a docker CLI command and return trimmed stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, ContainerAdapterError> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| ContainerAdapterError::CommandFailed(format!("failed to exec docker: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ContainerAdapterError::CommandFailed(format!(
            "docker {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        )))
    }
}

/// Like [`run_docker`] but returns stdout/stderr/exit code regardless of
/// success, for `exec` calls where a non-zero status is a normal outcome
/// the caller (the Command Executor) needs to inspect.
async fn run_docker_full(args: &[&str]) -> Result<ExecOutput, ContainerAdapterError> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| ContainerAdapterError::CommandFailed(format!("failed to exec docker: {e}")))?;
    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
