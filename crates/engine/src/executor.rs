// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Executor (C4) — runs install/build commands inside a project
//! container with at most two attempts, between-attempt cleanup, and
//! structured retry metadata (spec.md §4.5).

use crate::error::ExecutorError;
use devteam_adapters::{shell_quote, ContainerAdapter, RepoRef};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// At most two attempts per call; this is the only place the limit lives
/// (spec.md §4.5 "Hard contract (PRD line 81)").
pub const MAX_ATTEMPTS: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Install,
    Build { script: String },
}

impl CommandKind {
    fn op_name(&self) -> &'static str {
        match self {
            CommandKind::Install => "install",
            CommandKind::Build { .. } => "build",
        }
    }

    /// The script `verify_toolchain` (spec.md §4.5 step 1.c) must find in
    /// `package.json`; installs don't name one.
    fn required_script(&self) -> Option<&str> {
        match self {
            CommandKind::Install => None,
            CommandKind::Build { script } => Some(script.as_str()),
        }
    }

    /// Run from inside the cloned repo's directory (spec.md §4.5 step
    /// 1.d), hence the `sh -c 'cd ... && ...'` wrapping rather than a
    /// bare argv the adapter would need a separate `cwd` for. `dir` and
    /// the build script name both ultimately come from submission data,
    /// so both are shell-quoted before they reach the script text.
    fn argv(&self, repo: &RepoRef) -> Vec<String> {
        let dir = shell_quote(&format!("/workspace/{}", repo.dir_name()));
        let command = match self {
            CommandKind::Install => "npm ci".to_string(),
            CommandKind::Build { script } => format!("npm run {}", shell_quote(script)),
        };
        vec!["sh".to_string(), "-c".to_string(), format!("cd {dir} && {command}")]
    }
}

/// Rejects `n<1 || n>2`; the sole gate on the retry bound (spec.md §4.5,
/// §8 testable property).
pub fn validate_retry_limit(n: u8, op: &str) -> Result<(), ExecutorError> {
    if n < 1 || n > MAX_ATTEMPTS {
        return Err(ExecutorError::InvalidRetryLimit { op: op.to_string(), n });
    }
    Ok(())
}

/// One attempt's outcome. Successes are not listed in
/// `ExecutionResult::retry_attempts` (spec.md §4.5 "Result shape").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    pub attempt: u8,
    pub exit_code: i32,
    pub error_message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub execution_id: String,
    pub project_id: String,
    pub stdout_output: String,
    pub stderr_output: String,
    pub exit_code: i32,
    pub total_duration_ms: u64,
    pub container_id: String,
    pub attempt_count: u8,
    pub retry_attempts: Vec<RetryAttempt>,
    pub files_modified: Vec<String>,
}

#[allow(clippy::expect_used)]
fn modified_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"^modified\s+(.+)$")
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .expect("constant regex pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn created_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"^created\s+(.+)$")
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .expect("constant regex pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn deleted_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"^deleted\s+(.+)$")
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .expect("constant regex pattern is valid")
    })
}

/// Parse stdout for file-change lines; dedup and trim. Never fails the
/// run because capture failed — callers get an empty vec on no matches,
/// never an error (spec.md §4.5 "Artifact capture").
fn capture_artifacts(stdout: &str) -> Vec<String> {
    let mut found = Vec::new();
    for pattern in [modified_pattern(), created_pattern(), deleted_pattern()] {
        for caps in pattern.captures_iter(stdout) {
            let path = caps[1].trim().to_string();
            if !path.is_empty() && !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

pub struct CommandExecutor<A: ContainerAdapter> {
    adapter: Arc<A>,
}

impl<A: ContainerAdapter> CommandExecutor<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    /// spec.md §4.5 `execute(context, op, max_attempts<=2)`. Per-attempt
    /// state machine: `ready -> container_ready -> repo_ready ->
    /// tool_verified -> running -> {success | failed}`; a `failed`
    /// attempt with attempts remaining transitions `cleanup -> ready`.
    pub async fn execute(
        &self,
        project_id: &str,
        execution_id: &str,
        kind: CommandKind,
        repo: &RepoRef,
        max_attempts: u8,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutorError> {
        validate_retry_limit(max_attempts, kind.op_name())?;
        let start = Instant::now();
        let argv = kind.argv(repo);
        let argv_refs: Vec<&str> = argv.iter().map(String::as_str).collect();

        let mut retry_attempts = Vec::new();

        for attempt in 1..=max_attempts {
            // ready -> container_ready
            let outcome = self.adapter.start_or_reuse(project_id, execution_id).await?;
            let container_id = outcome.container_id.clone();

            // container_ready -> repo_ready
            if let Err(err) = self.adapter.ensure_repo(project_id, repo).await {
                retry_attempts.push(RetryAttempt {
                    attempt,
                    exit_code: -1,
                    error_message: format!("repository clone/verify failed: {err}"),
                    duration_ms: start.elapsed().as_millis() as u64,
                });
                if attempt < max_attempts {
                    let _ = self.adapter.remove(project_id).await;
                }
                continue;
            }

            // repo_ready -> tool_verified
            if let Err(err) = self.adapter.verify_toolchain(project_id, repo, kind.required_script()).await {
                retry_attempts.push(RetryAttempt {
                    attempt,
                    exit_code: -1,
                    error_message: format!("toolchain verification failed: {err}"),
                    duration_ms: start.elapsed().as_millis() as u64,
                });
                if attempt < max_attempts {
                    let _ = self.adapter.remove(project_id).await;
                }
                continue;
            }

            // tool_verified -> running
            let exec_result = tokio::time::timeout(timeout, self.adapter.exec(project_id, &argv_refs)).await;

            let exec_output = match exec_result {
                Ok(Ok(output)) => output,
                Ok(Err(err)) => return Err(ExecutorError::Container(err)),
                Err(_elapsed) => {
                    retry_attempts.push(RetryAttempt {
                        attempt,
                        exit_code: -1,
                        error_message: format!("attempt timed out after {}s", timeout.as_secs()),
                        duration_ms: timeout.as_millis() as u64,
                    });
                    if attempt < max_attempts {
                        let _ = self.adapter.remove(project_id).await;
                    }
                    continue;
                }
            };

            if exec_output.succeeded() {
                return Ok(ExecutionResult {
                    success: true,
                    execution_id: execution_id.to_string(),
                    project_id: project_id.to_string(),
                    stdout_output: exec_output.stdout.clone(),
                    stderr_output: exec_output.stderr,
                    exit_code: exec_output.exit_code,
                    total_duration_ms: start.elapsed().as_millis() as u64,
                    container_id,
                    attempt_count: attempt,
                    retry_attempts,
                    files_modified: capture_artifacts(&exec_output.stdout),
                });
            }

            retry_attempts.push(RetryAttempt {
                attempt,
                exit_code: exec_output.exit_code,
                error_message: tail(&exec_output.stderr, 500),
                duration_ms: start.elapsed().as_millis() as u64,
            });

            if attempt < max_attempts {
                if let Err(err) = self.adapter.remove(project_id).await {
                    tracing::warn!(%project_id, %err, "between-attempt cleanup failed, continuing");
                }
            }
        }

        match retry_attempts.last() {
            Some(last) => Err(ExecutorError::Exhausted {
                attempt_count: retry_attempts.len() as u8,
                exit_code: last.exit_code,
                stderr_tail: last.error_message.clone(),
            }),
            None => Err(ExecutorError::Exhausted { attempt_count: 0, exit_code: -1, stderr_tail: String::new() }),
        }
    }
}

fn tail(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().skip(s.chars().count() - max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_adapters::fake::{FakeContainerAdapter, ScriptedExec};

    fn test_repo() -> RepoRef {
        RepoRef::new("https://git.example.com/acme/widgets.git", "main")
    }

    #[yare::parameterized(
        one  = { 1, true },
        two  = { 2, true },
        zero = { 0, false },
        three = { 3, false },
    )]
    fn validate_retry_limit_cases(n: u8, should_pass: bool) {
        assert_eq!(validate_retry_limit(n, "install").is_ok(), should_pass);
    }

    #[test]
    fn capture_artifacts_dedups_and_trims_across_all_three_verbs() {
        let stdout = "Modified  src/lib.rs\ncreated src/new.rs\nModified src/lib.rs\nDELETED old.rs\n";
        let files = capture_artifacts(stdout);
        assert_eq!(files, vec!["src/lib.rs".to_string(), "src/new.rs".to_string(), "old.rs".to_string()]);
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_with_no_retries_recorded() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.script_exec("acme", ScriptedExec::ok("Modified src/lib.rs"));

        let executor = CommandExecutor::new(adapter);
        let result = executor
            .execute("acme", "exec-1", CommandKind::Install, &test_repo(), 2, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempt_count, 1);
        assert!(result.retry_attempts.is_empty());
        assert_eq!(result.files_modified, vec!["src/lib.rs".to_string()]);
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.script_exec("acme", ScriptedExec::failed(1, "transient failure"));
        adapter.script_exec("acme", ScriptedExec::ok(""));

        let executor = CommandExecutor::new(adapter);
        let result = executor
            .execute("acme", "exec-1", CommandKind::Install, &test_repo(), 2, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempt_count, 2);
        assert_eq!(result.retry_attempts.len(), 1);
    }

    #[tokio::test]
    async fn exhausts_after_two_failed_attempts() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.script_exec("acme", ScriptedExec::failed(1, "nope"));
        adapter.script_exec("acme", ScriptedExec::failed(1, "still nope"));

        let executor = CommandExecutor::new(adapter);
        let err = executor
            .execute("acme", "exec-1", CommandKind::Build { script: "build".to_string() }, &test_repo(), 2, Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::Exhausted { exit_code: 1, .. }));
    }

    #[tokio::test]
    async fn retries_once_after_a_failed_repo_clone_then_succeeds() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.fail_next_ensure_repo("clone failed: repository not found");
        adapter.script_exec("acme", ScriptedExec::ok(""));

        let executor = CommandExecutor::new(adapter.clone());
        let result = executor
            .execute("acme", "exec-1", CommandKind::Install, &test_repo(), 2, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempt_count, 2);
        assert_eq!(result.retry_attempts.len(), 1);
        assert!(result.retry_attempts[0].error_message.contains("clone"));
        assert_eq!(adapter.remove_call_count(), 1);
    }

    #[tokio::test]
    async fn retries_once_after_a_failed_toolchain_check_then_succeeds() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        adapter.start_or_reuse("acme", "exec-1").await.unwrap();
        adapter.fail_next_verify_toolchain("npm: command not found");
        adapter.script_exec("acme", ScriptedExec::ok(""));

        let executor = CommandExecutor::new(adapter.clone());
        let result = executor
            .execute("acme", "exec-1", CommandKind::Build { script: "build".to_string() }, &test_repo(), 2, Duration::from_secs(30))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempt_count, 2);
        assert_eq!(result.retry_attempts.len(), 1);
        assert!(result.retry_attempts[0].error_message.contains("toolchain"));
    }

    #[tokio::test]
    async fn rejects_invalid_max_attempts_before_touching_the_adapter() {
        let adapter = Arc::new(FakeContainerAdapter::new());
        let executor = CommandExecutor::new(adapter);
        let err = executor
            .execute("acme", "exec-1", CommandKind::Install, &test_repo(), 5, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidRetryLimit { .. }));
    }
}
