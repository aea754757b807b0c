// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission payload — the external schema validated at ingress.

use crate::error::DevTeamError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn project_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_/-]+$").expect("constant regex pattern is valid"))
}

/// Discriminator chosen at ingestion. Unknown wire values fall back to
/// [`SubmissionType::Placeholder`] rather than rejecting the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    DevteamAutomation,
    Placeholder,
}

impl SubmissionType {
    pub fn workflow_type(self) -> &'static str {
        match self {
            SubmissionType::DevteamAutomation => "DEVTEAM_AUTOMATION",
            SubmissionType::Placeholder => "PLACEHOLDER",
        }
    }

    /// Parse a wire-level type string, defaulting unknown values to
    /// `PLACEHOLDER` per the ingestion contract.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "DEVTEAM_AUTOMATION" => SubmissionType::DevteamAutomation,
            _ => SubmissionType::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOptions {
    pub stop_point: Option<String>,
    pub idempotency_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u8,
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_retry_count() -> u8 {
    2
}

/// The validated external submission schema (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub submission_type: SubmissionType,
    pub project_id: String,
    pub task: TaskSpec,
    #[serde(default)]
    pub options: SubmissionOptions,
}

/// Validate a bare `project_id` against the ingress schema (spec.md §3),
/// independent of a full [`SubmissionPayload`] — used by lifecycle
/// control, which is scoped by `project_id` alone.
pub fn validate_project_id(project_id: &str) -> Result<(), DevTeamError> {
    if project_id.is_empty() {
        return Err(DevTeamError::Validation("project_id: must not be empty".to_string()));
    }
    if !project_id_pattern().is_match(project_id) {
        return Err(DevTeamError::Validation("project_id: must match ^[A-Za-z0-9_/-]+$".to_string()));
    }
    Ok(())
}

impl SubmissionPayload {
    /// Validate the payload against the ingress schema, returning a
    /// field-wise error list joined into one [`DevTeamError::Validation`].
    pub fn validate(&self) -> Result<(), DevTeamError> {
        let mut errors = Vec::new();

        if let Err(err) = validate_project_id(&self.project_id) {
            if let DevTeamError::Validation(msg) = err {
                errors.push(msg);
            }
        }

        if self.task.repository_url.is_empty() {
            errors.push("task.repository_url: must not be empty".to_string());
        }

        if self.options.retry_count < 1 || self.options.retry_count > 2 {
            errors.push("options.retry_count: must be 1 or 2".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DevTeamError::Validation(errors.join("; ")))
        }
    }
}
