// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `project_id` validation and the deterministic container/volume naming
//! scheme (spec.md §4.4 step 1 and step 3).

use crate::error::ContainerAdapterError;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn project_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("constant regex pattern is valid"))
}

const MAX_PROJECT_ID_LEN: usize = 100;

/// Validate `project_id`: non-empty, ≤100 chars, matches
/// `^[A-Za-z0-9_-]+$`, and contains no path-traversal sequences or control
/// characters (the allow-pattern already excludes `/` and `.`, so this is
/// belt-and-suspenders against anything the regex alone might miss).
pub fn validate_project_id(project_id: &str) -> Result<(), ContainerAdapterError> {
    if project_id.is_empty() {
        return Err(ContainerAdapterError::InvalidProjectId("must not be empty".to_string()));
    }
    if project_id.len() > MAX_PROJECT_ID_LEN {
        return Err(ContainerAdapterError::InvalidProjectId(format!("must be at most {MAX_PROJECT_ID_LEN} chars")));
    }
    if project_id.contains("..") {
        return Err(ContainerAdapterError::InvalidProjectId("must not contain path traversal sequences".to_string()));
    }
    if project_id.chars().any(|c| c.is_control()) {
        return Err(ContainerAdapterError::InvalidProjectId("must not contain control characters".to_string()));
    }
    if !project_id_pattern().is_match(project_id) {
        return Err(ContainerAdapterError::InvalidProjectId("must match ^[A-Za-z0-9_-]+$".to_string()));
    }
    Ok(())
}

/// First eight hex chars of SHA-256(project_id).
pub fn hash8(project_id: &str) -> String {
    let digest = Sha256::digest(project_id.as_bytes());
    let hex = format!("{digest:x}");
    hex[..8].to_string()
}

/// Derive a docker-safe identifier from a `project_id` that may carry the
/// ingestion schema's `customer_id/project_id` shape (spec.md §3's own
/// worked example, `cust-1/proj-a`). Runs the same path-traversal and
/// control-character checks `validate_project_id` runs against the raw
/// input, then collapses `/` into `-` so the result always matches
/// `^[A-Za-z0-9_-]+$`. The Container Manager (§4.4) only ever sees ids
/// that have been through this, never the raw customer-scoped id.
pub fn sanitize_project_id(project_id: &str) -> Result<String, ContainerAdapterError> {
    if project_id.is_empty() {
        return Err(ContainerAdapterError::InvalidProjectId("must not be empty".to_string()));
    }
    if project_id.len() > MAX_PROJECT_ID_LEN {
        return Err(ContainerAdapterError::InvalidProjectId(format!("must be at most {MAX_PROJECT_ID_LEN} chars")));
    }
    if project_id.contains("..") {
        return Err(ContainerAdapterError::InvalidProjectId("must not contain path traversal sequences".to_string()));
    }
    if project_id.chars().any(|c| c.is_control()) {
        return Err(ContainerAdapterError::InvalidProjectId("must not contain control characters".to_string()));
    }
    let collapsed: String = project_id.chars().map(|c| if c == '/' { '-' } else { c }).collect();
    validate_project_id(&collapsed)?;
    Ok(collapsed)
}

/// `container_id`/`volume_id` are expected to already be docker-safe
/// (post [`sanitize_project_id`]).
pub fn container_name(container_id: &str) -> String {
    format!("{}-{}-{}", devteam_core::container::CONTAINER_NAME_PREFIX, container_id, hash8(container_id))
}

pub fn volume_name(container_id: &str) -> String {
    format!("{}-{}-{}", devteam_core::container::VOLUME_NAME_PREFIX, container_id, hash8(container_id))
}
