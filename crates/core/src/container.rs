// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project container configuration and registry record (C3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pinned image and fixed resource caps shared by every project container.
pub const BASE_IMAGE: &str = "node:18-alpine";
pub const CONTAINER_TTL_DAYS: u32 = 7;
pub const MAX_GLOBAL_CONTAINERS: usize = 5;
pub const MAX_PER_PROJECT_CONTAINERS: usize = 1;
pub const CONTAINER_NAME_PREFIX: &str = "clarity-project";
pub const VOLUME_NAME_PREFIX: &str = "clarity-project-vol";
pub const NETWORK_NAME: &str = "clarity-project-network";

/// CPU/RAM caps applied to every project container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpus: f64,
    pub memory_bytes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { cpus: 1.0, memory_bytes: 1024 * 1024 * 1024 }
    }
}

/// Declarative description of the container to create; carries no runtime
/// handle (that's [`ContainerRecord`]'s job once the adapter reports one
/// back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub image: String,
    pub container_name: String,
    pub volume_name: String,
    pub network_name: String,
    pub resource_limits: ResourceLimits,
    pub labels: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

impl ContainerConfig {
    /// Build the fixed-label, fixed-env configuration for `project_id`.
    /// `container_id` is the docker-safe identifier names are built from
    /// (the original, possibly `customer_id/project_id`-shaped, string
    /// goes only in the `project_id` label); `hash8` is the deterministic
    /// name suffix already computed by the adapter.
    pub fn new(container_id: &str, project_id: &str, hash8: &str, created_at: &str, forwarded_env: BTreeMap<String, String>) -> Self {
        let container_name = format!("{CONTAINER_NAME_PREFIX}-{container_id}-{hash8}");
        let volume_name = format!("{VOLUME_NAME_PREFIX}-{container_id}-{hash8}");

        let mut labels = BTreeMap::new();
        labels.insert("component".to_string(), "clarity-project".to_string());
        labels.insert("project_id".to_string(), project_id.to_string());
        labels.insert("created".to_string(), created_at.to_string());
        labels.insert("ttl_days".to_string(), CONTAINER_TTL_DAYS.to_string());

        let mut env = forwarded_env;
        env.insert("NODE_ENV".to_string(), "development".to_string());
        env.insert("CONTAINER_TYPE".to_string(), "clarity-project".to_string());
        env.insert("CONTAINER_TTL_DAYS".to_string(), CONTAINER_TTL_DAYS.to_string());

        Self {
            image: BASE_IMAGE.to_string(),
            container_name,
            volume_name,
            network_name: NETWORK_NAME.to_string(),
            resource_limits: ResourceLimits::default(),
            labels,
            env,
        }
    }
}

/// What a running container looks like after `start_or_reuse` succeeds.
/// Keyed by `project_id` in the in-process registry (exactly one live
/// record per project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub project_id: String,
    pub container_id: String,
    pub container_name: String,
    pub volume_name: String,
    pub created_at: String,
}
