// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: state directory, WebSocket auth, and the
//! recognized environment variables (spec.md §6).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a state directory: set DEVTEAM_STATE_DIR, XDG_STATE_HOME, or HOME")]
    NoStateDir,
}

/// Resolve the state directory: `DEVTEAM_STATE_DIR` >
/// `XDG_STATE_HOME/devteam` > `~/.local/state/devteam`, following the
/// teacher's `oj-daemon::env::state_dir` resolution order.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("DEVTEAM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("devteam"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/devteam"))
}

/// Daemon-wide configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub wal_dir: PathBuf,
    /// Bearer token WebSocket subscribers must present (spec.md §6
    /// "WebSocket authentication"). `None` disables auth, for local dev.
    pub ws_auth_token: Option<String>,
    /// How long an idempotency key is honored before a replayed
    /// `initialize` is allowed to create a new execution (spec.md §8).
    pub idempotency_ttl: Duration,
    /// Reclamation sweep interval (spec.md §9 "Background tasks").
    pub reclamation_interval: Duration,
    pub container_ttl_days: u32,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        Ok(Self {
            wal_dir: state_dir.join("events"),
            state_dir,
            ws_auth_token: std::env::var("DEVTEAM_WS_AUTH_TOKEN").ok().filter(|s| !s.is_empty()),
            idempotency_ttl: Duration::from_secs(6 * 3600),
            reclamation_interval: reclamation_interval(),
            container_ttl_days: devteam_core::container::CONTAINER_TTL_DAYS,
        })
    }
}

fn reclamation_interval() -> Duration {
    std::env::var("DEVTEAM_RECLAMATION_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(24 * 3600))
}
