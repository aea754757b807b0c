// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6 output types. Projection itself (the pure `project()` function) lives
//! in `devteam-engine` since it also depends on [`crate::task_context`]
//! node ordering; this module only defines the shapes it produces.

use serde::{Deserialize, Serialize};

/// The public execution state surfaced to operator clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Idle,
    Initializing,
    Running,
    Paused,
    Stopping,
    Stopped,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub repo_path: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
}

/// C6's output record. See invariants in `crate::task_context` callers
/// (`devteam_engine::status_projection::project`); this type only carries
/// the data, it never validates itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusProjection {
    pub execution_id: String,
    pub project_id: String,
    pub customer_id: Option<String>,
    pub status: ExecutionStatus,
    pub progress: u8,
    pub current_task: Option<String>,
    pub totals: Totals,
    pub branch: Option<String>,
    pub artifacts: Artifacts,
    pub started_at: Option<String>,
    pub updated_at: String,
}

impl StatusProjection {
    /// True if every documented invariant (spec.md §3) holds. Exposed so
    /// tests and `proptest` properties can assert on arbitrary instances
    /// without duplicating the rule set.
    pub fn invariants_hold(&self) -> bool {
        if self.progress > 100 {
            return false;
        }
        if self.totals.completed > self.totals.total {
            return false;
        }
        match self.status {
            ExecutionStatus::Idle => self.progress == 0 && self.current_task.is_none(),
            ExecutionStatus::Initializing => self.progress <= 10,
            ExecutionStatus::Running => self.current_task.is_some() && self.progress < 100,
            ExecutionStatus::Completed => {
                self.progress == 100 && (self.totals.total == 0 || self.totals.completed == self.totals.total)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StatusProjection {
        StatusProjection {
            execution_id: "exec_1".into(),
            project_id: "p".into(),
            customer_id: None,
            status: ExecutionStatus::Idle,
            progress: 0,
            current_task: None,
            totals: Totals::default(),
            branch: None,
            artifacts: Artifacts::default(),
            started_at: None,
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn idle_requires_zero_progress() {
        let mut p = base();
        assert!(p.invariants_hold());
        p.progress = 5;
        assert!(!p.invariants_hold());
    }

    #[test]
    fn running_requires_current_task_and_sub_100() {
        let mut p = base();
        p.status = ExecutionStatus::Running;
        p.current_task = Some("BuildNode".into());
        p.progress = 50;
        assert!(p.invariants_hold());
        p.progress = 100;
        assert!(!p.invariants_hold());
        p.progress = 50;
        p.current_task = None;
        assert!(!p.invariants_hold());
    }

    #[test]
    fn completed_requires_full_progress_and_matching_totals() {
        let mut p = base();
        p.status = ExecutionStatus::Completed;
        p.progress = 100;
        p.totals = Totals { completed: 3, total: 3 };
        assert!(p.invariants_hold());
        p.totals = Totals { completed: 2, total: 3 };
        assert!(!p.invariants_hold());
    }

    #[test]
    fn totals_completed_never_exceeds_total() {
        let mut p = base();
        p.totals = Totals { completed: 5, total: 3 };
        assert!(!p.invariants_hold());
    }
}
