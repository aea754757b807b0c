// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Store (C1) — the durable table of submitted events and their
//! evolving `task_context`.
//!
//! Durability is a WAL of [`StorageOp`] values plus a periodic zstd
//! snapshot of the materialized table, following the same open/replay
//! shape as the rest of this workspace's event-sourced components: state
//! is derived from a log of facts, never mutated directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use devteam_core::{Event, EventId, TaskContext};

use crate::error::StorageError;
use crate::snapshot;
use crate::wal::Wal;

const SNAPSHOT_FILENAME: &str = "events.snapshot.zst";
const WAL_FILENAME: &str = "events.wal";

/// A fact applied to the materialized table. This is what actually gets
/// written to the WAL — not the domain `Event` directly — so that a
/// metadata-only update (`replace_task_context`) doesn't require
/// re-serializing the whole event.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum StorageOp {
    Insert(Box<Event>),
    ReplaceTaskContext { id: EventId, task_context: Box<TaskContext>, updated_at: String },
}

fn apply_op(table: &mut BTreeMap<EventId, Event>, op: &StorageOp) {
    match op {
        StorageOp::Insert(event) => {
            table.entry(event.id).or_insert_with(|| (**event).clone());
        }
        StorageOp::ReplaceTaskContext { id, task_context, updated_at } => {
            if let Some(event) = table.get_mut(id) {
                event.replace_task_context((**task_context).clone(), updated_at.clone());
            }
        }
    }
}

struct Inner {
    wal: Wal<StorageOp>,
    table: BTreeMap<EventId, Event>,
    dir: PathBuf,
}

/// The durable event table. Cheap to clone — wraps its mutable state in a
/// `Mutex` — so it can be shared across the ingestion API, the dispatcher,
/// and lifecycle control without an extra `Arc` at every call site.
#[derive(Clone)]
pub struct EventStore {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl EventStore {
    /// Open the store rooted at `dir` (created if absent), replaying the
    /// most recent snapshot plus any WAL entries written after it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILENAME);
        let (snapshot_seq, mut table) = snapshot::read::<Event>(&snapshot_path)?;
        info!(snapshot_seq, events = table.len(), "loaded event store snapshot");

        let wal_path = dir.join(WAL_FILENAME);
        let mut wal: Wal<StorageOp> = Wal::open(&wal_path, snapshot_seq)?;

        let replayed = wal.entries_after(snapshot_seq)?;
        for entry in &replayed {
            apply_op(&mut table, &entry.event);
        }
        if !replayed.is_empty() {
            debug!(replayed = replayed.len(), "replayed wal entries since last snapshot");
        }
        wal.mark_processed(wal.write_seq());

        Ok(Self { inner: std::sync::Arc::new(Mutex::new(Inner { wal, table, dir })) })
    }

    /// Persist a freshly-ingested event. Idempotent: inserting an id that
    /// already exists is a no-op (the stored copy wins), matching the
    /// at-least-once dispatch contract upstream.
    pub fn insert_event(&self, event: Event) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let op = StorageOp::Insert(Box::new(event));
        inner.wal.append(&op)?;
        apply_op(&mut inner.table, &op);
        if inner.wal.needs_flush() {
            inner.wal.flush()?;
        }
        Ok(())
    }

    pub fn get_event(&self, id: EventId) -> Result<Event, StorageError> {
        let inner = self.inner.lock();
        inner.table.get(&id).cloned().ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Replace `task_context` wholesale (the only mutation the dispatcher
    /// is allowed to make to a persisted event).
    pub fn replace_task_context(&self, id: EventId, task_context: TaskContext, updated_at: impl Into<String>) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if !inner.table.contains_key(&id) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let op = StorageOp::ReplaceTaskContext { id, task_context: Box::new(task_context), updated_at: updated_at.into() };
        inner.wal.append(&op)?;
        apply_op(&mut inner.table, &op);
        if inner.wal.needs_flush() {
            inner.wal.flush()?;
        }
        Ok(())
    }

    /// Scan the most recent `limit` events for the one whose
    /// `task_context.metadata.project_id` matches `project_id`, newest
    /// first by `updated_at`. Returns `None` if no match is found within
    /// the window — the caller (lifecycle control) reports that as 404.
    pub fn scan_recent_for_project(&self, project_id: &str, limit: usize) -> Option<Event> {
        let inner = self.inner.lock();
        let mut candidates: Vec<&Event> = inner.table.values().collect();
        candidates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        candidates
            .into_iter()
            .take(limit)
            .find(|e| e.task_context.as_ref().and_then(|ctx| ctx.metadata.project_id.as_deref()) == Some(project_id))
            .cloned()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.inner.lock().wal.flush()
    }

    /// Write a snapshot of the current table and compact the WAL behind
    /// it. Safe to call at any time; safe to skip (the WAL alone is
    /// sufficient for recovery, just slower to replay as it grows).
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.wal.flush()?;
        let seq = inner.wal.write_seq();
        let snapshot_path = inner.dir.join(SNAPSHOT_FILENAME);
        snapshot::write(&snapshot_path, seq, &inner.table)?;
        inner.wal.truncate_before(seq + 1)?;
        info!(seq, events = inner.table.len(), "wrote event store checkpoint");
        Ok(())
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn len(&self) -> usize {
        self.inner.lock().table.len()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Err(err) = self.wal.flush() {
            warn!(%err, "failed to flush event store wal on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_core::test_support::{fresh_event, seeded_task_context};
    use tempfile::tempdir;

    #[test]
    fn insert_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let event = fresh_event("proj-1");
        let id = event.id;

        store.insert_event(event.clone()).unwrap();
        let loaded = store.get_event(id).unwrap();
        assert_eq!(loaded, event);
    }

    #[test]
    fn get_missing_event_is_not_found() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let err = store.get_event(EventId::new()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn replace_task_context_is_visible_on_reread() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let event = fresh_event("proj-1");
        let id = event.id;
        store.insert_event(event).unwrap();

        let ctx = seeded_task_context("proj-1");
        store.replace_task_context(id, ctx.clone(), "2026-01-01T00:01:00Z").unwrap();

        let loaded = store.get_event(id).unwrap();
        assert_eq!(loaded.task_context, Some(ctx));
        assert_eq!(loaded.updated_at, "2026-01-01T00:01:00Z");
    }

    #[test]
    fn replace_task_context_on_missing_event_is_not_found() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let err = store.replace_task_context(EventId::new(), TaskContext::empty(), "now").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn scan_recent_for_project_finds_matching_context() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        let event = fresh_event("proj-a");
        let id = event.id;
        store.insert_event(event).unwrap();
        store.replace_task_context(id, seeded_task_context("proj-a"), "2026-01-01T00:01:00Z").unwrap();

        let other = fresh_event("proj-b");
        store.insert_event(other).unwrap();

        let found = store.scan_recent_for_project("proj-a", 100).unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn scan_recent_for_project_returns_none_when_absent() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        store.insert_event(fresh_event("proj-a")).unwrap();
        assert!(store.scan_recent_for_project("proj-missing", 100).is_none());
    }

    #[test]
    fn checkpoint_then_reopen_preserves_state() {
        let dir = tempdir().unwrap();
        let id;
        {
            let store = EventStore::open(dir.path()).unwrap();
            let event = fresh_event("proj-1");
            id = event.id;
            store.insert_event(event).unwrap();
            store.checkpoint().unwrap();
        }

        let reopened = EventStore::open(dir.path()).unwrap();
        let loaded = reopened.get_event(id).unwrap();
        assert_eq!(loaded.id, id);
    }

    #[test]
    fn reopen_without_checkpoint_replays_wal() {
        let dir = tempdir().unwrap();
        let id;
        {
            let store = EventStore::open(dir.path()).unwrap();
            let event = fresh_event("proj-1");
            id = event.id;
            store.insert_event(event).unwrap();
            store.flush().unwrap();
        }

        let reopened = EventStore::open(dir.path()).unwrap();
        assert!(reopened.get_event(id).is_ok());
    }
}
