// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Dispatcher (C8) — pulls queued event ids, drives each through
//! the workflow runtime, and persists the result back onto its `Event`
//! (spec.md §4.2).
//!
//! Ordering guarantee: a given event id is only ever enqueued once per
//! submission, and this dispatcher's own worker pool is the only
//! consumer, so at most one task runs it at a time (spec.md §5 "Per
//! Event UUID"). Workflows are themselves idempotent (§4.3), so a crash
//! between `replace_task_context` calls just means the next run repeats
//! whatever node didn't get to record its completion.

use devteam_core::{Clock, EventId, TaskContext};
use devteam_engine::Runtime;
use devteam_storage::EventStore;
use devteam_wire::{Envelope, EnvelopeType};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::hub::Hub;

/// Drives queued events through a [`Runtime`] and publishes the outcome.
pub struct Dispatcher<C: Clock> {
    store: EventStore,
    runtime: Arc<Runtime<C>>,
    hub: Hub,
    clock: C,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(store: EventStore, runtime: Arc<Runtime<C>>, hub: Hub, clock: C) -> Self {
        Self { store, runtime, hub, clock }
    }

    /// Spawn the worker pool: consumes `rx` until the sender side is
    /// dropped, running at most `concurrency` events at a time (spec.md
    /// §5 "parallelism ≥ number of cores, bounded by container-manager
    /// concurrency").
    pub fn spawn(self: Arc<Self>, mut rx: UnboundedReceiver<EventId>, concurrency: usize) -> JoinHandle<()> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        tokio::spawn(async move {
            while let Some(event_id) = rx.recv().await {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let dispatcher = self.clone();
                tokio::spawn(async move {
                    dispatcher.process(event_id).await;
                    drop(permit);
                });
            }
        })
    }

    /// Run one event to completion and persist + broadcast its result.
    /// A store read/write failure here is an infrastructure error
    /// (spec.md §5 "nack for redelivery"); since this queue has no
    /// external broker to redeliver through, it is logged and the event
    /// is left for the next `initialize`/resume or an operator retry.
    async fn process(&self, event_id: EventId) {
        let event = match self.store.get_event(event_id) {
            Ok(event) => event,
            Err(err) => {
                error!(%event_id, %err, "dispatcher could not load event");
                return;
            }
        };

        let ctx = event.task_context.clone().unwrap_or_else(|| {
            TaskContext::seed(event.data.clone(), event.correlation_id.clone(), event.data.project_id.clone(), None)
        });

        let ctx = self.runtime.run(ctx).await;

        if let Err(err) = self.store.replace_task_context(event_id, ctx.clone(), self.clock.rfc3339()) {
            error!(%event_id, %err, "failed to persist task_context after workflow run");
        }

        self.broadcast_update(&event.data.project_id, event_id, &ctx);
    }

    fn broadcast_update(&self, project_id: &str, event_id: EventId, ctx: &TaskContext) {
        let projection = devteam_engine::project(ctx, &event_id.to_string(), project_id, &self.clock.rfc3339());
        let kind = if matches!(projection.status, devteam_core::ExecutionStatus::Error) {
            EnvelopeType::Error
        } else if matches!(projection.status, devteam_core::ExecutionStatus::Completed) {
            EnvelopeType::Completion
        } else {
            EnvelopeType::ExecutionUpdate
        };

        let payload = match serde_json::to_value(&projection) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to serialize status projection for broadcast");
                return;
            }
        };

        let envelope = Envelope::new(kind, self.clock.rfc3339(), project_id, payload);
        if let Err(err) = self.hub.broadcast(envelope) {
            warn!(%err, "dropping an invalid outgoing envelope");
        }
    }
}
