// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion API (C7) — `submit_event`. The HTTP route binding itself is
//! out of scope (§1); this is the handler body a thin router adapter
//! calls.

use devteam_core::{Clock, DevTeamError, Event, EventId, SubmissionPayload};
use devteam_storage::EventStore;
use devteam_wire::SubmitEventResponse;
use tracing::info;

/// Validate, persist, and accept a freshly-submitted automation request
/// (spec.md §4.1). Returns 202-equivalent data on success; validation
/// failures never reach the store.
pub async fn submit_event<C: Clock>(
    store: &EventStore,
    clock: &C,
    payload: SubmissionPayload,
    correlation_id: impl Into<String>,
) -> Result<SubmitEventResponse, DevTeamError> {
    payload.validate()?;

    let correlation_id = correlation_id.into();
    let event_type = payload.submission_type.workflow_type().to_string();
    let event = Event::new(EventId::new(), event_type.clone(), correlation_id.clone(), payload, clock.rfc3339());
    let event_id = event.id;

    store.insert_event(event)?;
    info!(%event_id, %correlation_id, event_type, "accepted event for dispatch");

    Ok(SubmitEventResponse::accepted(event_id.to_string(), None, correlation_id, event_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_core::test_support::submission_payload;
    use devteam_core::FakeClock;
    use tempfile::tempdir;

    #[tokio::test]
    async fn accepts_a_valid_submission() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let clock = FakeClock::new();

        let resp = submit_event(&store, &clock, submission_payload("acme", "https://example.com/r.git"), "corr-1")
            .await
            .unwrap();

        assert_eq!(resp.status, "accepted");
        assert_eq!(resp.correlation_id, "corr-1");
        assert_eq!(resp.event_type, "DEVTEAM_AUTOMATION");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejects_an_invalid_project_id_before_touching_the_store() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        let clock = FakeClock::new();

        let payload = submission_payload("../bad", "https://example.com/r.git");
        let err = submit_event(&store, &clock, payload, "corr-1").await.unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(store.len(), 0);
    }
}
