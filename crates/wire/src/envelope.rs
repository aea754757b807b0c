// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The WebSocket envelope (C9) — exactly four fields, validated before a
//! broadcast ever reaches a subscriber.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_ENVELOPE_BYTES: usize = 10 * 1024;

/// The fixed enum of envelope types the hub will broadcast (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeType {
    ExecutionUpdate,
    ExecutionLog,
    Error,
    Completion,
    ConnectionEstablished,
    MessageReceived,
}

/// Exactly four fields: `type`, `ts` (UTC ISO-8601, trailing `Z`),
/// `projectId`, `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    pub ts: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("ts must be UTC ISO-8601 ending in 'Z'")]
    TimestampNotUtc,
    #[error("envelope serialized to {0} bytes, exceeds {MAX_ENVELOPE_BYTES}")]
    TooLarge(usize),
    #[error("envelope failed to serialize")]
    SerializationFailed,
}

impl Envelope {
    pub fn new(kind: EnvelopeType, ts: impl Into<String>, project_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { kind, ts: ts.into(), project_id: project_id.into(), payload }
    }

    /// Reject envelopes whose `ts` doesn't end in `Z` or whose serialized
    /// form exceeds [`MAX_ENVELOPE_BYTES`]. `type` and `projectId` are
    /// validated by construction (the enum and a non-empty string aren't
    /// separately checked here — callers build envelopes from trusted
    /// internal state, not directly from client input).
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if !self.ts.ends_with('Z') {
            return Err(EnvelopeError::TimestampNotUtc);
        }
        let serialized = serde_json::to_vec(self).map_err(|_| EnvelopeError::SerializationFailed)?;
        if serialized.len() > MAX_ENVELOPE_BYTES {
            return Err(EnvelopeError::TooLarge(serialized.len()));
        }
        Ok(())
    }
}
