// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Data Models
//!
//! Core data types flowing through the relay pipeline, plus the request and
//! response structures of the status API. All API-facing types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON handling
//! and OpenAPI documentation.
//!
//! ## Pipeline Types
//!
//! - [`IntentEvent`]: the strict schema for a `new_intent` record read from
//!   the source chain. Payloads that do not deserialize into this shape are
//!   rejected at the watcher boundary, never propagated partially.
//! - [`Intent`]: the executable instruction submitted to the avatar, i.e.
//!   the event's signed fields plus the submission-time `expiry` and
//!   `chain_id` binding.
//! - [`IntentStatus`] / [`IntentStatusRecord`]: the per-event state machine
//!   tracked by the orchestrator and exposed over the status API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Source-Chain Event
// =============================================================================

/// A `new_intent` event as stored under the source contract's named keys.
///
/// Field names match the source-chain event payload exactly. `value` is kept
/// as a decimal string because the source chain serializes U512 amounts as
/// strings; it is parsed into a `U256` only at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IntentEvent {
    /// Source-chain identity (hex public key) that signed the intent.
    pub caller: String,
    /// Destination chain name the intent targets.
    pub target_chain: String,
    /// Destination address the avatar should call.
    pub target_address: String,
    /// Opaque call payload (0x-prefixed hex).
    pub data: String,
    /// Native value to forward, in wei, as a decimal string.
    pub value: String,
    /// Intent nonce; must equal the avatar's current counter.
    pub nonce: u64,
    /// Source-chain timestamp of the originating deploy.
    pub timestamp: String,
    /// Hash of the deploy that created this event.
    pub deploy_hash: String,
    /// Hash of the block the deploy landed in.
    pub block_hash: String,
}

impl IntentEvent {
    /// Stable identifier for this event, used for dedup and status keying.
    pub fn event_id(&self) -> String {
        format!("{}-{}", self.deploy_hash, self.nonce)
    }
}

// =============================================================================
// Executable Intent
// =============================================================================

/// An intent ready for execution on the destination chain.
///
/// Carries the event's signed fields unchanged, plus the `expiry` and
/// `chain_id` the relay binds at submission time. The canonical intent hash
/// covers only the signed fields (see `zk::intent_hash`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Intent {
    pub caller: String,
    pub target_chain: String,
    pub target_address: String,
    pub data: String,
    pub value: String,
    pub nonce: u64,
    /// Absolute unix timestamp after which the avatar rejects the intent.
    pub expiry: u64,
    /// Destination chain id the intent is bound to.
    pub chain_id: u64,
}

impl Intent {
    /// Bind an event to a destination chain with an absolute expiry.
    pub fn from_event(event: &IntentEvent, expiry: u64, chain_id: u64) -> Self {
        Self {
            caller: event.caller.clone(),
            target_chain: event.target_chain.clone(),
            target_address: event.target_address.clone(),
            data: event.data.clone(),
            value: event.value.clone(),
            nonce: event.nonce,
            expiry,
            chain_id,
        }
    }
}

// =============================================================================
// Intent Status
// =============================================================================

/// Lifecycle of a detected intent inside the relay.
///
/// `PendingSource → Proving → Submitting → Confirmed | Failed`. Created when
/// the watcher first observes the event, mutated only by the orchestrator,
/// retained in memory for the lifetime of the relay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Event detected on the source chain, signature not yet resolved.
    PendingSource,
    /// Zero-knowledge proof generation in progress.
    Proving,
    /// Proof verified locally, destination submission in progress.
    Submitting,
    /// Destination chain reported successful execution.
    Confirmed,
    /// Terminal failure at any stage; `error` carries the cause.
    Failed,
}

/// Status document for one event, keyed by its stable event id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntentStatusRecord {
    /// Stable event identifier (`{deploy_hash}-{nonce}`).
    pub event_id: String,
    /// Hash of the originating source-chain deploy.
    pub deploy_hash: String,
    /// Current pipeline stage.
    pub status: IntentStatus,
    /// Destination transaction hash, present once submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Gas used by the destination transaction, present once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Failure cause, present only in the `failed` state. Preserved
    /// verbatim from the failing stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When this record last changed.
    pub updated_at: DateTime<Utc>,
}

impl IntentStatusRecord {
    /// Fresh record in the given state.
    pub fn new(event_id: impl Into<String>, deploy_hash: impl Into<String>, status: IntentStatus) -> Self {
        Self {
            event_id: event_id.into(),
            deploy_hash: deploy_hash.into(),
            status,
            tx_hash: None,
            gas_used: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Status API Models
// =============================================================================

/// Response for `GET /intents`.
#[derive(Debug, Serialize, ToSchema)]
pub struct IntentListResponse {
    /// Number of tracked intents.
    pub count: usize,
    /// All tracked intent status records.
    pub intents: Vec<IntentStatusRecord>,
}

/// Request body for the development-only `POST /trigger` endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TriggerRequest {
    /// Deploy hash to key the synthetic event under. Generated when absent.
    pub deploy_hash: Option<String>,
    pub caller: Option<String>,
    pub target_chain: Option<String>,
    pub target_address: Option<String>,
    pub data: Option<String>,
    pub value: Option<String>,
    pub nonce: Option<u64>,
}

/// Response for `POST /trigger`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    pub event_id: String,
    pub status: IntentStatus,
}
