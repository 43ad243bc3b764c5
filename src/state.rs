// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::source::DetectedIntent;
use crate::status::StatusBoard;

/// Immutable relay facts captured at startup for the status endpoint.
#[derive(Debug, Clone)]
pub struct RelaySnapshot {
    pub source_node_url: String,
    pub source_contract_hash: String,
    pub destination_chain_id: u64,
    pub avatar_contract: String,
    pub relayer_address: String,
    /// Active proving backend, `snarkjs` or `mock`.
    pub prover: String,
    pub poll_interval_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl RelaySnapshot {
    pub fn new(config: &RelayConfig, relayer_address: String, prover: String) -> Self {
        Self {
            source_node_url: config.source.node_url.clone(),
            source_contract_hash: config.source.contract_hash.clone(),
            destination_chain_id: config.destination.chain_id,
            avatar_contract: config.destination.avatar_contract.clone(),
            relayer_address,
            prover,
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            started_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub status: StatusBoard,
    /// Feeds the orchestrator; the trigger endpoint injects synthetic
    /// events through the same channel the watcher uses.
    pub events_tx: mpsc::Sender<DetectedIntent>,
    pub snapshot: RelaySnapshot,
}

impl AppState {
    pub fn new(
        status: StatusBoard,
        events_tx: mpsc::Sender<DetectedIntent>,
        snapshot: RelaySnapshot,
    ) -> Self {
        Self {
            status,
            events_tx,
            snapshot,
        }
    }
}
