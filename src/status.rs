// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Status Board
//!
//! In-memory map of [`IntentStatusRecord`]s keyed by event id. Constructed
//! at relay startup and dropped at shutdown; writes go through the
//! orchestrator, external observers (the status API) hold cloned read
//! handles. Not durable across restarts by design.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{IntentStatus, IntentStatusRecord};

/// Shared handle to the relay's intent status map.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<HashMap<String, IntentStatusRecord>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the record for an event, resetting any result
    /// fields from a previous attempt.
    pub async fn set_status(&self, event_id: &str, deploy_hash: &str, status: IntentStatus) {
        let record = IntentStatusRecord::new(event_id, deploy_hash, status);
        tracing::info!(event_id, status = ?status, "Intent status updated");
        self.inner.write().await.insert(event_id.to_string(), record);
    }

    /// Transition an existing record, keeping accumulated fields.
    pub async fn transition(&self, event_id: &str, status: IntentStatus) {
        if let Some(record) = self.inner.write().await.get_mut(event_id) {
            record.status = status;
            record.updated_at = Utc::now();
            tracing::info!(event_id, status = ?status, "Intent status updated");
        }
    }

    /// Mark an event confirmed with its destination transaction details.
    pub async fn mark_confirmed(&self, event_id: &str, tx_hash: String, gas_used: u64) {
        if let Some(record) = self.inner.write().await.get_mut(event_id) {
            record.status = IntentStatus::Confirmed;
            record.tx_hash = Some(tx_hash);
            record.gas_used = Some(gas_used);
            record.error = None;
            record.updated_at = Utc::now();
            tracing::info!(event_id, status = ?IntentStatus::Confirmed, "Intent status updated");
        }
    }

    /// Mark an event failed, preserving the originating cause verbatim.
    pub async fn mark_failed(&self, event_id: &str, deploy_hash: &str, error: String) {
        let mut map = self.inner.write().await;
        let record = map
            .entry(event_id.to_string())
            .or_insert_with(|| IntentStatusRecord::new(event_id, deploy_hash, IntentStatus::Failed));
        record.status = IntentStatus::Failed;
        record.error = Some(error.clone());
        record.updated_at = Utc::now();
        tracing::warn!(event_id, error = %error, "Intent failed");
    }

    pub async fn get(&self, event_id: &str) -> Option<IntentStatusRecord> {
        self.inner.read().await.get(event_id).cloned()
    }

    pub async fn list(&self) -> Vec<IntentStatusRecord> {
        let mut records: Vec<_> = self.inner.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let board = StatusBoard::new();
        board.set_status("d1-0", "d1", IntentStatus::PendingSource).await;

        let record = board.get("d1-0").await.unwrap();
        assert_eq!(record.status, IntentStatus::PendingSource);
        assert_eq!(record.deploy_hash, "d1");
        assert!(board.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn transition_keeps_identity_fields() {
        let board = StatusBoard::new();
        board.set_status("d1-0", "d1", IntentStatus::PendingSource).await;
        board.transition("d1-0", IntentStatus::Proving).await;

        let record = board.get("d1-0").await.unwrap();
        assert_eq!(record.status, IntentStatus::Proving);
        assert_eq!(record.deploy_hash, "d1");
    }

    #[tokio::test]
    async fn mark_confirmed_records_transaction() {
        let board = StatusBoard::new();
        board.set_status("d1-0", "d1", IntentStatus::Submitting).await;
        board.mark_confirmed("d1-0", "0xabc".to_string(), 150_000).await;

        let record = board.get("d1-0").await.unwrap();
        assert_eq!(record.status, IntentStatus::Confirmed);
        assert_eq!(record.tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(record.gas_used, Some(150_000));
    }

    #[tokio::test]
    async fn mark_failed_inserts_when_missing() {
        let board = StatusBoard::new();
        board.mark_failed("d2-1", "d2", "boom".to_string()).await;

        let record = board.get("d2-1").await.unwrap();
        assert_eq!(record.status, IntentStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn list_returns_every_record() {
        let board = StatusBoard::new();
        board.set_status("d1-0", "d1", IntentStatus::PendingSource).await;
        board.set_status("d2-0", "d2", IntentStatus::Confirmed).await;
        assert_eq!(board.list().await.len(), 2);
    }
}
