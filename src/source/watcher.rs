// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Source-Chain Watcher
//!
//! Background task that polls the source chain for new `IntentCreated`
//! events, deduplicates them, resolves the authorizing Ed25519 approval
//! from the originating deploy, and hands detected intents to the
//! orchestrator over a channel.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 5 s) the watcher:
//! 1. Reads the latest finalized block; if its height has not advanced past
//!    the checkpoint, the tick is a no-op.
//! 2. Lists the intent contract's named keys at the latest state root and
//!    filters for the event-name pattern, skipping identifiers already in
//!    the seen set (idempotent across overlapping scans).
//! 3. Parses each unseen payload against the strict [`IntentEvent`] schema.
//!    Malformed payloads are marked failed immediately. Parsed events whose
//!    deploy or approval cannot be resolved stay `pending_source` and are
//!    retried next tick, up to `max_signature_attempts`.
//!
//! The height checkpoint advances only after a tick's scan completes, so a
//! crash mid-tick is safe to retry.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, the
//! same pattern as the orchestrator.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{IntentEvent, IntentStatus};
use crate::status::StatusBoard;

use super::rpc::{SourceError, SourceRpc};

/// Named keys holding events start with this prefix.
const EVENT_KEY_PREFIX: &str = "event_";

/// Event name the relay reacts to.
const INTENT_EVENT_NAME: &str = "IntentCreated";

/// An intent event paired with its resolved source-chain approval.
#[derive(Debug, Clone)]
pub struct DetectedIntent {
    pub event: IntentEvent,
    /// Tagged hex signature over the originating deploy.
    pub signature: String,
    /// Tagged hex public key of the signer.
    pub signer: String,
}

/// Polls the source chain and emits [`DetectedIntent`]s.
pub struct SourceWatcher<R> {
    rpc: R,
    contract_hash: String,
    poll_interval: Duration,
    max_signature_attempts: u32,
    status: StatusBoard,
    events_tx: mpsc::Sender<DetectedIntent>,
    last_processed_height: u64,
    seen_events: HashSet<String>,
    signature_attempts: HashMap<String, u32>,
}

impl<R: SourceRpc> SourceWatcher<R> {
    pub fn new(
        rpc: R,
        contract_hash: String,
        poll_interval: Duration,
        max_signature_attempts: u32,
        status: StatusBoard,
        events_tx: mpsc::Sender<DetectedIntent>,
    ) -> Self {
        Self {
            rpc,
            contract_hash,
            poll_interval,
            max_signature_attempts,
            status,
            events_tx,
            last_processed_height: 0,
            seen_events: HashSet::new(),
            signature_attempts: HashMap::new(),
        }
    }

    /// Run the poll loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(watcher.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            contract = %self.contract_hash,
            "Source watcher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Source watcher shutting down");
                return;
            }

            if let Err(e) = self.poll_once().await {
                // Transient source-read error: nothing is marked failed,
                // the next tick retries the same range.
                warn!(error = %e, "Source poll failed, will retry");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Source watcher shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one poll tick. Advances the height checkpoint only after the
    /// full scan completes.
    pub async fn poll_once(&mut self) -> Result<(), SourceError> {
        let block = self.rpc.latest_block().await?;

        if block.height <= self.last_processed_height {
            return Ok(());
        }

        debug!(
            last_processed = self.last_processed_height,
            current = block.height,
            "Scanning for new intent events"
        );

        let named_keys = self
            .rpc
            .contract_named_keys(&block.state_root_hash, &self.contract_hash)
            .await?;

        for named_key in named_keys {
            if !named_key.name.starts_with(EVENT_KEY_PREFIX)
                || !named_key.name.contains(INTENT_EVENT_NAME)
            {
                continue;
            }
            if self.seen_events.contains(&named_key.name) {
                continue;
            }

            self.handle_event_key(&block.state_root_hash, &named_key.name, &named_key.key)
                .await;
        }

        self.last_processed_height = block.height;
        Ok(())
    }

    /// Process one unseen event key: parse, resolve the approval, emit.
    async fn handle_event_key(&mut self, state_root_hash: &str, name: &str, key: &str) {
        let payload = match self.rpc.read_key(state_root_hash, key).await {
            Ok(payload) => payload,
            Err(e) => {
                // Transient read failure; the key stays unseen and is
                // retried next tick.
                warn!(event_key = name, error = %e, "Failed to read event data");
                return;
            }
        };

        let event: IntentEvent = match serde_json::from_value(payload) {
            Ok(event) => event,
            Err(e) => {
                // Malformed payload: terminal, quarantined under the named
                // key since no deploy hash is recoverable.
                warn!(event_key = name, error = %e, "Malformed intent event payload");
                self.seen_events.insert(name.to_string());
                self.status
                    .mark_failed(name, "", format!("malformed event payload: {e}"))
                    .await;
                return;
            }
        };

        let event_id = event.event_id();
        if self.signature_attempts.get(name).is_none() {
            info!(event_id, caller = %event.caller, "New intent event detected");
            self.status
                .set_status(&event_id, &event.deploy_hash, IntentStatus::PendingSource)
                .await;
        }

        match self.resolve_approval(&event).await {
            Ok((signature, signer)) => {
                self.seen_events.insert(name.to_string());
                self.signature_attempts.remove(name);

                if self
                    .events_tx
                    .send(DetectedIntent {
                        event,
                        signature,
                        signer,
                    })
                    .await
                    .is_err()
                {
                    warn!(event_id, "Orchestrator channel closed, dropping event");
                }
            }
            Err(e) => {
                let attempts = self.signature_attempts.entry(name.to_string()).or_insert(0);
                *attempts += 1;
                let attempts = *attempts;

                if attempts >= self.max_signature_attempts {
                    warn!(
                        event_id,
                        attempts, error = %e,
                        "Signature unresolvable, giving up"
                    );
                    self.seen_events.insert(name.to_string());
                    self.signature_attempts.remove(name);
                    self.status
                        .mark_failed(
                            &event_id,
                            &event.deploy_hash,
                            format!("signature unresolvable after {attempts} attempts: {e}"),
                        )
                        .await;
                } else {
                    // Left pending_source; retried next tick.
                    warn!(event_id, attempts, error = %e, "Signature not yet resolvable");
                }
            }
        }
    }

    /// Look up the originating deploy and extract its first approval.
    async fn resolve_approval(&self, event: &IntentEvent) -> Result<(String, String), SourceError> {
        let deploy = self.rpc.get_deploy(&event.deploy_hash).await?;

        let approval = deploy
            .approvals
            .first()
            .ok_or_else(|| SourceError::InvalidResponse("deploy has no approvals".to_string()))?;

        Ok((approval.signature.clone(), approval.signer.clone()))
    }
}
