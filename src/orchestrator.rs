// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Orchestrator
//!
//! Drives each detected intent through the pipeline:
//! `pending_source → proving → submitting → confirmed | failed`.
//!
//! One task per event id; the in-flight set is the single concurrency
//! guard, so distinct events prove and submit concurrently while duplicates
//! of the same id are silently suppressed. Every stage failure is caught
//! and converted into a `failed` status transition carrying the originating
//! message; nothing propagates past this boundary. The cleanup that
//! releases the in-flight slot always runs, so a later manual trigger can
//! retry the same event id.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::destination::IntentSubmitter;
use crate::models::{Intent, IntentStatus};
use crate::source::DetectedIntent;
use crate::status::StatusBoard;
use crate::zk::{parse_approval, ProofBuilder};

/// Sequences the watcher, proof builder, and submitter per detected intent
/// and owns the status map.
pub struct RelayOrchestrator<S> {
    proof_builder: ProofBuilder,
    submitter: S,
    status: StatusBoard,
    in_flight: Mutex<HashSet<String>>,
    chain_id: u64,
    intent_ttl_secs: u64,
}

impl<S: IntentSubmitter + 'static> RelayOrchestrator<S> {
    pub fn new(
        proof_builder: ProofBuilder,
        submitter: S,
        status: StatusBoard,
        chain_id: u64,
        intent_ttl_secs: u64,
    ) -> Self {
        Self {
            proof_builder,
            submitter,
            status,
            in_flight: Mutex::new(HashSet::new()),
            chain_id,
            intent_ttl_secs,
        }
    }

    /// Read handle to the status map for external observers.
    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    /// Consume detected intents until the channel closes or shutdown fires.
    /// Each event is handled on its own task.
    pub async fn run(
        self: Arc<Self>,
        mut events_rx: mpsc::Receiver<DetectedIntent>,
        shutdown: CancellationToken,
    ) {
        info!("Relay orchestrator starting");

        loop {
            tokio::select! {
                maybe_event = events_rx.recv() => match maybe_event {
                    Some(detected) => {
                        tokio::spawn(Arc::clone(&self).handle_intent(detected));
                    }
                    None => {
                        info!("Event channel closed, orchestrator stopping");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("Relay orchestrator shutting down");
                    return;
                }
            }
        }
    }

    /// Handle one detected intent end to end.
    async fn handle_intent(self: Arc<Self>, detected: DetectedIntent) {
        let event_id = detected.event.event_id();
        let deploy_hash = detected.event.deploy_hash.clone();

        // The single concurrency guard: a duplicate of an in-flight event
        // id is an intentional no-op, not an error.
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(event_id.clone()) {
                debug!(event_id, "Event already being processed");
                return;
            }
        }

        match self.process(&event_id, detected).await {
            Ok(()) => {}
            Err(message) => {
                self.status.mark_failed(&event_id, &deploy_hash, message).await;
            }
        }

        // Cleanup always runs so the id can be retried later.
        self.in_flight.lock().await.remove(&event_id);
    }

    /// The pipeline proper. Any `Err` is mapped to a `failed` status by the
    /// caller with the message preserved verbatim.
    async fn process(&self, event_id: &str, detected: DetectedIntent) -> Result<(), String> {
        let event = &detected.event;
        info!(
            event_id,
            caller = %event.caller,
            target = %event.target_address,
            nonce = event.nonce,
            "Processing new intent"
        );

        self.status
            .set_status(event_id, &event.deploy_hash, IntentStatus::PendingSource)
            .await;

        // Stage 1: parse the authorizing approval.
        let approval = parse_approval(&detected.signature, &detected.signer)
            .map_err(|e| e.to_string())?;

        // Stage 2: bind and prove.
        self.status.transition(event_id, IntentStatus::Proving).await;

        let expiry = Utc::now().timestamp() as u64 + self.intent_ttl_secs;
        let intent = Intent::from_event(event, expiry, self.chain_id);

        let proof = self
            .proof_builder
            .build(&intent, &approval)
            .await
            .map_err(|e| e.to_string())?;
        self.proof_builder.save_proof(&proof, event_id).await;

        // A proof is never submitted unverified.
        let valid = self
            .proof_builder
            .verify(&proof)
            .await
            .map_err(|e| e.to_string())?;
        if !valid {
            return Err("generated proof failed local verification".to_string());
        }

        info!(event_id, signals = ?proof.public_signals, "Proof generated and verified");

        // Stage 3: submit and await finality.
        self.status
            .transition(event_id, IntentStatus::Submitting)
            .await;

        match self.submitter.submit(&intent, &proof).await {
            Ok(receipt) => {
                info!(
                    event_id,
                    tx_hash = %receipt.tx_hash,
                    gas_used = receipt.gas_used,
                    "Intent executed"
                );
                self.status
                    .mark_confirmed(event_id, receipt.tx_hash, receipt.gas_used)
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(event_id, error = %e, "Submission failed");
                Err(e.to_string())
            }
        }
    }
}
