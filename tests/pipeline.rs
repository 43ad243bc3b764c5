// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end relay pipeline over an in-process source node and avatar:
//! a signed intent event appears on the fake source chain, the watcher
//! detects it, the orchestrator proves it with the mock gateway, and the
//! avatar engine enforces its authorization rules at submission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use intent_relay::avatar::{controller_key_hash, AvatarEngine};
use intent_relay::destination::{IntentSubmitter, SubmissionReceipt, SubmitError};
use intent_relay::models::{Intent, IntentStatus};
use intent_relay::orchestrator::RelayOrchestrator;
use intent_relay::source::{
    rpc::{Approval, BlockInfo, DeployInfo, NamedKey},
    DetectedIntent, SourceError, SourceRpc, SourceWatcher,
};
use intent_relay::status::StatusBoard;
use intent_relay::zk::{CryptoGateway, MockProver, Proof, ProofBuilder};

const CHAIN_ID: u64 = 11155111;
const CONTRACT: &str = "hash-intent-contract";

/// In-process source node: one block height, a named-key table, event
/// payloads, and deploys with approvals.
#[derive(Clone, Default)]
struct FakeSource {
    inner: Arc<FakeSourceInner>,
}

#[derive(Default)]
struct FakeSourceInner {
    height: AtomicU64,
    named_keys: Mutex<Vec<NamedKey>>,
    values: Mutex<HashMap<String, Value>>,
    deploys: Mutex<HashMap<String, DeployInfo>>,
}

impl FakeSource {
    fn advance_block(&self) {
        self.inner.height.fetch_add(1, Ordering::SeqCst);
    }

    fn put_event(&self, name: &str, key: &str, payload: Value) {
        self.inner.named_keys.lock().unwrap().push(NamedKey {
            name: name.to_string(),
            key: key.to_string(),
        });
        self.inner
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), payload);
    }

    fn put_deploy(&self, deploy_hash: &str, signer: String, signature: String) {
        self.inner.deploys.lock().unwrap().insert(
            deploy_hash.to_string(),
            DeployInfo {
                approvals: vec![Approval { signer, signature }],
            },
        );
    }
}

impl SourceRpc for FakeSource {
    async fn latest_block(&self) -> Result<BlockInfo, SourceError> {
        Ok(BlockInfo {
            height: self.inner.height.load(Ordering::SeqCst),
            state_root_hash: "root".to_string(),
        })
    }

    async fn contract_named_keys(
        &self,
        _state_root_hash: &str,
        _contract_hash: &str,
    ) -> Result<Vec<NamedKey>, SourceError> {
        Ok(self.inner.named_keys.lock().unwrap().clone())
    }

    async fn read_key(&self, _state_root_hash: &str, key: &str) -> Result<Value, SourceError> {
        self.inner
            .values
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::InvalidResponse(format!("unknown key {key}")))
    }

    async fn get_deploy(&self, deploy_hash: &str) -> Result<DeployInfo, SourceError> {
        self.inner
            .deploys
            .lock()
            .unwrap()
            .get(deploy_hash)
            .cloned()
            .ok_or_else(|| SourceError::Rpc(format!("deploy not found: {deploy_hash}")))
    }
}

/// Submitter backed by the in-process avatar engine instead of a live
/// chain. `now` is injectable so expiry behavior is deterministic.
struct AvatarSubmitter {
    engine: Arc<Mutex<AvatarEngine<MockProver>>>,
    now: Option<u64>,
}

impl IntentSubmitter for AvatarSubmitter {
    async fn submit(
        &self,
        intent: &Intent,
        proof: &Proof,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let now = self.now.unwrap_or_else(|| Utc::now().timestamp() as u64);
        let mut engine = self.engine.lock().unwrap();
        engine
            .execute_intent(intent, &proof.proof, &proof.public_signals, now, |_, _, _| Ok(()))
            .map(|receipt| SubmissionReceipt {
                tx_hash: format!("0x{}", receipt.intent_hash),
                gas_used: 150_000,
            })
            .map_err(|e| SubmitError::Reverted(format!("execution reverted: {e}")))
    }
}

struct Harness {
    source: FakeSource,
    engine: Arc<Mutex<AvatarEngine<MockProver>>>,
    status: StatusBoard,
    events_tx: mpsc::Sender<DetectedIntent>,
    shutdown: CancellationToken,
    signing_key: SigningKey,
}

impl Harness {
    /// Wire watcher and orchestrator together over the real event channel,
    /// bound to one controller key.
    fn start(now_override: Option<u64>) -> Self {
        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let controller = format!("01{}", hex::encode(signing_key.verifying_key().as_bytes()));

        let engine = Arc::new(Mutex::new(AvatarEngine::new(
            MockProver,
            "owner",
            controller_key_hash(&controller),
            CHAIN_ID,
        )));

        let source = FakeSource::default();
        let status = StatusBoard::new();
        let (events_tx, events_rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let watcher = SourceWatcher::new(
            source.clone(),
            CONTRACT.to_string(),
            Duration::from_millis(20),
            3,
            status.clone(),
            events_tx.clone(),
        );
        tokio::spawn(watcher.run(shutdown.clone()));

        let orchestrator = Arc::new(RelayOrchestrator::new(
            ProofBuilder::new(CryptoGateway::mock(), std::env::temp_dir()),
            AvatarSubmitter {
                engine: Arc::clone(&engine),
                now: now_override,
            },
            status.clone(),
            CHAIN_ID,
            3600,
        ));
        tokio::spawn(orchestrator.run(events_rx, shutdown.clone()));

        Self {
            source,
            engine,
            status,
            events_tx,
            shutdown,
            signing_key,
        }
    }

    fn controller(&self) -> String {
        format!(
            "01{}",
            hex::encode(self.signing_key.verifying_key().as_bytes())
        )
    }

    /// Publish a signed intent event on the fake source chain.
    fn publish_intent(&self, deploy_hash: &str, nonce: u64, value: &str) {
        let payload = json!({
            "caller": self.controller(),
            "target_chain": "sepolia",
            "target_address": "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12",
            "data": "0x",
            "value": value,
            "nonce": nonce,
            "timestamp": Utc::now().to_rfc3339(),
            "deploy_hash": deploy_hash,
            "block_hash": "block-1",
        });

        let signature = self.signing_key.sign(deploy_hash.as_bytes());
        self.source.put_deploy(
            deploy_hash,
            self.controller(),
            format!("01{}", hex::encode(signature.to_bytes())),
        );
        self.source.put_event(
            &format!("event_{deploy_hash}_IntentCreated"),
            &format!("uref-{deploy_hash}"),
            payload,
        );
        self.source.advance_block();
    }

    /// Poll the status board until the event reaches a terminal state.
    async fn wait_for_terminal(&self, event_id: &str) -> IntentStatus {
        for _ in 0..200 {
            if let Some(record) = self.status.get(event_id).await {
                if matches!(record.status, IntentStatus::Confirmed | IntentStatus::Failed) {
                    return record.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("intent {event_id} never reached a terminal state");
    }

    /// Poll the status board until the event reaches the expected state.
    async fn wait_for_status(&self, event_id: &str, expected: IntentStatus) {
        for _ in 0..200 {
            if let Some(record) = self.status.get(event_id).await {
                if record.status == expected {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("intent {event_id} never reached {expected:?}");
    }

    /// Keep the source chain producing blocks so the watcher rescans.
    fn produce_blocks(&self) {
        let source = self.source.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            while !shutdown.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(25)).await;
                source.advance_block();
            }
        });
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[tokio::test]
async fn intent_flows_from_source_to_avatar() {
    let harness = Harness::start(None);
    harness.engine.lock().unwrap().receive("funder", 10);

    harness.publish_intent("deploy1", 0, "4");
    let status = harness.wait_for_terminal("deploy1-0").await;
    assert_eq!(status, IntentStatus::Confirmed);

    let record = harness.status.get("deploy1-0").await.unwrap();
    assert!(record.tx_hash.unwrap().starts_with("0x"));
    assert_eq!(record.gas_used, Some(150_000));

    {
        let engine = harness.engine.lock().unwrap();
        assert_eq!(engine.nonce(), 1);
        assert_eq!(engine.balance(), 6);
    }

    // The watcher keeps rescanning the same named key; further blocks must
    // not re-execute the intent.
    harness.produce_blocks();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.engine.lock().unwrap().nonce(), 1);
}

#[tokio::test]
async fn replayed_intent_is_rejected_by_the_avatar() {
    let harness = Harness::start(None);

    harness.publish_intent("deploy1", 0, "0");
    assert_eq!(
        harness.wait_for_terminal("deploy1-0").await,
        IntentStatus::Confirmed
    );

    // Re-inject the same detected event directly, as a stale or duplicate
    // relay instance would. The avatar's nonce has moved on.
    let signature = harness.signing_key.sign(b"deploy1");
    let replay = DetectedIntent {
        event: intent_relay::models::IntentEvent {
            caller: harness.controller(),
            target_chain: "sepolia".to_string(),
            target_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
            data: "0x".to_string(),
            value: "0".to_string(),
            nonce: 0,
            timestamp: Utc::now().to_rfc3339(),
            deploy_hash: "deploy1".to_string(),
            block_hash: "block-1".to_string(),
        },
        signature: format!("01{}", hex::encode(signature.to_bytes())),
        signer: harness.controller(),
    };
    harness.events_tx.send(replay).await.unwrap();

    harness.wait_for_status("deploy1-0", IntentStatus::Failed).await;
    let record = harness.status.get("deploy1-0").await.unwrap();
    assert!(record.error.unwrap().contains("InvalidNonce"));
    assert_eq!(harness.engine.lock().unwrap().nonce(), 1);
}

#[tokio::test]
async fn sequential_intents_execute_in_nonce_order() {
    let harness = Harness::start(None);

    harness.publish_intent("deploy1", 0, "0");
    assert_eq!(
        harness.wait_for_terminal("deploy1-0").await,
        IntentStatus::Confirmed
    );

    harness.publish_intent("deploy2", 1, "0");
    assert_eq!(
        harness.wait_for_terminal("deploy2-1").await,
        IntentStatus::Confirmed
    );

    assert_eq!(harness.engine.lock().unwrap().nonce(), 2);
}

#[tokio::test]
async fn expired_intent_is_rejected_by_the_avatar() {
    // Destination clock far past any expiry the relay will bind.
    let far_future = Utc::now().timestamp() as u64 + 1_000_000;
    let harness = Harness::start(Some(far_future));

    harness.publish_intent("deploy1", 0, "0");
    assert_eq!(
        harness.wait_for_terminal("deploy1-0").await,
        IntentStatus::Failed
    );

    let record = harness.status.get("deploy1-0").await.unwrap();
    assert!(record.error.unwrap().contains("IntentExpired"));
    assert_eq!(harness.engine.lock().unwrap().nonce(), 0);
}

#[tokio::test]
async fn missing_deploy_eventually_fails_the_event() {
    let harness = Harness::start(None);

    // Event present but its deploy never resolves.
    let payload = json!({
        "caller": harness.controller(),
        "target_chain": "sepolia",
        "target_address": "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12",
        "data": "0x",
        "value": "0",
        "nonce": 0,
        "timestamp": Utc::now().to_rfc3339(),
        "deploy_hash": "ghost",
        "block_hash": "block-1",
    });
    harness
        .source
        .put_event("event_ghost_IntentCreated", "uref-ghost", payload);
    // Retries happen on subsequent scans, which need fresh blocks.
    harness.produce_blocks();

    assert_eq!(
        harness.wait_for_terminal("ghost-0").await,
        IntentStatus::Failed
    );
    let record = harness.status.get("ghost-0").await.unwrap();
    assert!(record.error.unwrap().contains("signature unresolvable"));
    assert_eq!(harness.engine.lock().unwrap().nonce(), 0);
}
