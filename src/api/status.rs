// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::{IntentListResponse, IntentStatusRecord};
use crate::state::AppState;

/// Relay configuration snapshot for `GET /status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RelayStatusResponse {
    pub service: String,
    pub source_node_url: String,
    pub source_contract_hash: String,
    pub destination_chain_id: u64,
    pub avatar_contract: String,
    pub relayer_address: String,
    /// Active proving backend, `snarkjs` or `mock`.
    pub prover: String,
    pub poll_interval_ms: u64,
    pub uptime_secs: i64,
    pub intents_tracked: usize,
}

/// Relay configuration and runtime snapshot.
#[utoipa::path(
    get,
    path = "/status",
    tag = "Status",
    responses(
        (status = 200, description = "Relay status", body = RelayStatusResponse)
    )
)]
pub async fn relay_status(State(state): State<AppState>) -> Json<RelayStatusResponse> {
    let snapshot = &state.snapshot;
    Json(RelayStatusResponse {
        service: "intent-relay".to_string(),
        source_node_url: snapshot.source_node_url.clone(),
        source_contract_hash: snapshot.source_contract_hash.clone(),
        destination_chain_id: snapshot.destination_chain_id,
        avatar_contract: snapshot.avatar_contract.clone(),
        relayer_address: snapshot.relayer_address.clone(),
        prover: snapshot.prover.clone(),
        poll_interval_ms: snapshot.poll_interval_ms,
        uptime_secs: (Utc::now() - snapshot.started_at).num_seconds(),
        intents_tracked: state.status.list().await.len(),
    })
}

/// Status of a single intent by its event id (`{deploy_hash}-{nonce}`).
#[utoipa::path(
    get,
    path = "/status/{event_id}",
    tag = "Status",
    params(
        ("event_id" = String, Path, description = "Event id, `{deploy_hash}-{nonce}`")
    ),
    responses(
        (status = 200, description = "Intent status", body = IntentStatusRecord),
        (status = 404, description = "Intent not yet detected", body = crate::error::ErrorResponse)
    )
)]
pub async fn intent_status(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<IntentStatusRecord>, ApiError> {
    state
        .status
        .get(&event_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Intent {event_id} not yet detected")))
}

/// All tracked intents, most recently updated first.
#[utoipa::path(
    get,
    path = "/intents",
    tag = "Status",
    responses(
        (status = 200, description = "Tracked intents", body = IntentListResponse)
    )
)]
pub async fn list_intents(State(state): State<AppState>) -> Json<IntentListResponse> {
    let intents = state.status.list().await;
    Json(IntentListResponse {
        count: intents.len(),
        intents,
    })
}

/// Inject a synthetic intent event into the pipeline. Development builds
/// only; the event carries a throwaway signature that the mock prover
/// accepts.
#[cfg(feature = "dev")]
#[utoipa::path(
    post,
    path = "/trigger",
    tag = "Status",
    request_body = crate::models::TriggerRequest,
    responses(
        (status = 200, description = "Event injected", body = crate::models::TriggerResponse),
        (status = 503, description = "Relay is shutting down", body = crate::error::ErrorResponse)
    )
)]
pub async fn trigger_intent(
    State(state): State<AppState>,
    Json(request): Json<crate::models::TriggerRequest>,
) -> Result<Json<crate::models::TriggerResponse>, ApiError> {
    use crate::models::{IntentEvent, IntentStatus, TriggerResponse};
    use crate::source::DetectedIntent;
    use ed25519_dalek::{Signer, SigningKey};

    let deploy_hash = request
        .deploy_hash
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    // Throwaway key; the signature is structurally valid, which is all the
    // mock prover requires.
    let key = SigningKey::from_bytes(&[7u8; 32]);
    let signature = key.sign(deploy_hash.as_bytes());
    let signer = format!("01{}", hex::encode(key.verifying_key().as_bytes()));

    let event = IntentEvent {
        caller: request.caller.unwrap_or_else(|| signer.clone()),
        target_chain: request.target_chain.unwrap_or_else(|| "sepolia".to_string()),
        target_address: request
            .target_address
            .unwrap_or_else(|| "0x0000000000000000000000000000000000000001".to_string()),
        data: request.data.unwrap_or_else(|| "0x".to_string()),
        value: request.value.unwrap_or_else(|| "0".to_string()),
        nonce: request.nonce.unwrap_or(0),
        timestamp: Utc::now().to_rfc3339(),
        deploy_hash,
        block_hash: "manual-trigger".to_string(),
    };
    let event_id = event.event_id();

    let detected = DetectedIntent {
        event,
        signature: format!("01{}", hex::encode(signature.to_bytes())),
        signer,
    };

    state.events_tx.send(detected).await.map_err(|_| {
        ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Relay is shutting down",
        )
    })?;

    tracing::info!(event_id, "Manual trigger accepted");

    Ok(Json(TriggerResponse {
        success: true,
        message: "Event injected into the relay pipeline".to_string(),
        event_id,
        status: IntentStatus::PendingSource,
    }))
}
