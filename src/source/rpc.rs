// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Source-chain JSON-RPC client.
//!
//! The relay needs four read-only capabilities from the source node:
//! latest finalized block, named-key listing under a contract, raw key
//! reads, and deploy lookup by hash. [`SourceRpc`] captures that surface so
//! the watcher can run against a mock in tests; [`CasperRpc`] is the
//! production implementation.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Latest finalized block summary.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub height: u64,
    pub state_root_hash: String,
}

/// A named key under the intent contract.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedKey {
    pub name: String,
    pub key: String,
}

/// An approval attached to a deploy: the signer's tagged public key and the
/// tagged signature over the deploy.
#[derive(Debug, Clone, Deserialize)]
pub struct Approval {
    pub signer: String,
    pub signature: String,
}

/// Deploy metadata relevant to the relay.
#[derive(Debug, Clone)]
pub struct DeployInfo {
    pub approvals: Vec<Approval>,
}

/// Source-chain read failures.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source node request failed: {0}")]
    Request(String),

    #[error("Source node returned an error: {0}")]
    Rpc(String),

    #[error("Source node response was invalid: {0}")]
    InvalidResponse(String),
}

/// Read-only RPC capability the watcher polls.
pub trait SourceRpc: Send + Sync {
    fn latest_block(&self) -> impl std::future::Future<Output = Result<BlockInfo, SourceError>> + Send;

    fn contract_named_keys(
        &self,
        state_root_hash: &str,
        contract_hash: &str,
    ) -> impl std::future::Future<Output = Result<Vec<NamedKey>, SourceError>> + Send;

    /// Read a raw key from global state; for event keys the stored value is
    /// a JSON document.
    fn read_key(
        &self,
        state_root_hash: &str,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Value, SourceError>> + Send;

    fn get_deploy(
        &self,
        deploy_hash: &str,
    ) -> impl std::future::Future<Output = Result<DeployInfo, SourceError>> + Send;
}

/// JSON-RPC client for a Casper-style source node.
#[derive(Debug, Clone)]
pub struct CasperRpc {
    client: Client,
    node_url: String,
}

impl CasperRpc {
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            node_url: node_url.into(),
        }
    }

    /// Issue a JSON-RPC call and unwrap the `result` member.
    async fn call(&self, method: &str, params: Value) -> Result<Value, SourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.node_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if let Some(error) = payload.get("error") {
            return Err(SourceError::Rpc(error.to_string()));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| SourceError::InvalidResponse("missing result".to_string()))
    }
}

impl SourceRpc for CasperRpc {
    async fn latest_block(&self) -> Result<BlockInfo, SourceError> {
        let result = self.call("chain_get_block", json!({})).await?;
        let header = result
            .pointer("/block/header")
            .ok_or_else(|| SourceError::InvalidResponse("missing block header".to_string()))?;

        let height = header
            .get("height")
            .and_then(Value::as_u64)
            .ok_or_else(|| SourceError::InvalidResponse("missing block height".to_string()))?;
        let state_root_hash = header
            .get("state_root_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::InvalidResponse("missing state root hash".to_string()))?
            .to_string();

        Ok(BlockInfo {
            height,
            state_root_hash,
        })
    }

    async fn contract_named_keys(
        &self,
        state_root_hash: &str,
        contract_hash: &str,
    ) -> Result<Vec<NamedKey>, SourceError> {
        // The contract hash is configured with a `hash-` prefix; global
        // state queries want it that way too, so pass it through untouched.
        let result = self
            .call(
                "query_global_state",
                json!({
                    "state_identifier": { "StateRootHash": state_root_hash },
                    "key": contract_hash,
                    "path": [],
                }),
            )
            .await?;

        let named_keys = result
            .pointer("/stored_value/Contract/named_keys")
            .ok_or_else(|| SourceError::InvalidResponse("missing named keys".to_string()))?;

        serde_json::from_value(named_keys.clone())
            .map_err(|e| SourceError::InvalidResponse(format!("named keys: {e}")))
    }

    async fn read_key(&self, state_root_hash: &str, key: &str) -> Result<Value, SourceError> {
        let result = self
            .call(
                "query_global_state",
                json!({
                    "state_identifier": { "StateRootHash": state_root_hash },
                    "key": key,
                    "path": [],
                }),
            )
            .await?;

        let parsed = result
            .pointer("/stored_value/CLValue/parsed")
            .ok_or_else(|| SourceError::InvalidResponse("missing CLValue".to_string()))?;

        // Event payloads are stored as JSON strings inside the CLValue.
        match parsed {
            Value::String(raw) => serde_json::from_str(raw)
                .map_err(|e| SourceError::InvalidResponse(format!("event payload: {e}"))),
            other => Ok(other.clone()),
        }
    }

    async fn get_deploy(&self, deploy_hash: &str) -> Result<DeployInfo, SourceError> {
        let result = self
            .call("info_get_deploy", json!({ "deploy_hash": deploy_hash }))
            .await?;

        let approvals = result
            .pointer("/deploy/approvals")
            .ok_or_else(|| SourceError::InvalidResponse("missing approvals".to_string()))?;

        let approvals: Vec<Approval> = serde_json::from_value(approvals.clone())
            .map_err(|e| SourceError::InvalidResponse(format!("approvals: {e}")))?;

        Ok(DeployInfo { approvals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_deserializes_from_deploy_json() {
        let json = r#"{"signer": "01aa", "signature": "01bb"}"#;
        let approval: Approval = serde_json::from_str(json).unwrap();
        assert_eq!(approval.signer, "01aa");
        assert_eq!(approval.signature, "01bb");
    }

    #[test]
    fn named_key_list_deserializes() {
        let json = r#"[
            {"name": "event_0_IntentCreated", "key": "uref-aa"},
            {"name": "counter", "key": "uref-bb"}
        ]"#;
        let keys: Vec<NamedKey> = serde_json::from_str(json).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name, "event_0_IntentCreated");
    }
}
