// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Proof Builder
//!
//! Turns an intent plus its source-chain Ed25519 approval into a succinct
//! proof via the [`CryptoGateway`]. The canonical intent hash computed here
//! is the anchor the destination avatar recomputes before accepting a proof,
//! so the field set and ordering must never change independently.

pub mod engine;

pub use engine::{CryptoGateway, MockProver, SnarkjsProver};

use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::Intent;

/// Algorithm tag prefixing source-chain keys and signatures (01 = Ed25519).
const ED25519_TAG: u8 = 0x01;

/// Groth16 proof points in the shape the destination verifier consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    pub protocol: String,
    pub curve: String,
}

/// A proof paired with the exact public-signal list it was generated
/// against. Submitting the points with any other signal list must fail
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub proof: ProofPoints,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<String>,
}

/// An Ed25519 approval extracted from the originating deploy.
#[derive(Debug, Clone)]
pub struct ParsedApproval {
    pub public_key: VerifyingKey,
    pub signature: Signature,
}

impl ParsedApproval {
    /// First half of the signature (the R point), 32 bytes.
    pub fn r_bytes(&self) -> [u8; 32] {
        self.signature.r_bytes().to_owned()
    }

    /// Second half of the signature (the S scalar), 32 bytes.
    pub fn s_bytes(&self) -> [u8; 32] {
        self.signature.s_bytes().to_owned()
    }
}

/// Inputs handed to the proving backend.
///
/// Byte-level fields are decimal byte strings, the convention the circuit's
/// witness generator expects.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitInputs {
    /// Canonical intent hash (hex), public signal 0.
    pub message_hash: String,
    /// Claimed signer identity, public signal 1.
    pub caller: String,
    /// Compressed Ed25519 public key bytes.
    pub public_key: Vec<String>,
    /// Signature R component bytes.
    pub signature_r: Vec<String>,
    /// Signature S component bytes.
    pub signature_s: Vec<String>,
}

/// Proof construction and verification failures.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Malformed approval: {0}")]
    MalformedApproval(String),

    #[error("Unsupported signature scheme tag: {0:#04x}")]
    UnsupportedScheme(u8),

    #[error("Prover failed: {0}")]
    Prover(String),

    #[error("Verifier failed: {0}")]
    Verifier(String),
}

/// Parse a source-chain approval (tag-prefixed hex signature and signer key)
/// into validated Ed25519 components.
pub fn parse_approval(signature_hex: &str, signer_hex: &str) -> Result<ParsedApproval, ProofError> {
    let sig_bytes = decode_tagged(signature_hex, SIGNATURE_LENGTH, "signature")?;
    let key_bytes = decode_tagged(signer_hex, PUBLIC_KEY_LENGTH, "public key")?;

    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| ProofError::MalformedApproval(format!("signature: {e}")))?;

    let key_array: [u8; PUBLIC_KEY_LENGTH] = key_bytes
        .try_into()
        .map_err(|_| ProofError::MalformedApproval("public key length".to_string()))?;
    let public_key = VerifyingKey::from_bytes(&key_array)
        .map_err(|e| ProofError::MalformedApproval(format!("public key: {e}")))?;

    Ok(ParsedApproval {
        public_key,
        signature,
    })
}

/// Decode a tag-prefixed hex string, checking the Ed25519 tag and length.
fn decode_tagged(value: &str, expected_len: usize, what: &str) -> Result<Vec<u8>, ProofError> {
    let bytes = hex::decode(value)
        .map_err(|e| ProofError::MalformedApproval(format!("{what} hex: {e}")))?;

    let (tag, rest) = bytes
        .split_first()
        .ok_or_else(|| ProofError::MalformedApproval(format!("empty {what}")))?;

    if *tag != ED25519_TAG {
        return Err(ProofError::UnsupportedScheme(*tag));
    }
    if rest.len() != expected_len {
        return Err(ProofError::MalformedApproval(format!(
            "{what} is {} bytes, expected {expected_len}",
            rest.len()
        )));
    }

    Ok(rest.to_vec())
}

/// Canonical hash over the intent's signed fields.
///
/// SHA-256 of the canonical JSON of `{caller, target_chain, target_address,
/// data, value, nonce}` in exactly that order. `expiry` and `chain_id` are
/// bound at submission and are not part of the signed preimage. The avatar
/// recomputes this hash before accepting any proof.
pub fn intent_hash(intent: &Intent) -> String {
    #[derive(Serialize)]
    struct SignedFields<'a> {
        caller: &'a str,
        target_chain: &'a str,
        target_address: &'a str,
        data: &'a str,
        value: &'a str,
        nonce: u64,
    }

    let canonical = serde_json::to_string(&SignedFields {
        caller: &intent.caller,
        target_chain: &intent.target_chain,
        target_address: &intent.target_address,
        data: &intent.data,
        value: &intent.value,
        nonce: intent.nonce,
    })
    .expect("canonical intent serialization cannot fail");

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Builds proofs over intents and verifies them locally before the relay
/// ever submits one.
pub struct ProofBuilder {
    gateway: CryptoGateway,
    output_dir: std::path::PathBuf,
}

impl ProofBuilder {
    pub fn new(gateway: CryptoGateway, output_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            gateway,
            output_dir: output_dir.into(),
        }
    }

    /// Assemble circuit inputs from the intent and approval and delegate to
    /// the gateway's prover.
    pub async fn build(
        &self,
        intent: &Intent,
        approval: &ParsedApproval,
    ) -> Result<Proof, ProofError> {
        let message_hash = intent_hash(intent);

        let inputs = CircuitInputs {
            message_hash,
            caller: intent.caller.clone(),
            public_key: decimal_bytes(approval.public_key.as_bytes()),
            signature_r: decimal_bytes(&approval.r_bytes()),
            signature_s: decimal_bytes(&approval.s_bytes()),
        };

        self.gateway.prove(&inputs).await
    }

    /// Verify a proof against its own public-signal list.
    pub async fn verify(&self, proof: &Proof) -> Result<bool, ProofError> {
        self.gateway.verify(proof).await
    }

    /// Persist a proof artifact for debugging. Failures are logged and
    /// swallowed; persistence is never load-bearing.
    pub async fn save_proof(&self, proof: &Proof, event_id: &str) {
        let path = self.output_dir.join(format!("proof_{event_id}.json"));

        let result = async {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            let json = serde_json::to_vec_pretty(proof)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            tokio::fs::write(&path, json).await
        }
        .await;

        match result {
            Ok(()) => tracing::debug!(path = %path.display(), "Proof saved"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save proof"),
        }
    }
}

fn decimal_bytes(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| b.to_string()).collect()
}
