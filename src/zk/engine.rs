// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Crypto Gateway
//!
//! Single interface over the opaque proving/verifying capability, with two
//! implementations selected once at construction time:
//!
//! - [`SnarkjsProver`]: drives the external groth16 prover over the circuit
//!   artifact files (witness wasm, proving key, verification key).
//! - [`MockProver`]: a clearly-flagged non-cryptographic stand-in for local
//!   development when circuit artifacts are absent. Its proofs carry a
//!   binding commitment over the public signals so that a mismatched signal
//!   list still fails verification, and the rest of the pipeline treats its
//!   output identically to a real proof.
//!
//! Business logic never probes the filesystem; [`CryptoGateway::from_config`]
//! does it exactly once at startup.

use std::path::PathBuf;
use std::process::Stdio;

use sha2::{Digest, Sha256};
use tokio::process::Command;
use uuid::Uuid;

use crate::config::ZkConfig;

use super::{CircuitInputs, Proof, ProofError, ProofPoints};

/// Proving/verifying capability, fixed at construction.
pub enum CryptoGateway {
    Snarkjs(SnarkjsProver),
    Mock(MockProver),
}

impl CryptoGateway {
    /// Select the implementation from the configured artifact paths.
    ///
    /// All three artifacts present selects the real prover; anything missing
    /// falls back to the mock with a prominent warning. This is the only
    /// file-existence check in the crate.
    pub fn from_config(zk: &ZkConfig) -> Self {
        let artifacts_present = zk.wasm_path.exists()
            && zk.zkey_path.exists()
            && zk.verification_key_path.exists();

        if artifacts_present {
            tracing::info!(
                wasm = %zk.wasm_path.display(),
                zkey = %zk.zkey_path.display(),
                "Crypto gateway using groth16 prover"
            );
            Self::Snarkjs(SnarkjsProver {
                wasm_path: zk.wasm_path.clone(),
                zkey_path: zk.zkey_path.clone(),
                verification_key_path: zk.verification_key_path.clone(),
            })
        } else {
            tracing::warn!(
                "ZK circuit artifacts not found; using MOCK proofs. \
                 Not valid against a real on-chain verifier."
            );
            Self::Mock(MockProver)
        }
    }

    /// Mock gateway for tests and local development.
    pub fn mock() -> Self {
        Self::Mock(MockProver)
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }

    /// Generate a proof over the assembled circuit inputs.
    pub async fn prove(&self, inputs: &CircuitInputs) -> Result<Proof, ProofError> {
        match self {
            Self::Snarkjs(prover) => prover.prove(inputs).await,
            Self::Mock(prover) => Ok(prover.prove(inputs)),
        }
    }

    /// Verify a proof against its public-signal list.
    pub async fn verify(&self, proof: &Proof) -> Result<bool, ProofError> {
        match self {
            Self::Snarkjs(prover) => prover.verify(proof).await,
            Self::Mock(prover) => Ok(prover.verify(proof)),
        }
    }
}

// =============================================================================
// Real prover (external groth16 toolchain)
// =============================================================================

/// Shells out to the `snarkjs` groth16 CLI over the circuit artifacts.
/// The circuit's internals are opaque to the relay.
pub struct SnarkjsProver {
    wasm_path: PathBuf,
    zkey_path: PathBuf,
    verification_key_path: PathBuf,
}

impl SnarkjsProver {
    async fn prove(&self, inputs: &CircuitInputs) -> Result<Proof, ProofError> {
        let work_dir = std::env::temp_dir().join(format!("intent-relay-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| ProofError::Prover(format!("workdir: {e}")))?;

        let input_path = work_dir.join("input.json");
        let proof_path = work_dir.join("proof.json");
        let public_path = work_dir.join("public.json");

        let input_json = serde_json::to_vec(inputs)
            .map_err(|e| ProofError::Prover(format!("inputs: {e}")))?;
        tokio::fs::write(&input_path, input_json)
            .await
            .map_err(|e| ProofError::Prover(format!("write inputs: {e}")))?;

        let output = Command::new("snarkjs")
            .arg("groth16")
            .arg("fullprove")
            .arg(&input_path)
            .arg(&self.wasm_path)
            .arg(&self.zkey_path)
            .arg(&proof_path)
            .arg(&public_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProofError::Prover(format!("spawn snarkjs: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = tokio::fs::remove_dir_all(&work_dir).await;
            return Err(ProofError::Prover(format!(
                "snarkjs exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let proof_json = tokio::fs::read(&proof_path)
            .await
            .map_err(|e| ProofError::Prover(format!("read proof: {e}")))?;
        let public_json = tokio::fs::read(&public_path)
            .await
            .map_err(|e| ProofError::Prover(format!("read public signals: {e}")))?;
        let _ = tokio::fs::remove_dir_all(&work_dir).await;

        let proof: ProofPoints = serde_json::from_slice(&proof_json)
            .map_err(|e| ProofError::Prover(format!("parse proof: {e}")))?;
        let public_signals: Vec<String> = serde_json::from_slice(&public_json)
            .map_err(|e| ProofError::Prover(format!("parse public signals: {e}")))?;

        Ok(Proof {
            proof,
            public_signals,
        })
    }

    async fn verify(&self, proof: &Proof) -> Result<bool, ProofError> {
        let work_dir = std::env::temp_dir().join(format!("intent-relay-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| ProofError::Verifier(format!("workdir: {e}")))?;

        let proof_path = work_dir.join("proof.json");
        let public_path = work_dir.join("public.json");

        let proof_json = serde_json::to_vec(&proof.proof)
            .map_err(|e| ProofError::Verifier(format!("proof: {e}")))?;
        let public_json = serde_json::to_vec(&proof.public_signals)
            .map_err(|e| ProofError::Verifier(format!("public signals: {e}")))?;
        tokio::fs::write(&proof_path, proof_json)
            .await
            .map_err(|e| ProofError::Verifier(format!("write proof: {e}")))?;
        tokio::fs::write(&public_path, public_json)
            .await
            .map_err(|e| ProofError::Verifier(format!("write public signals: {e}")))?;

        let output = Command::new("snarkjs")
            .arg("groth16")
            .arg("verify")
            .arg(&self.verification_key_path)
            .arg(&public_path)
            .arg(&proof_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProofError::Verifier(format!("spawn snarkjs: {e}")))?;
        let _ = tokio::fs::remove_dir_all(&work_dir).await;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && stdout.contains("OK") {
            return Ok(true);
        }
        if stdout.contains("Invalid") || String::from_utf8_lossy(&output.stderr).contains("Invalid")
        {
            return Ok(false);
        }
        Err(ProofError::Verifier(format!(
            "snarkjs exited with {}",
            output.status
        )))
    }
}

// =============================================================================
// Mock prover (development stand-in)
// =============================================================================

/// Non-cryptographic stand-in proof backend.
///
/// Proofs bind to their public-signal list through a SHA-256 commitment in
/// `pi_a[0]`, so replaying the points with different signals fails
/// verification just like the real backend. Never valid against an on-chain
/// verifier.
pub struct MockProver;

impl MockProver {
    pub fn prove(&self, inputs: &CircuitInputs) -> Proof {
        let public_signals = vec![inputs.message_hash.clone(), inputs.caller.clone()];
        Proof {
            proof: ProofPoints {
                pi_a: vec![Self::commitment(&public_signals), "0".to_string(), "1".to_string()],
                pi_b: vec![
                    vec!["0".to_string(), "0".to_string()],
                    vec!["0".to_string(), "0".to_string()],
                    vec!["1".to_string(), "0".to_string()],
                ],
                pi_c: vec!["0".to_string(), "0".to_string(), "1".to_string()],
                protocol: "groth16".to_string(),
                curve: "bn128".to_string(),
            },
            public_signals,
        }
    }

    pub fn verify(&self, proof: &Proof) -> bool {
        proof.proof.protocol == "groth16"
            && proof
                .proof
                .pi_a
                .first()
                .is_some_and(|c| *c == Self::commitment(&proof.public_signals))
    }

    fn commitment(public_signals: &[String]) -> String {
        hex::encode(Sha256::digest(public_signals.join("|").as_bytes()))
    }
}
