// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Avatar Authorization Engine
//!
//! The destination-side state machine that makes a relayed proof safe to
//! execute exactly once. On a real deployment this logic lives in the
//! avatar contract, outside the relay's control; it is implemented here
//! because the relay's correctness depends on its exact semantics, and so
//! the full pipeline can run in-process for development and tests.
//!
//! `execute_intent` checks, in order: pause state, chain binding, expiry
//! (inclusive), exact nonce, then proof validity against the recomputed
//! canonical intent hash and the avatar's controller key hash. The nonce
//! commits only if the inner call succeeds, so a failed payload can be
//! retried with the same nonce.

use sha2::{Digest, Sha256};

use crate::models::Intent;
use crate::zk::{intent_hash, MockProver, Proof, ProofPoints};

/// Public-signal layout: `[intent_hash, claimed_signer]`.
const PUBLIC_SIGNAL_COUNT: usize = 2;

/// Rejections raised by the authorization engine. Condition identifiers
/// mirror the avatar contract's custom errors; the relay surfaces them
/// verbatim as submission failures and never retries them silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvatarError {
    #[error("InvalidChainId")]
    InvalidChainId,

    #[error("IntentExpired")]
    IntentExpired,

    #[error("InvalidNonce")]
    InvalidNonce,

    #[error("InvalidProof")]
    InvalidProof,

    #[error("ContractPaused")]
    ContractPaused,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid controller hash")]
    InvalidController,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Call failed: {0}")]
    CallFailed(String),
}

/// Verifier capability the engine delegates proof checking to. On-chain
/// this is the groth16 verifier contract; in-process it is backed by the
/// crypto gateway's verifying half.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &ProofPoints, public_signals: &[String]) -> bool;
}

impl ProofVerifier for MockProver {
    fn verify(&self, proof: &ProofPoints, public_signals: &[String]) -> bool {
        MockProver::verify(
            self,
            &Proof {
                proof: proof.clone(),
                public_signals: public_signals.to_vec(),
            },
        )
    }
}

/// Events the engine emits, mirroring the avatar contract's log surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarEvent {
    IntentExecuted { intent_hash: String, target: String },
    ControllerUpdated { previous: String, current: String },
    FundsReceived { from: String, amount: u128 },
    EmergencyWithdrawal { to: String, amount: u128 },
}

/// Result of a successful intent execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub intent_hash: String,
    pub new_nonce: u64,
}

/// Hash binding an avatar to its controller identity.
pub fn controller_key_hash(tagged_key_hex: &str) -> String {
    hex::encode(Sha256::digest(tagged_key_hex.as_bytes()))
}

/// The avatar's authorization state machine.
pub struct AvatarEngine<V> {
    verifier: V,
    owner: String,
    controller_key_hash: String,
    chain_id: u64,
    nonce: u64,
    paused: bool,
    balance: u128,
    events: Vec<AvatarEvent>,
}

impl<V: ProofVerifier> AvatarEngine<V> {
    /// Deploy an avatar bound to a controller key hash. Nonce starts at 0,
    /// unpaused, with the deployer as owner.
    pub fn new(verifier: V, owner: impl Into<String>, controller_key_hash: String, chain_id: u64) -> Self {
        Self {
            verifier,
            owner: owner.into(),
            controller_key_hash,
            chain_id,
            nonce: 0,
            paused: false,
            balance: 0,
            events: Vec::new(),
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn controller(&self) -> &str {
        &self.controller_key_hash
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn events(&self) -> &[AvatarEvent] {
        &self.events
    }

    /// Whether an intent hash already appears in the executed-event log.
    pub fn is_executed(&self, hash: &str) -> bool {
        self.events.iter().any(|e| {
            matches!(e, AvatarEvent::IntentExecuted { intent_hash, .. } if intent_hash == hash)
        })
    }

    /// Validate and execute a relayed intent.
    ///
    /// `now` is the executing chain's timestamp. `call` performs the inner
    /// call; if it errors, the whole execution reverts, including the nonce
    /// increment.
    pub fn execute_intent(
        &mut self,
        intent: &Intent,
        proof: &ProofPoints,
        public_signals: &[String],
        now: u64,
        call: impl FnOnce(&str, u128, &str) -> Result<(), String>,
    ) -> Result<ExecutionReceipt, AvatarError> {
        if self.paused {
            return Err(AvatarError::ContractPaused);
        }
        if intent.chain_id != self.chain_id {
            return Err(AvatarError::InvalidChainId);
        }
        // Expiry is inclusive: an intent expiring exactly now still executes.
        if intent.expiry < now {
            return Err(AvatarError::IntentExpired);
        }
        if intent.nonce != self.nonce {
            return Err(AvatarError::InvalidNonce);
        }

        // Proof binding: the first signal must equal the recomputed
        // canonical hash, the claimed signer must hash to the registered
        // controller, and the proof must verify over exactly these signals.
        let expected_hash = intent_hash(intent);
        if public_signals.len() != PUBLIC_SIGNAL_COUNT
            || public_signals[0] != expected_hash
            || controller_key_hash(&public_signals[1]) != self.controller_key_hash
            || !self.verifier.verify(proof, public_signals)
        {
            return Err(AvatarError::InvalidProof);
        }

        let value: u128 = intent
            .value
            .parse()
            .map_err(|_| AvatarError::CallFailed("invalid value".to_string()))?;
        if value > self.balance {
            return Err(AvatarError::CallFailed("insufficient avatar balance".to_string()));
        }

        call(&intent.target_address, value, &intent.data).map_err(AvatarError::CallFailed)?;

        // Commit only after the inner call succeeded.
        self.balance -= value;
        self.nonce += 1;
        self.events.push(AvatarEvent::IntentExecuted {
            intent_hash: expected_hash.clone(),
            target: intent.target_address.clone(),
        });

        Ok(ExecutionReceipt {
            intent_hash: expected_hash,
            new_nonce: self.nonce,
        })
    }

    pub fn pause(&mut self, caller: &str) -> Result<(), AvatarError> {
        self.require_owner(caller)?;
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, caller: &str) -> Result<(), AvatarError> {
        self.require_owner(caller)?;
        self.paused = false;
        Ok(())
    }

    /// Rebind the avatar to a new controller key hash. Owner-only; the zero
    /// hash is never a valid controller.
    pub fn update_controller(&mut self, caller: &str, new_hash: String) -> Result<(), AvatarError> {
        self.require_owner(caller)?;
        if is_zero_hash(&new_hash) {
            return Err(AvatarError::InvalidController);
        }

        let previous = std::mem::replace(&mut self.controller_key_hash, new_hash.clone());
        self.events.push(AvatarEvent::ControllerUpdated {
            previous,
            current: new_hash,
        });
        Ok(())
    }

    /// Administrative escape hatch, independent of the intent pipeline.
    pub fn emergency_withdraw(
        &mut self,
        caller: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), AvatarError> {
        self.require_owner(caller)?;
        if is_zero_address(to) {
            return Err(AvatarError::InvalidRecipient);
        }
        if amount > self.balance {
            return Err(AvatarError::CallFailed("insufficient avatar balance".to_string()));
        }

        self.balance -= amount;
        self.events.push(AvatarEvent::EmergencyWithdrawal {
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Native value received outside `execute_intent` is always accepted
    /// and logged; an avatar is also a receiving address.
    pub fn receive(&mut self, from: &str, amount: u128) {
        self.balance += amount;
        self.events.push(AvatarEvent::FundsReceived {
            from: from.to_string(),
            amount,
        });
    }

    fn require_owner(&self, caller: &str) -> Result<(), AvatarError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(AvatarError::Unauthorized)
        }
    }
}

fn is_zero_hash(hash: &str) -> bool {
    let digits = hash.strip_prefix("0x").unwrap_or(hash);
    digits.is_empty() || digits.chars().all(|c| c == '0')
}

fn is_zero_address(address: &str) -> bool {
    is_zero_hash(address)
}
