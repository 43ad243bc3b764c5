// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Avatar contract binding and wire-format conversions.

use std::str::FromStr;

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
};

use crate::models::Intent;
use crate::zk::Proof;

use super::submitter::SubmitError;

// Avatar entry points the relay talks to. The proof points are groth16
// curve points; public signals are [intentHash, signerKeyHash].
sol! {
    #[sol(rpc)]
    interface IAvatar {
        struct IntentCall {
            address target;
            uint256 value;
            bytes data;
            uint256 nonce;
            uint256 expiry;
            uint256 chainId;
        }

        struct ProofPoints {
            uint256[2] a;
            uint256[2][2] b;
            uint256[2] c;
        }

        function executeIntent(IntentCall intent, ProofPoints proof, uint256[2] publicSignals) external returns (bool);
        function nonces(address avatar) external view returns (uint256);
        event IntentExecuted(bytes32 indexed intentHash, address indexed target);
    }
}

/// Encode a pipeline intent as the avatar's calldata struct.
pub fn encode_intent(intent: &Intent) -> Result<IAvatar::IntentCall, SubmitError> {
    let target = Address::from_str(&intent.target_address)
        .map_err(|e| SubmitError::Encoding(format!("target address: {e}")))?;

    let value = U256::from_str_radix(&intent.value, 10)
        .map_err(|e| SubmitError::Encoding(format!("value: {e}")))?;

    let data_hex = intent.data.strip_prefix("0x").unwrap_or(&intent.data);
    let data: Bytes = hex::decode(data_hex)
        .map_err(|e| SubmitError::Encoding(format!("call data: {e}")))?
        .into();

    Ok(IAvatar::IntentCall {
        target,
        value,
        data,
        nonce: U256::from(intent.nonce),
        expiry: U256::from(intent.expiry),
        chainId: U256::from(intent.chain_id),
    })
}

/// Encode proof points for the verifier. snarkjs emits projective
/// coordinates with a trailing `1`; the verifier takes affine pairs.
pub fn encode_proof(proof: &Proof) -> Result<IAvatar::ProofPoints, SubmitError> {
    let a = [field(&proof.proof.pi_a, 0)?, field(&proof.proof.pi_a, 1)?];
    let c = [field(&proof.proof.pi_c, 0)?, field(&proof.proof.pi_c, 1)?];

    let row = |i: usize| -> Result<[U256; 2], SubmitError> {
        let row = proof
            .proof
            .pi_b
            .get(i)
            .ok_or_else(|| SubmitError::Encoding(format!("proof pi_b[{i}] missing")))?;
        Ok([field(row, 0)?, field(row, 1)?])
    };
    let b = [row(0)?, row(1)?];

    Ok(IAvatar::ProofPoints { a, b, c })
}

/// Encode the public-signal pair.
pub fn encode_signals(proof: &Proof) -> Result<[U256; 2], SubmitError> {
    if proof.public_signals.len() != 2 {
        return Err(SubmitError::Encoding(format!(
            "expected 2 public signals, got {}",
            proof.public_signals.len()
        )));
    }
    Ok([
        parse_field(&proof.public_signals[0])?,
        parse_field(&proof.public_signals[1])?,
    ])
}

fn field(coords: &[String], i: usize) -> Result<U256, SubmitError> {
    let value = coords
        .get(i)
        .ok_or_else(|| SubmitError::Encoding(format!("proof coordinate {i} missing")))?;
    parse_field(value)
}

/// Field elements arrive as decimal strings from the prover; hashes and
/// signer identities as hex. Accept both.
fn parse_field(value: &str) -> Result<U256, SubmitError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    U256::from_str_radix(trimmed, 10)
        .or_else(|_| U256::from_str_radix(trimmed, 16))
        .map_err(|e| SubmitError::Encoding(format!("field element {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zk::ProofPoints as ZkProofPoints;

    fn intent() -> Intent {
        Intent {
            caller: "01aa".to_string(),
            target_chain: "sepolia".to_string(),
            target_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
            data: "0xdeadbeef".to_string(),
            value: "1000000000000000000".to_string(),
            nonce: 2,
            expiry: 1_800_000_000,
            chain_id: 11155111,
        }
    }

    fn proof() -> Proof {
        Proof {
            proof: ZkProofPoints {
                pi_a: vec!["11".to_string(), "22".to_string(), "1".to_string()],
                pi_b: vec![
                    vec!["1".to_string(), "2".to_string()],
                    vec!["3".to_string(), "4".to_string()],
                    vec!["1".to_string(), "0".to_string()],
                ],
                pi_c: vec!["55".to_string(), "66".to_string(), "1".to_string()],
                protocol: "groth16".to_string(),
                curve: "bn128".to_string(),
            },
            public_signals: vec!["ab".repeat(32), "1234".to_string()],
        }
    }

    #[test]
    fn intent_encodes_to_calldata_struct() {
        let encoded = encode_intent(&intent()).unwrap();
        assert_eq!(encoded.nonce, U256::from(2));
        assert_eq!(encoded.value, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(encoded.data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(encoded.chainId, U256::from(11155111u64));
    }

    #[test]
    fn bad_target_address_is_an_encoding_error() {
        let mut bad = intent();
        bad.target_address = "not-an-address".to_string();
        assert!(matches!(
            encode_intent(&bad),
            Err(SubmitError::Encoding(_))
        ));
    }

    #[test]
    fn proof_points_drop_projective_coordinate() {
        let encoded = encode_proof(&proof()).unwrap();
        assert_eq!(encoded.a, [U256::from(11u64), U256::from(22u64)]);
        assert_eq!(encoded.c, [U256::from(55u64), U256::from(66u64)]);
        assert_eq!(encoded.b[1], [U256::from(3u64), U256::from(4u64)]);
    }

    #[test]
    fn signals_accept_hex_and_decimal() {
        let signals = encode_signals(&proof()).unwrap();
        assert_eq!(signals[1], U256::from(1234u64));
        assert!(signals[0] > U256::ZERO);
    }

    #[test]
    fn wrong_signal_count_is_rejected() {
        let mut p = proof();
        p.public_signals.push("9".to_string());
        assert!(matches!(
            encode_signals(&p),
            Err(SubmitError::Encoding(_))
        ));
    }
}
