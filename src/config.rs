// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Relay configuration is loaded from the environment at startup and
//! validated once before any task is spawned.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SOURCE_NODE_URL` | Source-chain JSON-RPC endpoint | `http://localhost:7777/rpc` |
//! | `SOURCE_CHAIN_NAME` | Source-chain network name | `casper-test` |
//! | `SOURCE_CONTRACT_HASH` | Intent contract hash on the source chain | Required |
//! | `DEST_RPC_URL` | Destination-chain JSON-RPC endpoint | Required |
//! | `DEST_CHAIN_ID` | Destination chain id intents are bound to | `11155111` |
//! | `AVATAR_CONTRACT` | Avatar contract address on the destination chain | Required |
//! | `RELAYER_PRIVATE_KEY` | Hex private key funding destination submissions | Required |
//! | `POLL_INTERVAL_MS` | Source poll interval in milliseconds | `5000` |
//! | `MAX_SIGNATURE_ATTEMPTS` | Ticks before an unresolvable signature fails the event | `5` |
//! | `SUBMIT_TIMEOUT_SECS` | Deadline on the destination finality wait | `180` |
//! | `INTENT_TTL_SECS` | Expiry bound applied to intents at submission | `3600` |
//! | `ZK_WASM_PATH` | Circuit witness generator artifact | `./circuits/ed25519_verifier.wasm` |
//! | `ZK_ZKEY_PATH` | Circuit proving key artifact | `./circuits/ed25519_verifier.zkey` |
//! | `ZK_VERIFICATION_KEY_PATH` | Circuit verification key | `./circuits/verification_key.json` |
//! | `PROOF_OUTPUT_DIR` | Directory proof artifacts are saved under | `./proofs` |
//! | `HOST` | Status API bind address | `0.0.0.0` |
//! | `PORT` | Status API bind port | `3001` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Zero-value placeholder addresses that must not pass validation.
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Source-chain settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub node_url: String,
    pub chain_name: String,
    pub contract_hash: String,
}

/// Destination-chain settings.
#[derive(Debug, Clone)]
pub struct DestinationConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub avatar_contract: String,
    pub relayer_private_key: String,
}

/// Circuit artifact locations for the real proving backend.
#[derive(Debug, Clone)]
pub struct ZkConfig {
    pub wasm_path: PathBuf,
    pub zkey_path: PathBuf,
    pub verification_key_path: PathBuf,
    pub proof_output_dir: PathBuf,
}

/// Top-level relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub zk: ZkConfig,
    pub poll_interval: Duration,
    pub max_signature_attempts: u32,
    pub submit_timeout: Duration,
    pub intent_ttl_secs: u64,
    pub host: String,
    pub port: u16,
}

/// Configuration validation failure listing every problem found.
#[derive(Debug, thiserror::Error)]
#[error("Configuration validation failed:\n{}", .0.join("\n"))]
pub struct ConfigError(pub Vec<String>);

impl RelayConfig {
    /// Load configuration from the environment. Missing optional variables
    /// fall back to defaults; required variables are checked by [`validate`].
    ///
    /// [`validate`]: RelayConfig::validate
    pub fn from_env() -> Self {
        Self {
            source: SourceConfig {
                node_url: env_or("SOURCE_NODE_URL", "http://localhost:7777/rpc"),
                chain_name: env_or("SOURCE_CHAIN_NAME", "casper-test"),
                contract_hash: env_or("SOURCE_CONTRACT_HASH", ""),
            },
            destination: DestinationConfig {
                rpc_url: env_or("DEST_RPC_URL", ""),
                chain_id: env_parse("DEST_CHAIN_ID", 11155111),
                avatar_contract: env_or("AVATAR_CONTRACT", ""),
                relayer_private_key: env_or("RELAYER_PRIVATE_KEY", ""),
            },
            zk: ZkConfig {
                wasm_path: env_or("ZK_WASM_PATH", "./circuits/ed25519_verifier.wasm").into(),
                zkey_path: env_or("ZK_ZKEY_PATH", "./circuits/ed25519_verifier.zkey").into(),
                verification_key_path: env_or(
                    "ZK_VERIFICATION_KEY_PATH",
                    "./circuits/verification_key.json",
                )
                .into(),
                proof_output_dir: env_or("PROOF_OUTPUT_DIR", "./proofs").into(),
            },
            poll_interval: Duration::from_millis(env_parse("POLL_INTERVAL_MS", 5000u64)),
            max_signature_attempts: env_parse("MAX_SIGNATURE_ATTEMPTS", 5u32),
            submit_timeout: Duration::from_secs(env_parse("SUBMIT_TIMEOUT_SECS", 180u64)),
            intent_ttl_secs: env_parse("INTENT_TTL_SECS", 3600u64),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3001u16),
        }
    }

    /// Check required settings, collecting every problem rather than
    /// stopping at the first, so an operator can fix them in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.source.contract_hash.is_empty() {
            errors.push("SOURCE_CONTRACT_HASH is required".to_string());
        }
        if self.destination.rpc_url.is_empty() {
            errors.push("DEST_RPC_URL is required".to_string());
        }
        if self.destination.avatar_contract.is_empty()
            || self.destination.avatar_contract == ZERO_ADDRESS
        {
            errors.push("AVATAR_CONTRACT is required".to_string());
        }
        if self.destination.relayer_private_key.is_empty()
            || self.destination.relayer_private_key == "your_private_key_here"
        {
            errors.push("RELAYER_PRIVATE_KEY is required".to_string());
        }
        if self.poll_interval.is_zero() {
            errors.push("POLL_INTERVAL_MS must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(errors))
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
