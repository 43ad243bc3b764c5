// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Destination Submitter
//!
//! Encodes intent + proof into an avatar `executeIntent` call, provisions
//! gas with a fixed safety margin, submits, and blocks until the
//! destination ledger finalizes the call. Synchronous wait-for-receipt is a
//! deliberate simplicity/latency tradeoff; a configurable deadline bounds a
//! stuck ledger.
//!
//! Every failure mode surfaces as a [`SubmitError`] with the underlying
//! cause preserved verbatim; nothing is thrown past this boundary.

use std::str::FromStr;
use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet},
    primitives::{Address, FixedBytes, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    signers::local::PrivateKeySigner,
};
use tracing::{debug, info};

use crate::config::DestinationConfig;
use crate::models::Intent;
use crate::zk::Proof;

use super::contract::{encode_intent, encode_proof, encode_signals, IAvatar};

/// Minimum relayer balance required before any submission is attempted
/// (0.01 native token).
const MIN_RELAYER_RESERVE_WEI: u64 = 10_000_000_000_000_000;

/// Gas limit safety margin over the node's estimate, in percent.
const GAS_MARGIN_PERCENT: u64 = 120;

/// Standard priority fee (1.5 gwei).
const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

/// Fallback base fee when the latest block omits one (25 gwei).
const FALLBACK_BASE_FEE: u128 = 25_000_000_000;

/// How far back `executed_recently` searches the event log.
const EXECUTED_LOOKBACK_BLOCKS: u64 = 1000;

/// Signing HTTP provider (all fillers + wallet).
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Successful submission, reported after finality.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub tx_hash: String,
    pub gas_used: u64,
}

/// Submission-time failures. All terminal for the affected intent.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid relayer key: {0}")]
    InvalidKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to encode call: {0}")]
    Encoding(String),

    #[error("Insufficient relayer balance: {balance} wei, reserve is {reserve} wei")]
    InsufficientBalance { balance: U256, reserve: U256 },

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Destination reverted: {0}")]
    Reverted(String),

    #[error("Timed out after {0:?} waiting for finality")]
    Timeout(Duration),
}

/// Capability the orchestrator drives; lets tests close the loop against an
/// in-process avatar instead of a live chain.
pub trait IntentSubmitter: Send + Sync {
    fn submit(
        &self,
        intent: &Intent,
        proof: &Proof,
    ) -> impl std::future::Future<Output = Result<SubmissionReceipt, SubmitError>> + Send;
}

/// Relayer account snapshot for the startup banner.
#[derive(Debug, Clone)]
pub struct RelayerInfo {
    pub address: String,
    pub balance_wei: U256,
    pub gas_price_gwei: u128,
}

/// Submits intents to the avatar contract on the destination EVM chain.
#[derive(Debug)]
pub struct EvmSubmitter {
    provider: SigningProvider,
    relayer_address: Address,
    avatar_address: Address,
    submit_timeout: Duration,
}

impl EvmSubmitter {
    pub fn new(
        destination: &DestinationConfig,
        submit_timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let key_hex = destination
            .relayer_private_key
            .strip_prefix("0x")
            .unwrap_or(&destination.relayer_private_key);
        let key_bytes = hex::decode(key_hex).map_err(|e| SubmitError::InvalidKey(e.to_string()))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SubmitError::InvalidKey(e.to_string()))?;
        let relayer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url: url::Url = destination
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| SubmitError::InvalidRpcUrl(e.to_string()))?;
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        let avatar_address = Address::from_str(&destination.avatar_contract)
            .map_err(|e| SubmitError::InvalidAddress(e.to_string()))?;

        info!(
            relayer = %relayer_address,
            avatar = %avatar_address,
            chain_id = destination.chain_id,
            "Destination submitter initialized"
        );

        Ok(Self {
            provider,
            relayer_address,
            avatar_address,
            submit_timeout,
        })
    }

    /// Relayer account address derived from the configured key.
    pub fn address(&self) -> Address {
        self.relayer_address
    }

    /// Submit `executeIntent(intent, proof, publicSignals)` and wait for
    /// the receipt.
    async fn submit_inner(
        &self,
        intent: &Intent,
        proof: &Proof,
    ) -> Result<SubmissionReceipt, SubmitError> {
        // Precondition: operating reserve, checked before any state change.
        let balance = self
            .provider
            .get_balance(self.relayer_address)
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;
        let reserve = U256::from(MIN_RELAYER_RESERVE_WEI);
        if balance < reserve {
            return Err(SubmitError::InsufficientBalance { balance, reserve });
        }

        // Cheap chain reads before spending gas: skip intents the avatar
        // has already executed or cannot accept at this nonce.
        let intent_hash = crate::zk::intent_hash(intent);
        if self.executed_recently(&intent_hash).await? {
            return Err(SubmitError::Reverted(format!(
                "intent {intent_hash} already executed on destination"
            )));
        }
        let avatar_nonce = self.avatar_nonce().await?;
        if avatar_nonce != intent.nonce {
            return Err(SubmitError::Reverted(format!(
                "execution reverted: InvalidNonce (avatar at {avatar_nonce}, intent carries {})",
                intent.nonce
            )));
        }

        let call_intent = encode_intent(intent)?;
        let call_proof = encode_proof(proof)?;
        let signals = encode_signals(proof)?;

        let contract = IAvatar::new(self.avatar_address, &self.provider);
        let call = contract.executeIntent(call_intent, call_proof, signals);

        let gas_estimate = call
            .estimate_gas()
            .await
            .map_err(|e| SubmitError::GasEstimation(e.to_string()))?;
        let gas_limit = gas_estimate * GAS_MARGIN_PERCENT / 100;
        let (max_fee, priority_fee) = self.gas_prices().await?;

        debug!(
            event_nonce = intent.nonce,
            gas_estimate,
            gas_limit,
            max_fee,
            "Submitting executeIntent"
        );

        let pending = call
            .gas(gas_limit)
            .max_fee_per_gas(max_fee)
            .max_priority_fee_per_gas(priority_fee)
            .send()
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        info!(tx_hash = %tx_hash, "Transaction submitted, awaiting finality");

        // Blocks until the destination finalizes, bounded by the deadline.
        let receipt = tokio::time::timeout(self.submit_timeout, pending.get_receipt())
            .await
            .map_err(|_| SubmitError::Timeout(self.submit_timeout))?
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;

        if !receipt.status() {
            return Err(SubmitError::Reverted(format!(
                "executeIntent reverted in tx {tx_hash}"
            )));
        }

        Ok(SubmissionReceipt {
            tx_hash,
            gas_used: receipt.gas_used as u64,
        })
    }

    /// Current avatar nonce, read from the contract.
    pub async fn avatar_nonce(&self) -> Result<u64, SubmitError> {
        let contract = IAvatar::new(self.avatar_address, &self.provider);
        let nonce = contract
            .nonces(self.avatar_address)
            .call()
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;
        Ok(nonce.to::<u64>())
    }

    /// Whether an `IntentExecuted` event for this hash appears in the
    /// recent event log.
    pub async fn executed_recently(&self, intent_hash_hex: &str) -> Result<bool, SubmitError> {
        let hash_bytes =
            hex::decode(intent_hash_hex).map_err(|e| SubmitError::Encoding(e.to_string()))?;
        let hash: FixedBytes<32> = FixedBytes::try_from(hash_bytes.as_slice())
            .map_err(|e| SubmitError::Encoding(e.to_string()))?;

        let head = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;

        let contract = IAvatar::new(self.avatar_address, &self.provider);
        let events = contract
            .IntentExecuted_filter()
            .topic1(hash)
            .from_block(head.saturating_sub(EXECUTED_LOOKBACK_BLOCKS))
            .query()
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;

        Ok(!events.is_empty())
    }

    /// Relayer account snapshot for the startup banner.
    pub async fn relayer_info(&self) -> Result<RelayerInfo, SubmitError> {
        let balance_wei = self
            .provider
            .get_balance(self.relayer_address)
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?;
        let (max_fee, _) = self.gas_prices().await?;

        Ok(RelayerInfo {
            address: format!("{:?}", self.relayer_address),
            balance_wei,
            gas_price_gwei: max_fee / 1_000_000_000,
        })
    }

    /// EIP-1559 fee pair: max fee = 2 × base fee + tip, allowing for a base
    /// fee increase while the transaction is pending.
    async fn gas_prices(&self) -> Result<(u128, u128), SubmitError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| SubmitError::Rpc(e.to_string()))?
            .ok_or_else(|| SubmitError::Rpc("no latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(FALLBACK_BASE_FEE);

        let max_fee = base_fee
            .saturating_mul(2)
            .saturating_add(DEFAULT_PRIORITY_FEE);

        Ok((max_fee, DEFAULT_PRIORITY_FEE))
    }
}

impl IntentSubmitter for EvmSubmitter {
    async fn submit(
        &self,
        intent: &Intent,
        proof: &Proof,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.submit_inner(intent, proof).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination(key: &str) -> DestinationConfig {
        DestinationConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            avatar_contract: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
            relayer_private_key: key.to_string(),
        }
    }

    #[test]
    fn submitter_builds_from_valid_config() {
        let key = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let submitter = EvmSubmitter::new(&destination(key), Duration::from_secs(60));
        assert!(submitter.is_ok());
    }

    #[test]
    fn prefixed_key_is_accepted() {
        let key = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        assert!(EvmSubmitter::new(&destination(key), Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn malformed_key_is_rejected() {
        let err = EvmSubmitter::new(&destination("zz"), Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidKey(_)));
    }

    #[test]
    fn malformed_avatar_address_is_rejected() {
        let mut config = destination(
            "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        );
        config.avatar_contract = "not-an-address".to_string();
        let err = EvmSubmitter::new(&config, Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidAddress(_)));
    }
}
