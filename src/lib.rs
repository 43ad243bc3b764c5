// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Intent Relay - Cross-Chain Intent Execution Service
//!
//! This crate relays signed intents from a Casper-style source chain to an
//! avatar contract on an EVM destination chain, carrying a zero-knowledge
//! proof of signature validity instead of the signature itself.
//!
//! ## Modules
//!
//! - `api` - Status HTTP API (Axum)
//! - `source` - Source-chain polling and intent detection
//! - `zk` - Intent hashing, approval parsing, proof generation
//! - `destination` - EVM submission (Alloy)
//! - `orchestrator` - Pipeline sequencing and status transitions
//! - `avatar` - Reference model of the avatar contract's authorization rules

pub mod api;
pub mod avatar;
pub mod config;
pub mod destination;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod source;
pub mod state;
pub mod status;
pub mod zk;
