// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Source-chain integration: the JSON-RPC read surface and the intent
//! event watcher built on top of it.

pub mod rpc;
pub mod watcher;

pub use rpc::{CasperRpc, SourceError, SourceRpc};
pub use watcher::{DetectedIntent, SourceWatcher};
