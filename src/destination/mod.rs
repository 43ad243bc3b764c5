// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Destination-chain integration: the avatar contract binding and the
//! transaction submitter built on top of it.

pub mod contract;
pub mod submitter;

pub use submitter::{EvmSubmitter, IntentSubmitter, SubmissionReceipt, SubmitError};
