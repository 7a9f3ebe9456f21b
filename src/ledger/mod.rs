// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sandbox Ledger
//!
//! A simulated wallet used for demos. It tracks a balance, an authorization
//! gate for outgoing payments, and a bounded payment history. No real chain
//! is involved.
//!
//! - [`amount`] - exact six-digit decimal amounts
//! - [`model`] - wallet state, payments, status projection
//! - [`engine`] - pure `authorize` / `faucet` / `pay` transitions

pub mod amount;
pub mod engine;
pub mod model;

pub use amount::{canonicalize, Amount, AmountError};
pub use engine::{authorize, faucet, pay, status_view, LedgerError, MAX_AMOUNT};
pub use model::{
    PayCommand, Payment, StatusView, StorageBackend, WalletState, WalletSummary,
    MAX_PAYMENT_HISTORY, STARTING_BALANCE,
};
