// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Relay - Signed Command Relay & Sandbox Ledger
//!
//! A public gateway relays commands to a private executor inside HMAC-signed
//! envelopes. The same service hosts a sandbox wallet ledger used for demos;
//! it never touches a real chain.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `envelope` - envelope signing, freshness and replay checks
//! - `ledger` - sandbox wallet model and pure transitions
//! - `storage` - durable (redb / REST KV) and volatile ledger storage
//! - `providers` - outbound clients for the completion API and the executor
//! - `relay` - relay orchestration

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ledger;
pub mod models;
pub mod providers;
pub mod relay;
pub mod state;
pub mod storage;
pub mod telemetry;
