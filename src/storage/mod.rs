// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage
//!
//! Sandbox wallet state lives in two tiers:
//!
//! - a **durable** backend that survives restarts, selected at startup:
//!   an embedded redb file, or a REST key-value store
//!   (Upstash / Vercel KV protocol);
//! - a **volatile** in-process map, used whenever the durable backend is
//!   missing, unreachable, or returns something unreadable.
//!
//! Every load and save reports which tier served it so callers can judge
//! durability. Saves never fail: a failed durable write lands in the
//! volatile tier instead.
//!
//! ## Key Layout
//!
//! ```text
//! sandbox_wallet:{wallet_key}  ->  JSON WalletState
//! ```

pub mod ledger_store;
pub mod redb_backend;
pub mod rest_kv;

use std::future::Future;

use crate::config::LedgerBackendConfig;
use crate::ledger::WalletState;

pub use ledger_store::{LedgerStore, DEFAULT_WALLET_KEY};
pub use redb_backend::RedbBackend;
pub use rest_kv::RestKvBackend;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("durable backend is not configured")]
    NotConfigured,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("key-value request failed: {0}")]
    Http(String),

    #[error("key-value response was invalid: {0}")]
    InvalidResponse(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Durable Backend
// =============================================================================

/// A store that survives process restarts.
///
/// `load` returns `Ok(None)` when the key has never been written.
pub trait DurableBackend: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    fn load(&self, key: &str) -> impl Future<Output = StoreResult<Option<WalletState>>> + Send;

    fn save(&self, key: &str, state: &WalletState) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Durable backend chosen from configuration.
pub enum ConfiguredBackend {
    /// No durable store; every request is served by the volatile tier.
    None,
    Redb(RedbBackend),
    RestKv(RestKvBackend),
}

impl ConfiguredBackend {
    /// Open the backend selected by configuration.
    pub fn from_config(config: &LedgerBackendConfig) -> StoreResult<Self> {
        Ok(match config {
            LedgerBackendConfig::None => ConfiguredBackend::None,
            LedgerBackendConfig::Redb(path) => ConfiguredBackend::Redb(RedbBackend::open(path)?),
            LedgerBackendConfig::RestKv { url, token } => ConfiguredBackend::RestKv(
                RestKvBackend::new(url.as_str(), token.as_str(), rest_kv::DEFAULT_KV_TIMEOUT)?,
            ),
        })
    }
}

impl DurableBackend for ConfiguredBackend {
    fn name(&self) -> &'static str {
        match self {
            ConfiguredBackend::None => "none",
            ConfiguredBackend::Redb(backend) => backend.name(),
            ConfiguredBackend::RestKv(backend) => backend.name(),
        }
    }

    async fn load(&self, key: &str) -> StoreResult<Option<WalletState>> {
        match self {
            ConfiguredBackend::None => Err(StoreError::NotConfigured),
            ConfiguredBackend::Redb(backend) => backend.load(key).await,
            ConfiguredBackend::RestKv(backend) => backend.load(key).await,
        }
    }

    async fn save(&self, key: &str, state: &WalletState) -> StoreResult<()> {
        match self {
            ConfiguredBackend::None => Err(StoreError::NotConfigured),
            ConfiguredBackend::Redb(backend) => backend.save(key, state).await,
            ConfiguredBackend::RestKv(backend) => backend.save(key, state).await,
        }
    }
}
