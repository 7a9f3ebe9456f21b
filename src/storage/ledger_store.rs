// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Two-tier wallet store with per-wallet serialization.
//!
//! [`LedgerStore::transact`] holds the wallet's lock across the whole
//! load → transition → save cycle, so concurrent requests against the same
//! wallet apply one after another instead of overwriting each other.
//! Locks are per wallet key; unrelated wallets never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use super::{ConfiguredBackend, DurableBackend, StoreError, StoreResult};
use crate::ledger::{StorageBackend, WalletState};

/// Wallet served by the HTTP API.
pub const DEFAULT_WALLET_KEY: &str = "default";

const KEY_PREFIX: &str = "sandbox_wallet";

/// Sandbox wallet store: durable tier first, volatile tier as fallback.
pub struct LedgerStore<B = ConfiguredBackend> {
    durable: B,
    volatile: RwLock<HashMap<String, WalletState>>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<B: DurableBackend> LedgerStore<B> {
    pub fn new(durable: B) -> Self {
        Self {
            durable,
            volatile: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the configured durable backend.
    pub fn durable_name(&self) -> &'static str {
        self.durable.name()
    }

    /// Check whether the durable backend currently answers.
    pub async fn probe_durable(&self) -> StoreResult<()> {
        self.durable
            .load(&storage_key(DEFAULT_WALLET_KEY))
            .await
            .map(|_| ())
    }

    /// Load a wallet, creating it on first access.
    ///
    /// A wallet that exists nowhere yet is created with a new id and
    /// persisted immediately so its id stays stable.
    pub async fn load(&self, wallet_key: &str) -> (WalletState, StorageBackend) {
        let key = storage_key(wallet_key);
        match self.durable.load(&key).await {
            Ok(Some(state)) => return (state, StorageBackend::Durable),
            Ok(None) => {
                // Promote a volatile snapshot written while the durable tier was down.
                let existing = self.volatile.read().await.get(wallet_key).cloned();
                let state = match existing {
                    Some(state) => state,
                    None => {
                        let state = WalletState::fresh();
                        info!(
                            wallet_key,
                            wallet_id = %state.wallet_id,
                            "Created sandbox wallet"
                        );
                        state
                    }
                };
                let backend = self.save(wallet_key, &state).await;
                return (state, backend);
            }
            Err(e) => self.log_durable_failure("load", wallet_key, &e),
        }

        let mut volatile = self.volatile.write().await;
        let state = volatile
            .entry(wallet_key.to_string())
            .or_insert_with(|| {
                let state = WalletState::fresh();
                info!(
                    wallet_key,
                    wallet_id = %state.wallet_id,
                    "Created volatile sandbox wallet"
                );
                state
            })
            .clone();
        (state, StorageBackend::Volatile)
    }

    /// Persist a wallet. Never fails; reports the tier that took the write.
    pub async fn save(&self, wallet_key: &str, state: &WalletState) -> StorageBackend {
        match self.durable.save(&storage_key(wallet_key), state).await {
            Ok(()) => {
                // The durable copy is authoritative from now on.
                self.volatile.write().await.remove(wallet_key);
                StorageBackend::Durable
            }
            Err(e) => {
                self.log_durable_failure("save", wallet_key, &e);
                self.volatile
                    .write()
                    .await
                    .insert(wallet_key.to_string(), state.clone());
                StorageBackend::Volatile
            }
        }
    }

    /// Read a wallet under its lock.
    pub async fn snapshot(&self, wallet_key: &str) -> (WalletState, StorageBackend) {
        let lock = self.lock_for(wallet_key);
        let _guard = lock.lock().await;
        self.load(wallet_key).await
    }

    /// Apply one transition atomically with respect to other callers.
    ///
    /// Nothing is saved when `transition` fails. The returned tier is the
    /// one that persisted the new state.
    pub async fn transact<T, E, F>(
        &self,
        wallet_key: &str,
        transition: F,
    ) -> Result<(T, StorageBackend), E>
    where
        F: FnOnce(&WalletState) -> Result<(WalletState, T), E>,
    {
        let lock = self.lock_for(wallet_key);
        let _guard = lock.lock().await;

        let (current, _) = self.load(wallet_key).await;
        let (next, output) = transition(&current)?;
        let backend = self.save(wallet_key, &next).await;
        debug!(wallet_key, storage = %backend, "Ledger transition persisted");
        Ok((output, backend))
    }

    fn lock_for(&self, wallet_key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(wallet_key.to_string()).or_default())
    }

    fn log_durable_failure(&self, operation: &str, wallet_key: &str, error: &StoreError) {
        if matches!(error, StoreError::NotConfigured) {
            debug!(wallet_key, operation, "No durable backend, using volatile tier");
        } else {
            warn!(
                wallet_key,
                operation,
                backend = self.durable.name(),
                error = %error,
                "Durable ledger backend failed, using volatile tier"
            );
        }
    }
}

fn storage_key(wallet_key: &str) -> String {
    format!("{KEY_PREFIX}:{wallet_key}")
}
