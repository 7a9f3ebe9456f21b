// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded wallet database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sandbox_wallets`: storage key → serialized WalletState (JSON bytes)
//!
//! redb calls block, so each operation runs on the blocking thread pool.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{DurableBackend, StoreError, StoreResult};
use crate::ledger::WalletState;

/// storage key → serialized WalletState.
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("sandbox_wallets");

/// Durable wallet store in a local redb file.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn read_wallet(db: &Database, key: &str) -> StoreResult<Option<WalletState>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(WALLETS)?;
    match table.get(key)? {
        Some(value) => {
            let state: WalletState = serde_json::from_slice(value.value())?;
            Ok(Some(state))
        }
        None => Ok(None),
    }
}

fn write_wallet(db: &Database, key: &str, json: &[u8]) -> StoreResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(WALLETS)?;
        table.insert(key, json)?;
    }
    write_txn.commit()?;
    Ok(())
}

impl DurableBackend for RedbBackend {
    fn name(&self) -> &'static str {
        "redb"
    }

    async fn load(&self, key: &str) -> StoreResult<Option<WalletState>> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || read_wallet(&db, &key))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn save(&self, key: &str, state: &WalletState) -> StoreResult<()> {
        let json = serde_json::to_vec(state)?;
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || write_wallet(&db, &key, &json))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// =============================================================================
// Tests
// =============================================================================
