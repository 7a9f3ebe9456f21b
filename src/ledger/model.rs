// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sandbox wallet state and payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::amount::Amount;

/// Balance granted to a freshly created sandbox wallet.
pub const STARTING_BALANCE: Amount = Amount::from_units(100);

/// Maximum number of payments retained in history.
pub const MAX_PAYMENT_HISTORY: usize = 200;

/// Persisted state of one sandbox wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub wallet_id: String,
    pub balance: Amount,
    pub auth_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl WalletState {
    /// A brand-new wallet with the starting balance and payments disabled.
    pub fn fresh() -> Self {
        Self::fresh_at(Utc::now())
    }

    pub fn fresh_at(now: DateTime<Utc>) -> Self {
        Self {
            wallet_id: format!("sbx_{}", Uuid::new_v4().simple()),
            balance: STARTING_BALANCE,
            auth_enabled: false,
            created_at: now,
            payments: Vec::new(),
        }
    }
}

/// A recorded sandbox payment. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    /// `pay_<unix millis>_<random>`.
    pub id: String,
    pub ts: DateTime<Utc>,
    /// Free-form recipient identifier.
    pub to: String,
    /// Canonical decimal amount.
    #[schema(value_type = String, example = "20")]
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl Payment {
    pub fn new_id(at: DateTime<Utc>) -> String {
        let entropy = Uuid::new_v4().simple().to_string();
        format!("pay_{}_{}", at.timestamp_millis(), &entropy[..8])
    }
}

/// Payment instruction, validated at the HTTP boundary for shape only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayCommand {
    pub to: String,
    pub amount: String,
    pub memo: Option<String>,
}

/// Which storage tier served a ledger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Persisted by the configured durable store.
    Durable,
    /// Held only in process memory; lost on restart.
    Volatile,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Durable => "durable",
            StorageBackend::Volatile => "volatile",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only wallet summary. Never carries the payment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusView {
    pub wallet: WalletSummary,
    pub payments_count: usize,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WalletSummary {
    pub wallet_id: String,
    #[schema(value_type = String, example = "100")]
    pub balance: Amount,
    pub auth_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_wallet_defaults() {
        let wallet = WalletState::fresh();
        assert!(wallet.wallet_id.starts_with("sbx_"));
        assert_eq!(wallet.balance.to_string(), "100");
        assert!(!wallet.auth_enabled);
        assert!(wallet.payments.is_empty());
        assert_ne!(wallet.wallet_id, WalletState::fresh().wallet_id);
    }

    #[test]
    fn wallet_state_round_trips_with_string_balance() {
        let wallet = WalletState::fresh();
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["balance"], "100");
        let back: WalletState = serde_json::from_value(json).unwrap();
        assert_eq!(back, wallet);
    }

    #[test]
    fn payments_default_to_empty_when_missing() {
        let json = serde_json::json!({
            "wallet_id": "sbx_legacy",
            "balance": "42.5",
            "auth_enabled": true,
            "created_at": "2026-01-01T00:00:00Z"
        });
        let wallet: WalletState = serde_json::from_value(json).unwrap();
        assert!(wallet.payments.is_empty());
        assert_eq!(wallet.balance.to_string(), "42.5");
    }

    #[test]
    fn payment_ids_carry_time_and_entropy() {
        let now = Utc::now();
        let a = Payment::new_id(now);
        let b = Payment::new_id(now);
        assert!(a.starts_with(&format!("pay_{}_", now.timestamp_millis())));
        assert_ne!(a, b);
    }

    #[test]
    fn storage_backend_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&StorageBackend::Volatile).unwrap(),
            r#""volatile""#
        );
        assert_eq!(StorageBackend::Durable.to_string(), "durable");
    }
}
