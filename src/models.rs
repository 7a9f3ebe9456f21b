// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Requests are typed so that
//! malformed shapes are rejected at the boundary and never reach the ledger
//! engine or the relay forwarder.
//!
//! ## Model Categories
//!
//! - **Sandbox Wallet**: status, authorize, faucet, pay, payment history
//! - **Relay**: gateway ingestion of upstream + executor commands
//! - **Execute**: executor-side acknowledgement of a signed envelope

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::ledger::{Amount, Payment, StorageBackend, WalletSummary};

// =============================================================================
// Amount Input
// =============================================================================

/// An amount as sent by clients: a decimal string or a JSON number.
///
/// Numbers are converted to text before parsing so that no float arithmetic
/// touches the balance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn into_text(self) -> String {
        match self {
            AmountInput::Text(text) => text,
            AmountInput::Number(number) => number.to_string(),
        }
    }
}

// =============================================================================
// Sandbox Wallet Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthorizeRequest {
    /// Whether outgoing payments are allowed.
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FaucetRequest {
    #[schema(value_type = String, example = "50")]
    pub amount: AmountInput,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PayRequest {
    /// Recipient identifier. Required; blank is rejected.
    #[serde(default)]
    #[schema(example = "0xabc")]
    pub to: String,
    #[schema(value_type = String, example = "20")]
    pub amount: AmountInput,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentsQuery {
    /// Maximum number of payments to return, newest first (default 50).
    pub limit: Option<usize>,
}

// =============================================================================
// Sandbox Wallet Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusResponse {
    pub ok: bool,
    pub sandbox: bool,
    pub storage: StorageBackend,
    pub wallet: WalletSummary,
    pub payments_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorizeResponse {
    pub ok: bool,
    pub sandbox: bool,
    pub auth_enabled: bool,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FaucetResponse {
    pub ok: bool,
    pub sandbox: bool,
    #[schema(value_type = String, example = "150")]
    pub balance: Amount,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayResponse {
    pub ok: bool,
    pub sandbox: bool,
    pub payment: Payment,
    #[schema(value_type = String, example = "130")]
    pub balance: Amount,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentsResponse {
    pub ok: bool,
    pub sandbox: bool,
    pub storage: StorageBackend,
    /// Newest first.
    pub payments: Vec<Payment>,
    /// Number of payments retained in history.
    pub total: usize,
}

// =============================================================================
// Relay
// =============================================================================

/// Upstream call requested by a relay caller.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpstreamSpec {
    /// Completion endpoint; defaults to the configured `OPENMIND_URL`.
    #[serde(default)]
    pub url: Option<String>,
    /// JSON body sent upstream verbatim.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RelayRequest {
    #[serde(default)]
    pub upstream: Option<UpstreamSpec>,
    /// Defaults to true when an executor is configured.
    #[serde(default)]
    pub forward_to_executor: Option<bool>,
    /// Extra fields merged into the signed executor payload.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub executor_payload: Option<Map<String, Value>>,
}

// =============================================================================
// Execute
// =============================================================================

/// Executor acknowledgement of a verified envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteResponse {
    pub accepted: bool,
    #[schema(value_type = Option<u16>)]
    pub openmind_status: Value,
    pub note: String,
    #[schema(value_type = Option<Object>)]
    pub openmind_response_preview: Value,
}
