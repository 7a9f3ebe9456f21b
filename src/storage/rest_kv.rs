// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! REST key-value store (Upstash / Vercel KV protocol).
//!
//! ```text
//! GET  {base}/get/{key}   Authorization: Bearer {token}  ->  {"result": "<json>" | null}
//! POST {base}/set/{key}   Authorization: Bearer {token}  ->  {"result": "OK"}
//!      body: <json>
//! ```
//!
//! Some clients store the wallet as a JSON object rather than a string, so
//! `result` is accepted in either form.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{DurableBackend, StoreError, StoreResult};
use crate::ledger::WalletState;

/// Default timeout for key-value requests.
pub const DEFAULT_KV_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RestKvBackend {
    base_url: String,
    token: String,
    http: Client,
}

impl RestKvBackend {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    fn command_url(&self, command: &str, key: &str) -> String {
        format!("{}/{command}/{key}", self.base_url)
    }

    async fn result_of(response: reqwest::Response, what: &str) -> StoreResult<Value> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http(format!("{what} returned {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("{what} invalid JSON: {e}")))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(StoreError::Http(format!("{what} failed: {error}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| StoreError::InvalidResponse(format!("{what} missing result")))
    }
}

impl DurableBackend for RestKvBackend {
    fn name(&self) -> &'static str {
        "rest_kv"
    }

    async fn load(&self, key: &str) -> StoreResult<Option<WalletState>> {
        let response = self
            .http
            .get(self.command_url("get", key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("GET {key} failed: {e}")))?;

        match Self::result_of(response, "GET").await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            object @ Value::Object(_) => Ok(Some(serde_json::from_value(object)?)),
            other => Err(StoreError::InvalidResponse(format!(
                "unexpected wallet value: {other}"
            ))),
        }
    }

    async fn save(&self, key: &str, state: &WalletState) -> StoreResult<()> {
        let body = serde_json::to_string(state)?;
        let response = self
            .http
            .post(self.command_url("set", key))
            .bearer_auth(&self.token)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("SET {key} failed: {e}")))?;

        Self::result_of(response, "SET").await.map(|_| ())
    }
}
