// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delivery of signed envelopes to the executor's `/execute` endpoint.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{info, warn};
use url::Url;

use super::{build_http_client, ProviderError, ProviderResponse};
use crate::envelope::{SignedEnvelope, SIGNATURE_HEADER, TIMESTAMP_HEADER};

#[derive(Debug, Clone)]
pub struct ExecutorClient {
    execute_url: Url,
    http: Client,
}

impl ExecutorClient {
    /// `base_url` is the executor root; envelopes go to `{base_url}/execute`.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ProviderError> {
        let execute_url = execute_url(base_url)?;
        Ok(Self {
            execute_url,
            http: build_http_client(timeout)?,
        })
    }

    pub fn execute_url(&self) -> &Url {
        &self.execute_url
    }

    /// Send the envelope. The body is the signed payload, byte for byte.
    pub async fn deliver(&self, envelope: &SignedEnvelope) -> Result<ProviderResponse, ProviderError> {
        let url = self.execute_url.as_str();
        let response = self
            .http
            .post(self.execute_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(TIMESTAMP_HEADER, &envelope.timestamp)
            .header(SIGNATURE_HEADER, &envelope.signature)
            .body(envelope.payload.clone())
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "Executor delivery failed");
                ProviderError::from_reqwest(url, e)
            })?;

        let outcome = ProviderResponse::read(response)
            .await
            .map_err(|e| ProviderError::from_reqwest(url, e))?;
        info!(url, status = outcome.status, "Envelope delivered to executor");
        Ok(outcome)
    }
}

fn execute_url(base_url: &Url) -> Result<Url, ProviderError> {
    let raw = format!("{}/execute", base_url.as_str().trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| ProviderError::Config(format!("invalid executor URL: {e}")))
}
