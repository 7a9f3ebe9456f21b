// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chat completion client (OpenAI-compatible endpoint).

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{build_http_client, ProviderError, ProviderResponse};

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openmind.org/api/core/openai/chat/completions";

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    default_url: Url,
    http: Client,
}

impl UpstreamClient {
    pub fn new(default_url: Url, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            default_url,
            http: build_http_client(timeout)?,
        })
    }

    pub fn default_url(&self) -> &Url {
        &self.default_url
    }

    /// POST `body` as JSON to `url` (or the default URL) with a bearer token.
    pub async fn complete(
        &self,
        url: Option<&Url>,
        bearer: &str,
        body: &Value,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = url.unwrap_or(&self.default_url);
        let host = url.host_str().unwrap_or("upstream").to_string();

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(host = %host, error = %e, "Upstream request failed");
                ProviderError::from_reqwest(&host, e)
            })?;

        let outcome = ProviderResponse::read(response)
            .await
            .map_err(|e| ProviderError::from_reqwest(&host, e))?;
        debug!(host = %host, status = outcome.status, "Upstream responded");
        Ok(outcome)
    }
}
