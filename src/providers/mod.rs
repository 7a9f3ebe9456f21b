// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound HTTP clients.
//!
//! - [`upstream`] - third-party chat completion API
//! - [`executor`] - signed delivery to the private executor
//!
//! Neither client retries. Every call is bounded by the client timeout.

pub mod executor;
pub mod response;
pub mod upstream;

pub use executor::ExecutorClient;
pub use response::{ProviderResponse, ResponseBody};
pub use upstream::{UpstreamClient, DEFAULT_UPSTREAM_URL};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error("request to {target} failed: {message}")]
    Request { target: String, message: String },

    #[error("request to {target} timed out")]
    Timeout { target: String },
}

impl ProviderError {
    pub(crate) fn from_reqwest(target: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout {
                target: target.to_string(),
            }
        } else {
            ProviderError::Request {
                target: target.to_string(),
                message: error.to_string(),
            }
        }
    }
}

pub(crate) fn build_http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))
}
