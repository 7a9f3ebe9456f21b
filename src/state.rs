// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::envelope::EnvelopeVerifier;
use crate::providers::{ExecutorClient, ProviderError, UpstreamClient};
use crate::relay::RelayForwarder;
use crate::storage::LedgerStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<LedgerStore>,
    pub relay: Arc<RelayForwarder>,
    /// Present only when `EXECUTOR_SHARED_SECRET` is set.
    pub verifier: Option<Arc<EnvelopeVerifier>>,
}

impl AppState {
    pub fn new(config: AppConfig, ledger: LedgerStore) -> Result<Self, ProviderError> {
        let upstream = UpstreamClient::new(config.upstream_url.clone(), config.timeouts.upstream)?;
        let executor = config
            .executor_url
            .as_ref()
            .map(|url| ExecutorClient::new(url, config.timeouts.executor))
            .transpose()?;
        let relay = RelayForwarder::new(
            upstream,
            executor,
            config.shared_secret.clone(),
            config.api_key.clone(),
            config.timeouts.deadline,
        );
        let verifier = config
            .shared_secret
            .as_ref()
            .map(|secret| Arc::new(EnvelopeVerifier::new(secret.clone(), config.max_skew)));

        Ok(Self {
            config: Arc::new(config),
            ledger: Arc::new(ledger),
            relay: Arc::new(relay),
            verifier,
        })
    }
}
