// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::storage::StoreError;

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Durable ledger backend: "ok", "unavailable", or "not_configured"
    /// (ledger runs on the volatile tier only).
    pub ledger_storage: String,
    /// Name of the durable ledger backend.
    pub ledger_backend: String,
    /// Whether relay calls forward to an executor.
    pub executor_forwarding: bool,
    /// Whether `/execute` can verify envelopes.
    pub envelope_verification: bool,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
}

async fn check_ledger_storage(state: &AppState) -> &'static str {
    match state.ledger.probe_durable().await {
        Ok(()) => "ok",
        Err(StoreError::NotConfigured) => "not_configured",
        Err(_) => "unavailable",
    }
}

/// Minimal health check.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn healthz() -> Json<HealthResponse> {
    liveness().await
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 503 when a configured durable ledger backend cannot be reached.
/// Ledger requests still succeed on the volatile tier in that case, but
/// nothing they write survives a restart.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Durable storage is unreachable", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let ledger_storage = check_ledger_storage(&state).await;
    let all_ok = ledger_storage != "unavailable";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            ledger_storage: ledger_storage.to_string(),
            ledger_backend: state.ledger.durable_name().to_string(),
            executor_forwarding: state.relay.executor_configured(),
            envelope_verification: state.verifier.is_some(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
