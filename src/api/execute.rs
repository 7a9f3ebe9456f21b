// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Executor ingestion of signed envelopes.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    envelope::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
    error::{ApiError, ErrorBody},
    models::ExecuteResponse,
    relay::{UPSTREAM_RESPONSE_KEY, UPSTREAM_STATUS_KEY},
    state::AppState,
};

const EXECUTE_NOTE: &str = "Sandbox executor: actions are acknowledged, not executed.";

/// Verify a signed envelope and acknowledge it.
///
/// Checks run in a fixed order: secret configured, headers present, UTF-8
/// body, signature, freshness and replay, then JSON.
#[utoipa::path(
    post,
    path = "/execute",
    tag = "Executor",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Signed JSON payload, verified byte for byte"
    ),
    params(
        ("x-om-timestamp" = String, Header, description = "RFC 3339 signing time"),
        ("x-om-signature" = String, Header, description = "Hex HMAC-SHA256 of `timestamp.payload`")
    ),
    responses(
        (status = 200, description = "Envelope accepted", body = ExecuteResponse),
        (status = 400, description = "Body is not UTF-8 JSON", body = ErrorBody),
        (status = 401, description = "Missing headers, bad signature, stale or replayed", body = ErrorBody),
        (status = 500, description = "Shared secret not configured", body = ErrorBody),
        (status = 503, description = "Too many live envelopes to track replays", body = ErrorBody)
    )
)]
pub async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Some(verifier) = state.verifier.as_ref() else {
        return Err(ApiError::internal(
            "EXECUTOR_SHARED_SECRET is not set on executor.",
        ));
    };

    let (Some(timestamp), Some(signature)) = (
        header_str(&headers, TIMESTAMP_HEADER),
        header_str(&headers, SIGNATURE_HEADER),
    ) else {
        return Err(ApiError::unauthorized("Missing signature headers."));
    };

    let payload = std::str::from_utf8(&body)
        .map_err(|_| ApiError::bad_request("Body must be UTF-8 JSON."))?;

    if let Err(e) = verifier.verify(timestamp, payload, signature) {
        warn!(error = %e, "Rejected envelope");
        return Err(e.into());
    }

    let payload: Value = serde_json::from_str(payload)
        .map_err(|_| ApiError::bad_request("Invalid JSON body."))?;

    let openmind_status = payload.get(UPSTREAM_STATUS_KEY).cloned().unwrap_or(Value::Null);
    let preview = payload
        .get(UPSTREAM_RESPONSE_KEY)
        .cloned()
        .unwrap_or(Value::Null);
    info!(%timestamp, openmind_status = %openmind_status, "Envelope accepted");

    Ok(Json(ExecuteResponse {
        accepted: true,
        openmind_status,
        note: EXECUTE_NOTE.to_string(),
        openmind_response_preview: preview,
    }))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
