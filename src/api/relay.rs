// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway relay ingestion.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use url::Url;

use crate::{
    error::{ApiError, ErrorBody},
    models::RelayRequest,
    relay::{RelayCommand, RelayError, RelayOutcome, UpstreamCall},
    state::AppState,
};

/// Relay a command to the upstream API and on to the executor.
///
/// `upstream.body` is required whenever `upstream` is present. A command
/// with no `upstream` but an `executor_payload` skips the upstream call and
/// forwards the payload alone; a command with neither is rejected.
///
/// The caller's bearer is used for the upstream call. The gateway's own API
/// key stands in only when no `upstream.url` override is given.
#[utoipa::path(
    post,
    path = "/v1/relay",
    request_body = RelayRequest,
    tag = "Relay",
    responses(
        (status = 200, description = "Relay completed", body = RelayOutcome),
        (status = 400, description = "Invalid command or executor not configured", body = ErrorBody),
        (status = 401, description = "No bearer credential available", body = ErrorBody),
        (status = 405, description = "Method other than POST", body = ErrorBody),
        (status = 500, description = "Shared secret not configured", body = ErrorBody),
        (status = 502, description = "Upstream failed, or executor failed (body carries the partial outcome)", body = RelayOutcome),
        (status = 504, description = "Relay deadline exceeded", body = ErrorBody)
    )
)]
pub async fn relay(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Response {
    let command = match payload
        .map_err(ApiError::from)
        .and_then(|Json(request)| into_command(request, bearer_token(&headers)))
    {
        Ok(command) => command,
        Err(e) => return e.into_response(),
    };

    match state.relay.relay(command).await {
        Ok(outcome) => Json(outcome).into_response(),
        // Partial success stays visible to the caller.
        Err(RelayError::Executor { outcome, .. }) => {
            (StatusCode::BAD_GATEWAY, Json(*outcome)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Answer for any method other than POST on the relay route.
pub async fn relay_method_not_allowed() -> impl IntoResponse {
    (
        [(header::ALLOW, "POST")],
        ApiError::method_not_allowed("Method not allowed. Use POST."),
    )
}

fn into_command(request: RelayRequest, bearer: Option<String>) -> Result<RelayCommand, ApiError> {
    let upstream = match request.upstream {
        Some(spec) => {
            let body = match spec.body {
                Some(body @ Value::Object(_)) => body,
                Some(_) => return Err(ApiError::bad_request("upstream.body must be a JSON object")),
                None => return Err(ApiError::bad_request("Missing upstream.body")),
            };
            let url = spec
                .url
                .map(|raw| parse_upstream_url(raw.trim()))
                .transpose()?;
            Some(UpstreamCall { url, body })
        }
        None if request.executor_payload.is_none() => {
            return Err(ApiError::bad_request("Missing upstream.body"));
        }
        None => None,
    };

    Ok(RelayCommand {
        upstream,
        forward_to_executor: request.forward_to_executor,
        executor_payload: request.executor_payload.unwrap_or_default(),
        bearer,
    })
}

fn parse_upstream_url(raw: &str) -> Result<Url, ApiError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ApiError::bad_request("upstream.url must be an http(s) URL")),
    }
}

/// Caller's bearer credential from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
