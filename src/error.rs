// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::envelope::EnvelopeError;
use crate::ledger::LedgerError;
use crate::relay::RelayError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Machine-readable code for errors callers branch on.
    pub code: Option<&'static str>,
}

/// JSON error body: `{"error": "...", "error_code": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.map(str::to_string),
        });
        (self.status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match err {
            LedgerError::AuthorizationDisabled => StatusCode::FORBIDDEN,
            LedgerError::MissingRecipient
            | LedgerError::InvalidAmount(_)
            | LedgerError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, err.to_string()).with_code(err.code())
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::MissingSecret => {
                ApiError::internal("EXECUTOR_SHARED_SECRET is not set on executor.")
            }
            EnvelopeError::Serialize(e) => {
                error!(error = %e, "Envelope serialization failed");
                ApiError::internal("Failed to serialize payload.")
            }
            EnvelopeError::InvalidSignature => ApiError::unauthorized("Invalid signature.")
                .with_code("invalid_signature"),
            EnvelopeError::MalformedTimestamp(_) => {
                ApiError::unauthorized(err.to_string()).with_code("malformed_timestamp")
            }
            EnvelopeError::Stale { .. } | EnvelopeError::FutureDated { .. } => {
                ApiError::unauthorized(err.to_string()).with_code("stale_envelope")
            }
            EnvelopeError::Replayed => {
                ApiError::unauthorized(err.to_string()).with_code("replayed_envelope")
            }
            EnvelopeError::ReplayCapacity => {
                warn!("Replay guard is full of live envelopes; refusing delivery");
                ApiError::service_unavailable(err.to_string()).with_code("replay_capacity")
            }
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingCredential => ApiError::unauthorized(err.to_string()),
            RelayError::ExecutorNotConfigured => ApiError::bad_request(err.to_string()),
            RelayError::MissingSecret => ApiError::internal(err.to_string()),
            RelayError::Envelope(e) => ApiError::from(e),
            RelayError::Upstream(_) | RelayError::Executor { .. } => {
                ApiError::bad_gateway(err.to_string())
            }
            RelayError::DeadlineExceeded(_) => ApiError::gateway_timeout(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text()).with_code("invalid_body")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text()).with_code("invalid_query")
    }
}
