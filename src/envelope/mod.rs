// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signed Relay Envelopes
//!
//! Commands crossing from the public gateway to the private executor travel
//! in a [`SignedEnvelope`]:
//!
//! ```text
//! POST /execute
//! x-om-timestamp: 2026-01-15T10:00:00.000Z
//! x-om-signature: hex(HMAC_SHA256(secret, timestamp + "." + body))
//!
//! <body: canonical JSON payload, byte-for-byte what was signed>
//! ```
//!
//! The receiver verifies against the raw body it received. It never
//! re-serializes, because any difference in key order or whitespace would
//! invalidate every signature.
//!
//! [`EnvelopeVerifier`] checks three things, in order:
//! 1. the signature matches (constant-time),
//! 2. the timestamp lies within the freshness window in either direction,
//! 3. the signature has not already been accepted inside that window.

pub mod replay;
pub mod signature;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub use replay::{ReplayGuard, ReplayRejection, DEFAULT_REPLAY_CAPACITY};
pub use signature::{sign, verify};

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-om-timestamp";

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-om-signature";

/// Default freshness window in seconds.
pub const DEFAULT_MAX_SKEW_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("shared secret is not configured")]
    MissingSecret,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("envelope is stale ({age_secs}s old, window is {window_secs}s)")]
    Stale { age_secs: i64, window_secs: u64 },

    #[error("envelope timestamp is {ahead_secs}s in the future (window is {window_secs}s)")]
    FutureDated { ahead_secs: i64, window_secs: u64 },

    #[error("envelope has already been accepted")]
    Replayed,

    #[error("too many envelopes accepted within the freshness window")]
    ReplayCapacity,

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A timestamped, signed payload ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub timestamp: String,
    pub payload: String,
    pub signature: String,
}

impl SignedEnvelope {
    /// Serialize `payload` and sign it with the current time.
    pub fn build<T: Serialize + ?Sized>(secret: &str, payload: &T) -> Result<Self, EnvelopeError> {
        Self::build_at(secret, payload, Utc::now())
    }

    /// Serialize `payload` and sign it as of `now`.
    pub fn build_at<T: Serialize + ?Sized>(
        secret: &str,
        payload: &T,
        now: DateTime<Utc>,
    ) -> Result<Self, EnvelopeError> {
        if secret.is_empty() {
            return Err(EnvelopeError::MissingSecret);
        }
        let timestamp = format_timestamp(now);
        let payload = serde_json::to_string(payload)?;
        let signature = sign(secret, &timestamp, &payload);
        Ok(Self {
            timestamp,
            payload,
            signature,
        })
    }
}

/// Canonical envelope timestamp: RFC 3339, UTC, millisecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Receiver-side verification with freshness and replay protection.
pub struct EnvelopeVerifier {
    secret: String,
    max_skew_secs: u64,
    replay: ReplayGuard,
}

impl EnvelopeVerifier {
    pub fn new(secret: impl Into<String>, max_skew: Duration) -> Self {
        Self::with_replay_capacity(secret, max_skew, DEFAULT_REPLAY_CAPACITY)
    }

    /// Like [`EnvelopeVerifier::new`], remembering at most `capacity` live
    /// signatures. Deliveries beyond that are refused until entries expire.
    pub fn with_replay_capacity(
        secret: impl Into<String>,
        max_skew: Duration,
        capacity: usize,
    ) -> Self {
        let max_skew_secs = max_skew.as_secs();
        Self {
            secret: secret.into(),
            max_skew_secs,
            // Twice the window covers both past and future skew.
            replay: ReplayGuard::new(
                capacity,
                Duration::from_secs(max_skew_secs.saturating_mul(2).max(1)),
            ),
        }
    }

    pub fn max_skew_secs(&self) -> u64 {
        self.max_skew_secs
    }

    /// Verify an envelope received now.
    pub fn verify(
        &self,
        timestamp: &str,
        payload: &str,
        signature: &str,
    ) -> Result<(), EnvelopeError> {
        self.verify_at(timestamp, payload, signature, Utc::now())
    }

    /// Verify an envelope as if received at `now`.
    pub fn verify_at(
        &self,
        timestamp: &str,
        payload: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EnvelopeError> {
        if self.secret.is_empty() {
            return Err(EnvelopeError::MissingSecret);
        }
        if !verify(&self.secret, timestamp, payload, signature) {
            return Err(EnvelopeError::InvalidSignature);
        }

        let signed_at = DateTime::parse_from_rfc3339(timestamp.trim())
            .map_err(|e| EnvelopeError::MalformedTimestamp(e.to_string()))?
            .with_timezone(&Utc);
        check_freshness(signed_at, now, self.max_skew_secs)?;

        self.replay
            .check_and_record(signature)
            .map_err(|rejection| match rejection {
                ReplayRejection::Replayed => EnvelopeError::Replayed,
                ReplayRejection::Saturated => EnvelopeError::ReplayCapacity,
            })
    }
}

fn check_freshness(
    signed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window_secs: u64,
) -> Result<(), EnvelopeError> {
    let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
    let age_secs = now.signed_duration_since(signed_at).num_seconds();
    if age_secs > window {
        return Err(EnvelopeError::Stale {
            age_secs,
            window_secs,
        });
    }
    if -age_secs > window {
        return Err(EnvelopeError::FutureDated {
            ahead_secs: -age_secs,
            window_secs,
        });
    }
    Ok(())
}
