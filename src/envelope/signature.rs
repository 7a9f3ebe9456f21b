// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HMAC-SHA256 signature codec for relay envelopes.
//!
//! The signed message is always `timestamp + "." + payload`, where `payload`
//! is the exact JSON string carried in the HTTP body. Signatures are encoded
//! as lowercase hex.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 of `data` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], data: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Sign `timestamp + "." + payload`.
pub fn sign(secret: &str, timestamp: &str, payload: &str) -> String {
    hmac_sha256_hex(secret.as_bytes(), signing_input(timestamp, payload).as_bytes())
}

/// Verify a hex signature in constant time.
///
/// Returns `false` for signatures that are not valid hex or have the wrong
/// length; the MAC comparison itself runs in constant time.
pub fn verify(secret: &str, timestamp: &str, payload: &str, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signing_input(timestamp, payload).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

fn signing_input(timestamp: &str, payload: &str) -> String {
    let mut input = String::with_capacity(timestamp.len() + 1 + payload.len());
    input.push_str(timestamp);
    input.push('.');
    input.push_str(payload);
    input
}
