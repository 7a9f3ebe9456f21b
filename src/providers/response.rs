// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Response bodies from systems we do not control.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// A peer's response body: parsed JSON when possible, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Structured(Value),
    Raw(String),
}

impl ResponseBody {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Structured(value),
            Err(_) => ResponseBody::Raw(text),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            ResponseBody::Structured(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// JSON form used in payloads and responses. Raw text becomes `{"raw": text}`.
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Structured(value) => value.clone(),
            ResponseBody::Raw(text) => json!({ "raw": text }),
        }
    }
}

impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseBody::Structured(value) => value.serialize(serializer),
            ResponseBody::Raw(text) => json!({ "raw": text }).serialize(serializer),
        }
    }
}

/// Status and body of one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ProviderResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(Self {
            status,
            body: ResponseBody::from_text(text),
        })
    }
}
