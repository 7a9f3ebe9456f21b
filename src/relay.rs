// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Forwarder
//!
//! One relay call runs these steps in a fixed order:
//!
//! 1. decide whether to forward (on by default when an executor is configured),
//! 2. call the upstream completion API, if the command includes one,
//! 3. merge the upstream outcome into the caller's executor payload,
//! 4. sign the payload and deliver it to the executor.
//!
//! The executor always sees the real upstream outcome, so step 2 must finish
//! before step 4 starts. Nothing is retried. The whole call runs under one
//! deadline; dropping the future cancels whichever request is in flight.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

use crate::envelope::{EnvelopeError, SignedEnvelope};
use crate::providers::{ExecutorClient, ProviderError, ProviderResponse, ResponseBody, UpstreamClient};

/// Payload key carrying the upstream HTTP status.
pub const UPSTREAM_STATUS_KEY: &str = "openmind_status";
/// Payload key carrying the upstream response body.
pub const UPSTREAM_RESPONSE_KEY: &str = "openmind_response";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing bearer token for the upstream API")]
    MissingCredential,

    #[error("Forwarding requested but EXECUTOR_URL is not configured")]
    ExecutorNotConfigured,

    #[error("EXECUTOR_SHARED_SECRET is not configured")]
    MissingSecret,

    #[error("Upstream call failed: {0}")]
    Upstream(#[source] ProviderError),

    /// The upstream call succeeded but delivery did not. `outcome` holds the
    /// partial result with `executor_error` set.
    #[error("Executor delivery failed: {source}")]
    Executor {
        outcome: Box<RelayOutcome>,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to sign executor payload: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Relay did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Upstream call requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamCall {
    /// Overrides the configured completion URL.
    pub url: Option<Url>,
    pub body: Value,
}

/// A validated relay command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelayCommand {
    pub upstream: Option<UpstreamCall>,
    pub forward_to_executor: Option<bool>,
    pub executor_payload: Map<String, Value>,
    /// Caller's bearer credential, passed through and never stored.
    pub bearer: Option<String>,
}

/// Composite relay result.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RelayOutcome {
    pub upstream_status: Option<u16>,
    #[schema(value_type = Object)]
    pub upstream_response: Option<ResponseBody>,
    pub executor_forwarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub executor_response: Option<ResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor_error: Option<String>,
}

/// Relay timing limits.
#[derive(Debug, Clone, Copy)]
pub struct RelayTimeouts {
    pub upstream: Duration,
    pub executor: Duration,
    pub deadline: Duration,
}

impl Default for RelayTimeouts {
    fn default() -> Self {
        Self {
            upstream: Duration::from_secs(60),
            executor: Duration::from_secs(15),
            deadline: Duration::from_secs(90),
        }
    }
}

pub struct RelayForwarder {
    upstream: UpstreamClient,
    executor: Option<ExecutorClient>,
    shared_secret: Option<String>,
    fallback_api_key: Option<String>,
    deadline: Duration,
}

impl RelayForwarder {
    pub fn new(
        upstream: UpstreamClient,
        executor: Option<ExecutorClient>,
        shared_secret: Option<String>,
        fallback_api_key: Option<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            upstream,
            executor,
            shared_secret: shared_secret.filter(|s| !s.is_empty()),
            fallback_api_key: fallback_api_key.filter(|s| !s.is_empty()),
            deadline,
        }
    }

    pub fn executor_configured(&self) -> bool {
        self.executor.is_some()
    }

    /// Run one relay call under the request deadline.
    pub async fn relay(&self, command: RelayCommand) -> Result<RelayOutcome, RelayError> {
        match tokio::time::timeout(self.deadline, self.run(command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_secs = self.deadline.as_secs(), "Relay deadline exceeded");
                Err(RelayError::DeadlineExceeded(self.deadline))
            }
        }
    }

    async fn run(&self, command: RelayCommand) -> Result<RelayOutcome, RelayError> {
        let forward = command
            .forward_to_executor
            .unwrap_or(self.executor.is_some());

        // Reject misconfiguration before spending an upstream call.
        let delivery = if forward {
            let executor = self
                .executor
                .as_ref()
                .ok_or(RelayError::ExecutorNotConfigured)?;
            let secret = self
                .shared_secret
                .as_deref()
                .ok_or(RelayError::MissingSecret)?;
            Some((executor, secret))
        } else {
            None
        };

        let upstream = match &command.upstream {
            Some(call) => {
                let caller = command.bearer.as_deref().filter(|b| !b.is_empty());
                // The gateway's own key only ever goes to the configured upstream.
                let fallback = match call.url {
                    None => self.fallback_api_key.as_deref(),
                    Some(_) => None,
                };
                let bearer = caller.or(fallback).ok_or(RelayError::MissingCredential)?;
                let response = self
                    .upstream
                    .complete(call.url.as_ref(), bearer, &call.body)
                    .await
                    .map_err(RelayError::Upstream)?;
                Some(response)
            }
            None => None,
        };

        let mut outcome = RelayOutcome {
            upstream_status: upstream.as_ref().map(|r| r.status),
            upstream_response: upstream.as_ref().map(|r| r.body.clone()),
            executor_forwarded: false,
            executor_status: None,
            executor_response: None,
            executor_error: None,
        };

        let Some((executor, secret)) = delivery else {
            return Ok(outcome);
        };

        let payload = executor_payload(command.executor_payload, upstream.as_ref());
        let envelope = SignedEnvelope::build(secret, &payload)?;

        match executor.deliver(&envelope).await {
            Ok(response) => {
                info!(
                    executor_status = response.status,
                    upstream_status = ?outcome.upstream_status,
                    "Relay forwarded to executor"
                );
                outcome.executor_forwarded = true;
                outcome.executor_status = Some(response.status);
                outcome.executor_response = Some(response.body);
                Ok(outcome)
            }
            Err(source) => {
                outcome.executor_error = Some(source.to_string());
                Err(RelayError::Executor {
                    outcome: Box::new(outcome),
                    source,
                })
            }
        }
    }
}

/// Caller fields first, then the upstream outcome. Upstream keys win.
pub fn executor_payload(
    mut extra: Map<String, Value>,
    upstream: Option<&ProviderResponse>,
) -> Value {
    if let Some(response) = upstream {
        extra.insert(UPSTREAM_STATUS_KEY.to_string(), Value::from(response.status));
        extra.insert(UPSTREAM_RESPONSE_KEY.to_string(), response.body.to_value());
    }
    Value::Object(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::envelope::{EnvelopeVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

    const SECRET: &str = "relay-secret";

    async fn spawn(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    /// Upstream that echoes the bearer it received.
    async fn mock_upstream() -> Url {
        let app = Router::new().route(
            "/chat",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({ "reply": "hello", "auth": auth, "model": body["model"] }))
            }),
        );
        spawn(app).await.join("chat").unwrap()
    }

    /// Executor that verifies envelopes and records accepted payloads.
    async fn mock_executor() -> (Url, Arc<Mutex<Vec<Value>>>) {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let verifier = Arc::new(EnvelopeVerifier::new(SECRET, Duration::from_secs(300)));
        let sink = received.clone();
        let app = Router::new().route(
            "/execute",
            post(move |headers: HeaderMap, body: Bytes| {
                let sink = sink.clone();
                let verifier = verifier.clone();
                async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    let payload = String::from_utf8(body.to_vec()).unwrap();
                    if verifier
                        .verify(&header(TIMESTAMP_HEADER), &payload, &header(SIGNATURE_HEADER))
                        .is_err()
                    {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad"})));
                    }
                    let value: Value = serde_json::from_str(&payload).unwrap();
                    sink.lock().await.push(value);
                    (StatusCode::OK, Json(json!({"accepted": true})))
                }
            }),
        );
        (spawn(app).await, received)
    }

    fn forwarder(upstream: &Url, executor: Option<&Url>, secret: Option<&str>) -> RelayForwarder {
        let timeouts = RelayTimeouts::default();
        RelayForwarder::new(
            UpstreamClient::new(upstream.clone(), timeouts.upstream).unwrap(),
            executor.map(|url| ExecutorClient::new(url, timeouts.executor).unwrap()),
            secret.map(str::to_string),
            None,
            timeouts.deadline,
        )
    }

    fn command(bearer: Option<&str>) -> RelayCommand {
        RelayCommand {
            upstream: Some(UpstreamCall {
                url: None,
                body: json!({"model": "gpt-4.1-mini"}),
            }),
            bearer: bearer.map(str::to_string),
            ..RelayCommand::default()
        }
    }

    #[tokio::test]
    async fn relays_upstream_outcome_to_executor() {
        let upstream = mock_upstream().await;
        let (executor, received) = mock_executor().await;
        let relay = forwarder(&upstream, Some(&executor), Some(SECRET));

        let mut cmd = command(Some("caller-key"));
        cmd.executor_payload = json!({"robot": "r1", "openmind_status": 999})
            .as_object()
            .cloned()
            .unwrap();

        let outcome = relay.relay(cmd).await.unwrap();
        assert_eq!(outcome.upstream_status, Some(200));
        assert!(outcome.executor_forwarded);
        assert_eq!(outcome.executor_status, Some(200));
        assert_eq!(
            outcome.executor_response,
            Some(ResponseBody::Structured(json!({"accepted": true})))
        );

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["robot"], json!("r1"));
        assert_eq!(received[0][UPSTREAM_STATUS_KEY], json!(200));
        assert_eq!(received[0][UPSTREAM_RESPONSE_KEY]["auth"], json!("Bearer caller-key"));
    }

    #[tokio::test]
    async fn forwarding_can_be_disabled_by_caller() {
        let upstream = mock_upstream().await;
        let (executor, received) = mock_executor().await;
        let relay = forwarder(&upstream, Some(&executor), Some(SECRET));

        let mut cmd = command(Some("k"));
        cmd.forward_to_executor = Some(false);
        let outcome = relay.relay(cmd).await.unwrap();

        assert!(!outcome.executor_forwarded);
        assert_eq!(outcome.executor_status, None);
        assert!(received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn no_executor_means_no_forwarding_by_default() {
        let upstream = mock_upstream().await;
        let relay = forwarder(&upstream, None, None);
        let outcome = relay.relay(command(Some("k"))).await.unwrap();
        assert!(!outcome.executor_forwarded);
        assert_eq!(outcome.upstream_status, Some(200));
    }

    #[tokio::test]
    async fn explicit_forward_without_executor_is_rejected() {
        let upstream = mock_upstream().await;
        let relay = forwarder(&upstream, None, Some(SECRET));
        let mut cmd = command(Some("k"));
        cmd.forward_to_executor = Some(true);
        assert!(matches!(
            relay.relay(cmd).await,
            Err(RelayError::ExecutorNotConfigured)
        ));
    }

    #[tokio::test]
    async fn forwarding_without_secret_is_rejected() {
        let upstream = mock_upstream().await;
        let (executor, _) = mock_executor().await;
        let relay = forwarder(&upstream, Some(&executor), Some(""));
        assert!(matches!(
            relay.relay(command(Some("k"))).await,
            Err(RelayError::MissingSecret)
        ));
    }

    #[tokio::test]
    async fn missing_bearer_uses_fallback_key_or_fails() {
        let upstream = mock_upstream().await;
        let relay = forwarder(&upstream, None, None);
        assert!(matches!(
            relay.relay(command(None)).await,
            Err(RelayError::MissingCredential)
        ));

        let with_key = RelayForwarder::new(
            UpstreamClient::new(upstream.clone(), Duration::from_secs(5)).unwrap(),
            None,
            None,
            Some("server-key".to_string()),
            Duration::from_secs(10),
        );
        let outcome = with_key.relay(command(None)).await.unwrap();
        let body = outcome.upstream_response.unwrap();
        assert_eq!(
            body.as_structured().unwrap()["auth"],
            json!("Bearer server-key")
        );
    }

    #[tokio::test]
    async fn fallback_key_is_never_sent_to_caller_chosen_url() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = seen.clone();
        let other_host = spawn(Router::new().route(
            "/collect",
            post(move |headers: HeaderMap| {
                let sink = sink.clone();
                async move {
                    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        sink.lock().await.push(auth.to_string());
                    }
                    Json(json!({"ok": true}))
                }
            }),
        ))
        .await
        .join("collect")
        .unwrap();

        let upstream = mock_upstream().await;
        let relay = RelayForwarder::new(
            UpstreamClient::new(upstream, Duration::from_secs(5)).unwrap(),
            None,
            None,
            Some("server-key".to_string()),
            Duration::from_secs(10),
        );

        let mut cmd = command(None);
        cmd.upstream = Some(UpstreamCall {
            url: Some(other_host.clone()),
            body: json!({}),
        });
        assert!(matches!(
            relay.relay(cmd).await,
            Err(RelayError::MissingCredential)
        ));
        assert!(seen.lock().await.is_empty());

        // The caller's own credential may go anywhere it chooses.
        let mut cmd = command(Some("caller-key"));
        cmd.upstream = Some(UpstreamCall {
            url: Some(other_host),
            body: json!({}),
        });
        relay.relay(cmd).await.unwrap();
        assert_eq!(*seen.lock().await, vec!["Bearer caller-key".to_string()]);
    }

    #[tokio::test]
    async fn executor_failure_keeps_upstream_outcome() {
        let upstream = mock_upstream().await;
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let relay = forwarder(&upstream, Some(&dead), Some(SECRET));
        match relay.relay(command(Some("k"))).await {
            Err(RelayError::Executor { outcome, .. }) => {
                assert_eq!(outcome.upstream_status, Some(200));
                assert!(!outcome.executor_forwarded);
                assert!(outcome.executor_error.is_some());
            }
            other => panic!("expected executor error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_transport_failure_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = Url::parse(&format!("http://{}/chat", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let relay = forwarder(&dead, None, None);
        assert!(matches!(
            relay.relay(command(Some("k"))).await,
            Err(RelayError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn deadline_bounds_the_whole_call() {
        let app = Router::new().route(
            "/chat",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let upstream = spawn(app).await.join("chat").unwrap();
        let relay = RelayForwarder::new(
            UpstreamClient::new(upstream, Duration::from_secs(30)).unwrap(),
            None,
            None,
            None,
            Duration::from_millis(100),
        );
        assert!(matches!(
            relay.relay(command(Some("k"))).await,
            Err(RelayError::DeadlineExceeded(_))
        ));
    }

    #[tokio::test]
    async fn payload_only_command_skips_upstream() {
        let upstream = mock_upstream().await;
        let (executor, received) = mock_executor().await;
        let relay = forwarder(&upstream, Some(&executor), Some(SECRET));

        let cmd = RelayCommand {
            executor_payload: json!({"action": "wave"}).as_object().cloned().unwrap(),
            ..RelayCommand::default()
        };
        let outcome = relay.relay(cmd).await.unwrap();
        assert_eq!(outcome.upstream_status, None);
        assert!(outcome.executor_forwarded);
        assert_eq!(received.lock().await[0], json!({"action": "wave"}));
    }

    #[test]
    fn upstream_keys_override_caller_fields() {
        let extra = json!({"openmind_response": "mine", "keep": 1})
            .as_object()
            .cloned()
            .unwrap();
        let response = ProviderResponse {
            status: 201,
            body: ResponseBody::Raw("plain".to_string()),
        };
        let payload = executor_payload(extra, Some(&response));
        assert_eq!(
            payload,
            json!({"keep": 1, "openmind_status": 201, "openmind_response": {"raw": "plain"}})
        );
    }
}
