// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorBody,
    ledger::{Payment, StorageBackend, WalletSummary},
    models::{
        AuthorizeRequest, AuthorizeResponse, ExecuteResponse, FaucetRequest, FaucetResponse,
        PayRequest, PayResponse, PaymentsResponse, RelayRequest, StatusResponse, UpstreamSpec,
    },
    relay::RelayOutcome,
    state::AppState,
};

pub mod execute;
pub mod health;
pub mod ledger;
pub mod relay;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let sandbox_routes = Router::new()
        .route("/status", get(ledger::wallet_status))
        .route("/authorize", post(ledger::authorize_wallet))
        .route("/faucet", post(ledger::faucet_wallet))
        .route("/pay", post(ledger::pay_wallet))
        .route("/payments", get(ledger::list_payments))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let v1_routes = Router::new()
        .route(
            "/relay",
            post(relay::relay).fallback(relay::relay_method_not_allowed),
        )
        .nest("/sandbox/wallet", sandbox_routes);

    Router::new()
        .nest("/v1", v1_routes)
        .route("/execute", post(execute::execute))
        .route("/healthz", get(health::healthz))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        relay::relay,
        execute::execute,
        ledger::wallet_status,
        ledger::authorize_wallet,
        ledger::faucet_wallet,
        ledger::pay_wallet,
        ledger::list_payments,
        health::healthz,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RelayRequest,
            UpstreamSpec,
            RelayOutcome,
            ExecuteResponse,
            AuthorizeRequest,
            FaucetRequest,
            PayRequest,
            StatusResponse,
            AuthorizeResponse,
            FaucetResponse,
            PayResponse,
            PaymentsResponse,
            Payment,
            WalletSummary,
            StorageBackend,
            ErrorBody
        )
    ),
    tags(
        (name = "Relay", description = "Gateway relay to the private executor"),
        (name = "Executor", description = "Signed envelope ingestion"),
        (name = "Sandbox Wallet", description = "Simulated wallet ledger"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
