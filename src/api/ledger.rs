// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sandbox wallet endpoints.
//!
//! Every mutation is one [`LedgerStore::transact`] call: load, apply a single
//! pure transition, persist. Responses report which storage tier took the
//! write.
//!
//! [`LedgerStore::transact`]: crate::storage::LedgerStore::transact

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use tracing::info;

use crate::{
    error::{ApiError, ErrorBody},
    ledger::{self, LedgerError, PayCommand, MAX_PAYMENT_HISTORY},
    models::{
        AuthorizeRequest, AuthorizeResponse, FaucetRequest, FaucetResponse, PayRequest,
        PayResponse, PaymentsQuery, PaymentsResponse, StatusResponse,
    },
    state::AppState,
    storage::DEFAULT_WALLET_KEY,
};

const DEFAULT_PAYMENTS_LIMIT: usize = 50;

#[utoipa::path(
    get,
    path = "/v1/sandbox/wallet/status",
    tag = "Sandbox Wallet",
    responses(
        (status = 200, description = "Wallet summary", body = StatusResponse),
        (status = 500, description = "Unexpected error", body = ErrorBody)
    )
)]
pub async fn wallet_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (wallet, backend) = state.ledger.snapshot(DEFAULT_WALLET_KEY).await;
    let view = ledger::status_view(&wallet, backend);
    Json(StatusResponse {
        ok: true,
        sandbox: true,
        storage: view.storage,
        wallet: view.wallet,
        payments_count: view.payments_count,
    })
}

#[utoipa::path(
    post,
    path = "/v1/sandbox/wallet/authorize",
    request_body = AuthorizeRequest,
    tag = "Sandbox Wallet",
    responses(
        (status = 200, description = "Authorization updated", body = AuthorizeResponse),
        (status = 400, description = "Missing or invalid `enabled`", body = ErrorBody)
    )
)]
pub async fn authorize_wallet(
    State(state): State<AppState>,
    payload: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let Json(request) = payload?;
    let (auth_enabled, storage) = state
        .ledger
        .transact(DEFAULT_WALLET_KEY, |wallet| {
            let next = ledger::authorize(wallet, request.enabled);
            let enabled = next.auth_enabled;
            Ok::<_, LedgerError>((next, enabled))
        })
        .await?;

    info!(auth_enabled, storage = %storage, "Sandbox wallet authorization updated");
    Ok(Json(AuthorizeResponse {
        ok: true,
        sandbox: true,
        auth_enabled,
        storage,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/sandbox/wallet/faucet",
    request_body = FaucetRequest,
    tag = "Sandbox Wallet",
    responses(
        (status = 200, description = "Balance credited", body = FaucetResponse),
        (status = 400, description = "Invalid amount", body = ErrorBody)
    )
)]
pub async fn faucet_wallet(
    State(state): State<AppState>,
    payload: Result<Json<FaucetRequest>, JsonRejection>,
) -> Result<Json<FaucetResponse>, ApiError> {
    let Json(request) = payload?;
    let amount = request.amount.into_text();
    let (balance, storage) = state
        .ledger
        .transact(DEFAULT_WALLET_KEY, |wallet| {
            ledger::faucet(wallet, &amount).map(|next| {
                let balance = next.balance;
                (next, balance)
            })
        })
        .await?;

    info!(amount = %amount, balance = %balance, storage = %storage, "Sandbox faucet credited");
    Ok(Json(FaucetResponse {
        ok: true,
        sandbox: true,
        balance,
        storage,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/sandbox/wallet/pay",
    request_body = PayRequest,
    tag = "Sandbox Wallet",
    responses(
        (status = 200, description = "Payment recorded", body = PayResponse),
        (status = 400, description = "Invalid payment or insufficient balance", body = ErrorBody),
        (status = 403, description = "Wallet is not authorized", body = ErrorBody)
    )
)]
pub async fn pay_wallet(
    State(state): State<AppState>,
    payload: Result<Json<PayRequest>, JsonRejection>,
) -> Result<Json<PayResponse>, ApiError> {
    let Json(request) = payload?;
    let command = PayCommand {
        to: request.to,
        amount: request.amount.into_text(),
        memo: request.memo,
    };
    let ((payment, balance), storage) = state
        .ledger
        .transact(DEFAULT_WALLET_KEY, |wallet| {
            ledger::pay(wallet, &command).map(|(next, payment)| {
                let balance = next.balance;
                (next, (payment, balance))
            })
        })
        .await?;

    info!(
        payment_id = %payment.id,
        to = %payment.to,
        amount = %payment.amount,
        storage = %storage,
        "Sandbox payment recorded"
    );
    Ok(Json(PayResponse {
        ok: true,
        sandbox: true,
        payment,
        balance,
        storage,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/sandbox/wallet/payments",
    params(PaymentsQuery),
    tag = "Sandbox Wallet",
    responses(
        (status = 200, description = "Recent payments, newest first", body = PaymentsResponse),
        (status = 400, description = "Invalid query string", body = ErrorBody)
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<PaymentsQuery>, QueryRejection>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAYMENTS_LIMIT)
        .min(MAX_PAYMENT_HISTORY);
    let (wallet, storage) = state.ledger.snapshot(DEFAULT_WALLET_KEY).await;
    let payments = wallet.payments.iter().rev().take(limit).cloned().collect();

    Ok(Json(PaymentsResponse {
        ok: true,
        sandbox: true,
        storage,
        payments,
        total: wallet.payments.len(),
    }))
}
