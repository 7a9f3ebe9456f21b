// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pure state transitions for the sandbox wallet.
//!
//! Every function takes a snapshot by reference and returns a new snapshot.
//! Nothing here performs I/O; persistence is the store's job.

use chrono::{DateTime, Utc};

use super::amount::{Amount, AmountError};
use super::model::{
    PayCommand, Payment, StatusView, StorageBackend, WalletState, WalletSummary,
    MAX_PAYMENT_HISTORY,
};

/// Upper bound for a single faucet or payment amount.
pub const MAX_AMOUNT: Amount = Amount::from_units(1_000_000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("payments are disabled until the wallet is authorized")]
    AuthorizationDisabled,

    #[error("recipient is required")]
    MissingRecipient,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: requested {requested}, available {balance}")]
    InsufficientBalance { balance: Amount, requested: Amount },
}

impl LedgerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AuthorizationDisabled => "authorization_disabled",
            LedgerError::MissingRecipient => "missing_recipient",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
        }
    }
}

impl From<AmountError> for LedgerError {
    fn from(e: AmountError) -> Self {
        LedgerError::InvalidAmount(e.to_string())
    }
}

/// Parse a strictly positive amount no larger than [`MAX_AMOUNT`].
pub fn parse_positive_amount(raw: &str) -> Result<Amount, LedgerError> {
    let amount = Amount::parse(raw)?;
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "amount exceeds the sandbox limit of {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

/// Enable or disable outgoing payments.
pub fn authorize(state: &WalletState, enabled: bool) -> WalletState {
    WalletState {
        auth_enabled: enabled,
        ..state.clone()
    }
}

/// Credit the wallet with sandbox funds.
pub fn faucet(state: &WalletState, amount: &str) -> Result<WalletState, LedgerError> {
    let amount = parse_positive_amount(amount)?;
    let balance = state
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidAmount("balance would overflow".to_string()))?;
    Ok(WalletState {
        balance,
        ..state.clone()
    })
}

/// Debit the wallet and record a payment.
pub fn pay(state: &WalletState, command: &PayCommand) -> Result<(WalletState, Payment), LedgerError> {
    pay_at(state, command, Utc::now())
}

pub fn pay_at(
    state: &WalletState,
    command: &PayCommand,
    now: DateTime<Utc>,
) -> Result<(WalletState, Payment), LedgerError> {
    if !state.auth_enabled {
        return Err(LedgerError::AuthorizationDisabled);
    }

    let to = command.to.trim();
    if to.is_empty() {
        return Err(LedgerError::MissingRecipient);
    }

    let amount = parse_positive_amount(&command.amount)?;
    let balance = state
        .balance
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientBalance {
            balance: state.balance,
            requested: amount,
        })?;

    let memo = command
        .memo
        .as_deref()
        .map(str::trim)
        .filter(|memo| !memo.is_empty())
        .map(str::to_string);

    let payment = Payment {
        id: Payment::new_id(now),
        ts: now,
        to: to.to_string(),
        amount,
        memo,
    };

    let mut payments = Vec::with_capacity(state.payments.len() + 1);
    payments.extend_from_slice(&state.payments);
    payments.push(payment.clone());
    if payments.len() > MAX_PAYMENT_HISTORY {
        let excess = payments.len() - MAX_PAYMENT_HISTORY;
        payments.drain(..excess);
    }

    let next = WalletState {
        balance,
        payments,
        ..state.clone()
    };
    Ok((next, payment))
}

/// Project the public summary of a wallet.
pub fn status_view(state: &WalletState, backend: StorageBackend) -> StatusView {
    StatusView {
        wallet: WalletSummary {
            wallet_id: state.wallet_id.clone(),
            balance: state.balance,
            auth_enabled: state.auth_enabled,
        },
        payments_count: state.payments.len(),
        storage: backend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pay_cmd(to: &str, amount: &str) -> PayCommand {
        PayCommand {
            to: to.to_string(),
            amount: amount.to_string(),
            memo: None,
        }
    }

    fn wallet_with_balance(balance: &str) -> WalletState {
        WalletState {
            balance: Amount::parse(balance).unwrap(),
            ..WalletState::fresh()
        }
    }

    #[test]
    fn faucet_then_pay_scenario() {
        let wallet = WalletState::fresh();
        assert_eq!(wallet.balance.to_string(), "100");

        let wallet = authorize(&wallet, true);
        assert!(wallet.auth_enabled);

        let wallet = faucet(&wallet, "50").unwrap();
        assert_eq!(wallet.balance.to_string(), "150");

        let (wallet, payment) = pay(
            &wallet,
            &PayCommand {
                to: "0xabc".to_string(),
                amount: "20".to_string(),
                memo: Some("test".to_string()),
            },
        )
        .unwrap();
        assert_eq!(payment.amount.to_string(), "20");
        assert_eq!(payment.to, "0xabc");
        assert_eq!(payment.memo.as_deref(), Some("test"));
        assert_eq!(wallet.balance.to_string(), "130");
        assert_eq!(wallet.payments, vec![payment]);
    }

    #[test]
    fn pay_without_authorization_fails_and_leaves_balance() {
        let wallet = WalletState::fresh();
        let err = pay(&wallet, &pay_cmd("0xabc", "1")).unwrap_err();
        assert_eq!(err, LedgerError::AuthorizationDisabled);
        assert_eq!(wallet.balance.to_string(), "100");
    }

    #[test]
    fn authorization_gate_precedes_input_validation() {
        let wallet = WalletState::fresh();
        for cmd in [pay_cmd("", "abc"), pay_cmd("x", "-5"), pay_cmd("x", "100000")] {
            assert_eq!(pay(&wallet, &cmd).unwrap_err(), LedgerError::AuthorizationDisabled);
        }
    }

    #[test]
    fn retry_after_authorizing_succeeds() {
        let wallet = WalletState::fresh();
        let cmd = pay_cmd("0xabc", "1");
        assert!(pay(&wallet, &cmd).is_err());
        let wallet = authorize(&wallet, true);
        let (wallet, _) = pay(&wallet, &cmd).unwrap();
        assert_eq!(wallet.balance.to_string(), "99");
    }

    #[test]
    fn insufficient_funds_scenario() {
        let wallet = authorize(&wallet_with_balance("10"), true);
        let err = pay(&wallet, &pay_cmd("x", "20")).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                balance: Amount::from_units(10),
                requested: Amount::from_units(20),
            }
        );
        assert_eq!(err.code(), "insufficient_balance");
        assert_eq!(wallet.balance.to_string(), "10");
    }

    #[test]
    fn paying_entire_balance_reaches_zero() {
        let wallet = authorize(&wallet_with_balance("10.5"), true);
        let (wallet, _) = pay(&wallet, &pay_cmd("x", "10.5")).unwrap();
        assert_eq!(wallet.balance.to_string(), "0");
        assert_eq!(
            pay(&wallet, &pay_cmd("x", "0.000001")).unwrap_err().code(),
            "insufficient_balance"
        );
    }

    #[test]
    fn balance_never_goes_negative_over_many_operations() {
        let mut wallet = authorize(&WalletState::fresh(), true);
        let amounts = ["7.5", "33", "0.25", "60", "12.125", "99", "1"];
        for (i, amount) in amounts.iter().cycle().take(60).enumerate() {
            if i % 5 == 0 {
                wallet = faucet(&wallet, "3.3").unwrap();
            }
            let before = wallet.balance;
            match pay(&wallet, &pay_cmd("sink", amount)) {
                Ok((next, payment)) => {
                    assert_eq!(next.balance.checked_add(payment.amount), Some(before));
                    wallet = next;
                }
                Err(LedgerError::InsufficientBalance { balance, .. }) => {
                    assert_eq!(balance, before);
                }
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn recipient_is_trimmed_and_required() {
        let wallet = authorize(&WalletState::fresh(), true);
        assert_eq!(
            pay(&wallet, &pay_cmd("   ", "1")).unwrap_err(),
            LedgerError::MissingRecipient
        );
        let (_, payment) = pay(&wallet, &pay_cmd("  bob  ", "1")).unwrap();
        assert_eq!(payment.to, "bob");
    }

    #[test]
    fn blank_memo_is_dropped() {
        let wallet = authorize(&WalletState::fresh(), true);
        let cmd = PayCommand {
            memo: Some("  ".to_string()),
            ..pay_cmd("bob", "1")
        };
        let (_, payment) = pay(&wallet, &cmd).unwrap();
        assert_eq!(payment.memo, None);
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let wallet = authorize(&WalletState::fresh(), true);
        for amount in ["0", "-1", "abc", "", "NaN", "1000000.000001", "1e7"] {
            assert_eq!(
                faucet(&wallet, amount).unwrap_err().code(),
                "invalid_amount",
                "faucet {amount}"
            );
            assert_eq!(
                pay(&wallet, &pay_cmd("x", amount)).unwrap_err().code(),
                "invalid_amount",
                "pay {amount}"
            );
        }
        assert!(faucet(&wallet, "1000000").is_ok());
    }

    #[test]
    fn faucet_canonicalizes_balance() {
        let wallet = faucet(&WalletState::fresh(), "0.10").unwrap();
        assert_eq!(wallet.balance.to_string(), "100.1");
        let wallet = faucet(&wallet, "0.9").unwrap();
        assert_eq!(wallet.balance.to_string(), "101");
    }

    #[test]
    fn transitions_do_not_mutate_input() {
        let original = authorize(&WalletState::fresh(), true);
        let snapshot = original.clone();
        let _ = faucet(&original, "5").unwrap();
        let _ = pay(&original, &pay_cmd("x", "5")).unwrap();
        let _ = authorize(&original, false);
        assert_eq!(original, snapshot);
    }

    #[test]
    fn history_keeps_most_recent_two_hundred() {
        let mut wallet = authorize(&faucet(&WalletState::fresh(), "1000").unwrap(), true);
        let mut ids = Vec::new();
        for i in 0..205 {
            let (next, payment) = pay(&wallet, &pay_cmd(&format!("r{i}"), "1")).unwrap();
            ids.push(payment.id);
            wallet = next;
        }
        assert_eq!(wallet.payments.len(), MAX_PAYMENT_HISTORY);
        assert_eq!(wallet.payments[0].to, "r5");
        assert_eq!(wallet.payments[199].to, "r204");
        let kept: Vec<_> = wallet.payments.iter().map(|p| p.id.clone()).collect();
        assert_eq!(kept, ids[5..].to_vec());
        assert_eq!(wallet.balance.to_string(), "895");
    }

    #[test]
    fn status_view_omits_payment_list() {
        let wallet = authorize(&WalletState::fresh(), true);
        let (wallet, _) = pay(&wallet, &pay_cmd("x", "1")).unwrap();
        let view = status_view(&wallet, StorageBackend::Volatile);
        assert_eq!(view.payments_count, 1);
        assert_eq!(view.wallet.balance.to_string(), "99");
        assert_eq!(view.storage, StorageBackend::Volatile);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("payments").is_none());
        assert_eq!(json["wallet"]["balance"], "99");
    }
}
