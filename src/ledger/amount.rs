// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical decimal amounts.
//!
//! Amounts are held as an integer count of micro-units (six fractional
//! digits), so faucet and pay arithmetic is exact and repeated formatting
//! never drifts. The canonical text form is the fixed six-digit rendering
//! with trailing zeros and a trailing point removed:
//!
//! | input        | canonical |
//! |--------------|-----------|
//! | `"2.000000"` | `"2"`     |
//! | `"1.10"`     | `"1.1"`   |
//! | `"1e3"`      | `"1000"`  |
//! | `"0.0000005"`| `"0.000001"` (half-up) |

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits kept.
pub const SCALE: u32 = 6;

const MICROS_PER_UNIT: u128 = 1_000_000;

/// Largest exponent accepted in `1e<exp>` notation.
const MAX_EXPONENT: i32 = 64;

/// u128 holds any 38-digit decimal.
const MAX_DIGITS: usize = 38;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a finite decimal number: {0}")]
    Malformed(String),

    #[error("amount must not be negative")]
    Negative,

    #[error("amount is too large")]
    TooLarge,
}

/// Non-negative decimal quantity with six fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Whole units, e.g. `Amount::from_units(100)` is `"100"`.
    pub const fn from_units(units: u64) -> Self {
        Amount(units as u128 * MICROS_PER_UNIT)
    }

    pub const fn from_micros(micros: u128) -> Self {
        Amount(micros)
    }

    pub const fn micros(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a decimal string, rounding half-up to six fractional digits.
    ///
    /// Accepts an optional leading `+`, an optional fractional part and an
    /// optional `e`/`E` exponent (JSON numbers arrive in that form).
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }
        let malformed = || AmountError::Malformed(raw.to_string());

        let unsigned = match raw.as_bytes()[0] {
            b'-' => {
                // "-0" style inputs are still rejected; sign is not part of the domain.
                return Err(AmountError::Negative);
            }
            b'+' => &raw[1..],
            _ => raw,
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(idx) => {
                let exp: i32 = unsigned[idx + 1..].parse().map_err(|_| malformed())?;
                if exp.abs() > MAX_EXPONENT {
                    return Err(if exp > 0 {
                        AmountError::TooLarge
                    } else {
                        malformed()
                    });
                }
                (&unsigned[..idx], exp)
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        // value = digits * 10^(exponent - frac_len); we want value * 10^SCALE.
        let mut digits = String::with_capacity(int_part.len() + frac_part.len());
        digits.push_str(int_part);
        digits.push_str(frac_part);
        let shift = SCALE as i64 + exponent as i64 - frac_part.len() as i64;

        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Ok(Amount::ZERO);
        }

        if shift >= 0 {
            let shift = shift as usize;
            if significant.len() + shift > MAX_DIGITS {
                return Err(AmountError::TooLarge);
            }
            let base: u128 = significant.parse().map_err(|_| AmountError::TooLarge)?;
            let factor = 10u128
                .checked_pow(shift as u32)
                .ok_or(AmountError::TooLarge)?;
            return base
                .checked_mul(factor)
                .map(Amount)
                .ok_or(AmountError::TooLarge);
        }

        let drop = shift.unsigned_abs() as usize;
        if drop > significant.len() {
            // Below half a micro-unit.
            return Ok(Amount::ZERO);
        }
        let keep_len = significant.len() - drop;
        if keep_len > MAX_DIGITS {
            return Err(AmountError::TooLarge);
        }
        let kept: u128 = if keep_len == 0 {
            0
        } else {
            significant[..keep_len]
                .parse()
                .map_err(|_| AmountError::TooLarge)?
        };
        let round_up = significant.as_bytes()[keep_len] >= b'5';
        let micros = if round_up {
            kept.checked_add(1).ok_or(AmountError::TooLarge)?
        } else {
            kept
        };
        Ok(Amount(micros))
    }
}

/// Canonicalize a decimal string.
pub fn canonicalize(input: &str) -> Result<String, AmountError> {
    Amount::parse(input).map(|amount| amount.to_string())
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MICROS_PER_UNIT;
        let frac = self.0 % MICROS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:06}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl de::Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative decimal string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(v as u128 * MICROS_PER_UNIT))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(|v| Amount(v as u128 * MICROS_PER_UNIT))
                    .map_err(|_| E::custom(AmountError::Negative))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
                if !v.is_finite() {
                    return Err(E::custom(AmountError::Malformed(v.to_string())));
                }
                Amount::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
