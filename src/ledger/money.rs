// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point money.
//!
//! Balances and transfer amounts are held as integer minor units (kobo) in an
//! [`Amount`]. Client-facing values are decimal strings with at most two
//! fractional digits. Input with more precision is rejected, never rounded.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits carried by every amount.
pub const MINOR_UNIT_DECIMALS: u32 = 2;

const SCALE: u64 = 10u64.pow(MINOR_UNIT_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Amount must not be negative")]
    Negative,

    #[error("Amount has {provided} decimal places, at most {max} are allowed")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount is too large")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),
}

/// A non-negative amount of money in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> u64 {
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

    /// Parse a decimal string such as `"300"`, `"300.5"` or `"300.50"`.
    ///
    /// Zero is accepted here; callers that need a strictly positive amount
    /// check [`Amount::is_zero`] themselves.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MoneyError::InvalidFormat("empty string".into()));
        }
        if input.starts_with('-') {
            return Err(MoneyError::Negative);
        }
        if input.starts_with('+') {
            return Err(MoneyError::InvalidFormat("unexpected sign".into()));
        }

        let (whole, frac) = match input.split_once('.') {
            None => (input, ""),
            Some((whole, frac)) => {
                if whole.is_empty() || frac.is_empty() {
                    return Err(MoneyError::InvalidFormat(
                        "both sides of the decimal point are required".into(),
                    ));
                }
                if frac.contains('.') {
                    return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
                }
                (whole, frac)
            }
        };

        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::InvalidFormat(format!("not a decimal number: {input}")));
        }

        if frac.len() > MINOR_UNIT_DECIMALS as usize {
            return Err(MoneyError::PrecisionOverflow {
                provided: frac.len() as u32,
                max: MINOR_UNIT_DECIMALS,
            });
        }

        let whole: u64 = whole.parse().map_err(|_| MoneyError::Overflow)?;
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = MINOR_UNIT_DECIMALS as usize)
                .parse()
                .map_err(|_| MoneyError::InvalidFormat("invalid fractional part".into()))?
        };

        whole
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / SCALE,
            self.0 % SCALE,
            width = MINOR_UNIT_DECIMALS as usize
        )
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}
