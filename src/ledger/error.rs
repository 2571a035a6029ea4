// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger error taxonomy.

use std::fmt;

use super::money::Amount;
use crate::storage::{AccountKind, LedgerDbError};

/// Which leg of a transfer an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("The {side} account '{reference}' does not exist")]
    AccountNotFound { side: Side, reference: String },

    #[error("'{reference}' is a {actual} account, expected a {expected} account")]
    WrongAccountKind {
        side: Side,
        reference: String,
        expected: AccountKind,
        actual: AccountKind,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("Source and destination accounts must be different")]
    SelfTransferRejected,

    #[error("Destination balance would overflow")]
    BalanceOverflow,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] LedgerDbError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
