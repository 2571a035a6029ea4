// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger
//!
//! Money movement between virtual accounts.
//!
//! - [`money`]: fixed-point amounts in minor units
//! - [`resolver`]: tag/identifier to account resolution
//! - [`engine`]: transfers, funds requests and tag assignment
//! - [`groups`]: group creation, payments into and payouts from group wallets
//!
//! The engine depends on storage for units of work and on the notification
//! dispatcher for post-commit SMS; it knows nothing about HTTP.

pub mod engine;
pub mod error;
pub mod groups;
pub mod money;
pub mod resolver;

pub use engine::{
    LedgerSettings, RequestReceipt, RequestSettlement, TransferEngine, TransferOrder, TransferReceipt,
};
pub use error::{LedgerError, Side};
pub use groups::{GroupDetails, NewGroup};
pub use money::{Amount, MoneyError};
pub use resolver::{normalize_tag, AccountRef, Holder, ResolvedAccount};
