// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the ledger database.
//!
//! Each repository wraps either a snapshot or a unit of work. Read methods
//! are available on both; write methods only on a unit of work.

pub mod accounts;
pub mod groups;
pub mod otp;
pub mod transactions;
pub mod users;
pub mod verification;
pub mod waitlist;

pub use accounts::{AccountKind, AccountOwner, AccountRepository, StoredAccount};
pub use groups::{GroupRepository, StoredGroup, StoredGroupMember};
pub use otp::{OtpChallengeRepository, OtpPurpose, StoredOtpChallenge};
pub use transactions::{
    ActivityEntry, ActivityRole, StoredTransaction, TransactionEnvironment, TransactionKind,
    TransactionPage, TransactionRepository, TransactionStatus,
};
pub use users::{signup_level, KycStatus, StoredUser, UserRepository};
pub use verification::{StoredVerificationCode, VerificationRepository};
pub use waitlist::{WaitlistEntry, WaitlistRepository};
