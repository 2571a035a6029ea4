// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent storage for users, virtual accounts, groups, ledger entries and
//! audit events, backed by a single embedded redb database.
//!
//! ## Access Model
//!
//! - Reads go through a [`LedgerSnapshot`] (one consistent read transaction)
//! - Writes go through a [`UnitOfWork`] (one write transaction); everything
//!   written through it commits or rolls back together
//! - Repositories are thin typed views over either, via [`LedgerRead`]
//!
//! ```text
//! DATA_DIR/
//!   ledger.redb
//! ```

pub mod audit;
pub mod ledger_db;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use ledger_db::{
    LedgerDb, LedgerDbError, LedgerDbResult, LedgerRead, LedgerSnapshot, OperationScope, UnitOfWork,
};
pub use repository::{
    signup_level, AccountKind, AccountOwner, AccountRepository, ActivityEntry, ActivityRole, GroupRepository,
    KycStatus, OtpChallengeRepository, OtpPurpose, StoredAccount, StoredGroup, StoredGroupMember,
    StoredOtpChallenge, StoredTransaction, StoredUser, StoredVerificationCode, TransactionEnvironment,
    TransactionKind, TransactionPage, TransactionRepository, TransactionStatus, UserRepository,
    VerificationRepository, WaitlistEntry, WaitlistRepository,
};
