// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Virtual account repository.
//!
//! Every user (after tag assignment) and every group owns exactly one
//! account. The `account_owners` table enforces that one-to-one mapping.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ledger::money::Amount;
use crate::storage::ledger_db::{
    LedgerDbError, LedgerDbResult, LedgerRead, UnitOfWork, ACCOUNTS, ACCOUNT_NUMBERS, ACCOUNT_OWNERS,
};

/// Fresh numbers drawn before giving up on a collision.
const ACCOUNT_NUMBER_ATTEMPTS: usize = 8;

fn random_account_number() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000u64..10_000_000_000)
        .to_string()
}

/// The two mutually exclusive kinds of account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Group,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::User => write!(f, "user"),
            AccountKind::Group => write!(f, "group"),
        }
    }
}

/// Holder of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum AccountOwner {
    User(String),
    Group(String),
}

impl AccountOwner {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountOwner::User(_) => AccountKind::User,
            AccountOwner::Group(_) => AccountKind::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AccountOwner::User(id) | AccountOwner::Group(id) => id,
        }
    }

    /// Stable key used by the owner map and the activity index.
    pub fn index_key(&self) -> String {
        format!("{}:{}", self.kind(), self.id())
    }
}

/// Stored virtual account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub account_id: String,
    pub owner: AccountOwner,
    /// 10-digit display number.
    pub account_number: String,
    pub account_name: String,
    pub bank_name: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredAccount {
    pub fn open(
        owner: AccountOwner,
        account_name: impl Into<String>,
        bank_name: impl Into<String>,
        opening_balance: Amount,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: uuid::Uuid::new_v4().to_string(),
            owner,
            account_number: random_account_number(),
            account_name: account_name.into(),
            bank_name: bank_name.into(),
            balance: opening_balance,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository for accounts over a snapshot or a unit of work.
pub struct AccountRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> AccountRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, account_id: &str) -> LedgerDbResult<Option<StoredAccount>> {
        self.tx.get_json(ACCOUNTS, account_id)
    }

    pub fn get(&self, account_id: &str) -> LedgerDbResult<StoredAccount> {
        self.find(account_id)?
            .ok_or_else(|| LedgerDbError::NotFound(format!("Account {account_id}")))
    }

    pub fn find_for_owner(&self, owner: &AccountOwner) -> LedgerDbResult<Option<StoredAccount>> {
        match self.tx.get_key(ACCOUNT_OWNERS, &owner.index_key())? {
            Some(account_id) => self.find(&account_id),
            None => Ok(None),
        }
    }

    pub fn find_by_number(&self, account_number: &str) -> LedgerDbResult<Option<StoredAccount>> {
        match self.tx.get_key(ACCOUNT_NUMBERS, account_number)? {
            Some(account_id) => self.find(&account_id),
            None => Ok(None),
        }
    }
}

impl AccountRepository<'_, UnitOfWork<'_>> {
    /// Create an account. Fails if the owner already has one.
    ///
    /// A taken account number is replaced with a fresh one before writing.
    pub fn create(&self, account: &mut StoredAccount) -> LedgerDbResult<()> {
        let owner_key = account.owner.index_key();
        if self.tx.get_key(ACCOUNT_OWNERS, &owner_key)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!("Account for {owner_key}")));
        }

        let mut attempts = 0;
        while self.tx.get_key(ACCOUNT_NUMBERS, &account.account_number)?.is_some() {
            attempts += 1;
            if attempts >= ACCOUNT_NUMBER_ATTEMPTS {
                return Err(LedgerDbError::AlreadyExists(format!(
                    "Account number {}",
                    account.account_number
                )));
            }
            account.account_number = random_account_number();
        }

        self.tx.put_json(ACCOUNTS, &account.account_id, account)?;
        self.tx.put_key(ACCOUNT_OWNERS, &owner_key, &account.account_id)?;
        self.tx.put_key(ACCOUNT_NUMBERS, &account.account_number, &account.account_id)
    }

    /// Persist a new balance for an existing account.
    pub fn save_balance(&self, account: &mut StoredAccount, balance: Amount) -> LedgerDbResult<()> {
        if self.find(&account.account_id)?.is_none() {
            return Err(LedgerDbError::NotFound(format!("Account {}", account.account_id)));
        }
        account.balance = balance;
        account.updated_at = self.tx.now();
        self.tx.put_json(ACCOUNTS, &account.account_id, account)
    }
}
