// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction ledger repository.
//!
//! Transaction rows are append-only. The only permitted change after insert
//! is a forward status transition (`pending → completed | failed`), written
//! together with the settlement link for funds requests.
//!
//! Each row is indexed once per participant in `activity_index`, keyed by the
//! participant's owner key so history pages come back newest first.

use std::fmt;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::accounts::AccountOwner;
use crate::ledger::money::Amount;
use crate::storage::ledger_db::{
    key_suffix, make_index_key, prefix_range, LedgerDbError, LedgerDbResult, LedgerRead,
    UnitOfWork, ACTIVITY_INDEX, TRANSACTIONS,
};

/// Whether money stayed inside the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionEnvironment {
    WithinSystem,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    Request,
    TransferOut,
    TransferIn,
    GroupPayment,
    BankTransferIn,
    BankTransferOut,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Status only ever moves forward out of `pending`.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a participant relates to a transaction in their history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRole {
    /// Debited party.
    Sender,
    /// Credited party.
    Receiver,
    /// Asked for funds.
    Requester,
    /// Was asked for funds.
    Requestee,
}

impl ActivityRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityRole::Sender => "sender",
            ActivityRole::Receiver => "receiver",
            ActivityRole::Requester => "requester",
            ActivityRole::Requestee => "requestee",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(ActivityRole::Sender),
            "receiver" => Some(ActivityRole::Receiver),
            "requester" => Some(ActivityRole::Requester),
            "requestee" => Some(ActivityRole::Requestee),
            _ => None,
        }
    }
}

/// Stored ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub transaction_id: String,
    pub initiator_user_id: String,
    pub amount: Amount,
    pub description: String,
    pub environment: TransactionEnvironment,
    pub kind: TransactionKind,
    /// Tag of the paying side.
    pub sender_ref: String,
    /// Tag of the receiving side.
    pub receiver_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<String>,
    /// For requests: the user asked to pay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_user_id: Option<String>,
    /// For requests: the transfer that settled it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTransaction {
    /// Apply a forward status transition.
    pub fn transition(&mut self, next: TransactionStatus, now: DateTime<Utc>) -> LedgerDbResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerDbError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// A transaction as seen from one participant's history.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub transaction: StoredTransaction,
    pub role: ActivityRole,
}

/// One page of history.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub entries: Vec<ActivityEntry>,
    pub next_cursor: Option<String>,
}

/// Repository for ledger entries over a snapshot or a unit of work.
pub struct TransactionRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> TransactionRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, transaction_id: &str) -> LedgerDbResult<Option<StoredTransaction>> {
        self.tx.get_json(TRANSACTIONS, transaction_id)
    }

    pub fn get(&self, transaction_id: &str) -> LedgerDbResult<StoredTransaction> {
        self.find(transaction_id)?
            .ok_or_else(|| LedgerDbError::NotFound(format!("Transaction {transaction_id}")))
    }

    /// How `owner` took part in `tx`, if at all.
    pub fn role_of(&self, owner: &AccountOwner, tx: &StoredTransaction) -> LedgerDbResult<Option<ActivityRole>> {
        let key = make_index_key(&owner.index_key(), tx.created_at.timestamp_micros(), &tx.transaction_id);
        Ok(self
            .tx
            .get_index(ACTIVITY_INDEX, &key)?
            .and_then(|role| ActivityRole::parse(&role)))
    }

    /// Paginated history for an account holder, newest first.
    pub fn list_for_owner(
        &self,
        owner: &AccountOwner,
        cursor: Option<&str>,
        limit: usize,
    ) -> LedgerDbResult<TransactionPage> {
        let (prefix, prefix_end) = prefix_range(&owner.index_key());

        let after = match cursor {
            Some(cursor) => {
                let key = decode_cursor(cursor).ok_or(LedgerDbError::InvalidCursor)?;
                if !key.starts_with(&prefix) {
                    return Err(LedgerDbError::InvalidCursor);
                }
                Some(key)
            }
            None => None,
        };
        let start = after.clone().unwrap_or_else(|| prefix.clone());

        let rows = self
            .tx
            .scan_index(ACTIVITY_INDEX, &start, &prefix_end, after.as_deref(), limit)?;

        let mut entries = Vec::with_capacity(rows.len());
        let mut last_key = None;
        for (key, role) in rows {
            let (Some(transaction_id), Some(role)) = (key_suffix(&key), ActivityRole::parse(&role)) else {
                continue;
            };
            if let Some(transaction) = self.find(&transaction_id)? {
                entries.push(ActivityEntry { transaction, role });
            }
            last_key = Some(key);
        }

        let next_cursor = if entries.len() >= limit {
            last_key.map(|k| encode_cursor(&k))
        } else {
            None
        };

        Ok(TransactionPage { entries, next_cursor })
    }
}

impl TransactionRepository<'_, UnitOfWork<'_>> {
    /// Insert a ledger entry and index it for every participant.
    pub fn record(
        &self,
        transaction: &StoredTransaction,
        participants: &[(&AccountOwner, ActivityRole)],
    ) -> LedgerDbResult<()> {
        if self.find(&transaction.transaction_id)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!(
                "Transaction {}",
                transaction.transaction_id
            )));
        }
        self.tx
            .put_json(TRANSACTIONS, &transaction.transaction_id, transaction)?;

        let timestamp = transaction.created_at.timestamp_micros();
        for (owner, role) in participants {
            let key = make_index_key(&owner.index_key(), timestamp, &transaction.transaction_id);
            self.tx.put_index(ACTIVITY_INDEX, &key, role.as_str())?;
        }
        Ok(())
    }

    /// Move a transaction forward out of `pending`.
    pub fn update_status(
        &self,
        transaction_id: &str,
        next: TransactionStatus,
        settlement_id: Option<String>,
    ) -> LedgerDbResult<StoredTransaction> {
        let mut transaction = self.get(transaction_id)?;
        transaction.transition(next, self.tx.now())?;
        if settlement_id.is_some() {
            transaction.settlement_id = settlement_id;
        }
        self.tx
            .put_json(TRANSACTIONS, &transaction.transaction_id, &transaction)?;
        Ok(transaction)
    }
}

// =============================================================================
// Cursor Encoding
// =============================================================================

fn encode_cursor(key: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(key)
}

fn decode_cursor(cursor: &str) -> Option<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(cursor).ok()
}
