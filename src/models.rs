// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response views shared by several endpoint groups. Request bodies live next
//! to the handlers that accept them.
//!
//! ## Amounts
//!
//! Amounts cross the API as decimal strings with exactly two fractional
//! digits (`"300.00"`). Inputs are parsed with [`Amount::parse`], which
//! rejects more than two decimals instead of rounding.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::ledger::{Amount, GroupDetails};
use crate::storage::{
    ActivityEntry, StoredAccount, StoredGroup, StoredTransaction, StoredUser, TransactionPage,
};

/// Parse a client-supplied amount field.
pub fn parse_amount(field: &str, value: &str) -> Result<Amount, ApiError> {
    Amount::parse(value).map_err(|e| ApiError::bad_request(format!("{field}: {e}")))
}

// =============================================================================
// Accounts
// =============================================================================

/// A virtual account as shown to its holder.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct AccountView {
    pub account_id: String,
    /// 10-digit account number.
    pub account_number: String,
    pub account_name: String,
    pub bank_name: String,
    /// Decimal string, e.g. `"700.00"`.
    pub balance: String,
}

impl From<&StoredAccount> for AccountView {
    fn from(account: &StoredAccount) -> Self {
        Self {
            account_id: account.account_id.clone(),
            account_number: account.account_number.clone(),
            account_name: account.account_name.clone(),
            bank_name: account.bank_name.clone(),
            balance: account.balance.to_string(),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A user's profile. Never includes the passcode hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub user_id: String,
    pub phone_number: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub tag: Option<String>,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub bvn_verified: bool,
    /// `pending` or `verified`.
    pub kyc_status: String,
    /// Onboarding step reached, 1 to 5.
    pub signup_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
}

impl UserProfile {
    pub fn new(user: &StoredUser, account: Option<&StoredAccount>) -> Self {
        Self {
            user_id: user.user_id.clone(),
            phone_number: user.phone_number.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            tag: user.tag.clone(),
            phone_verified: user.phone_verified,
            email_verified: user.email_verified,
            bvn_verified: user.bvn_verified,
            kyc_status: wire_name(&user.kyc_status),
            signup_level: user.signup_level,
            account: account.map(AccountView::from),
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// A ledger entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionView {
    pub transaction_id: String,
    pub amount: String,
    pub description: String,
    /// `within-system` or `external`.
    pub environment: String,
    /// `request`, `transfer-out`, `transfer-in`, `group-payment`, ...
    pub kind: String,
    pub sender: String,
    pub receiver: String,
    /// `pending`, `completed` or `failed`.
    pub status: String,
    /// For funds requests, the transfer that settled it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<String>,
    /// How the viewer took part, when listed in a history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn wire_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl From<&StoredTransaction> for TransactionView {
    fn from(tx: &StoredTransaction) -> Self {
        Self {
            transaction_id: tx.transaction_id.clone(),
            amount: tx.amount.to_string(),
            description: tx.description.clone(),
            environment: wire_name(&tx.environment),
            kind: wire_name(&tx.kind),
            sender: tx.sender_ref.clone(),
            receiver: tx.receiver_ref.clone(),
            status: tx.status.to_string(),
            settlement_id: tx.settlement_id.clone(),
            role: None,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

impl From<&ActivityEntry> for TransactionView {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            role: Some(entry.role.as_str().to_string()),
            ..TransactionView::from(&entry.transaction)
        }
    }
}

/// One page of history, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionPageView {
    pub transactions: Vec<TransactionView>,
    /// Pass back as `cursor` to fetch the next page. Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<TransactionPage> for TransactionPageView {
    fn from(page: TransactionPage) -> Self {
        Self {
            transactions: page.entries.iter().map(TransactionView::from).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

/// A committed transfer with the payer's new balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferView {
    pub transaction: TransactionView,
    /// Balance of the debited account after the transfer.
    pub balance: String,
}

// =============================================================================
// Groups
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupMemberView {
    pub user_id: String,
    pub tag: Option<String>,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

/// A group wallet with its account and members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupView {
    pub group_id: String,
    pub name: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    pub admin_user_id: String,
    pub account: AccountView,
    pub members: Vec<GroupMemberView>,
    pub created_at: DateTime<Utc>,
}

impl GroupView {
    fn header(group: &StoredGroup, account: &StoredAccount) -> Self {
        Self {
            group_id: group.group_id.clone(),
            name: group.name.clone(),
            tag: group.tag.clone(),
            budget: group.budget.map(|b| b.to_string()),
            admin_user_id: group.admin_user_id.clone(),
            account: AccountView::from(account),
            members: Vec::new(),
            created_at: group.created_at,
        }
    }
}

impl From<&GroupDetails> for GroupView {
    fn from(details: &GroupDetails) -> Self {
        Self {
            members: details
                .members
                .iter()
                .map(|(member, user)| GroupMemberView {
                    user_id: member.user_id.clone(),
                    tag: user.tag.clone(),
                    name: user.full_name(),
                    joined_at: member.joined_at,
                })
                .collect(),
            ..GroupView::header(&details.group, &details.account)
        }
    }
}
