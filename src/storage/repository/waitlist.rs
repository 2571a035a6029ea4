// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pre-launch waitlist signups, keyed by lowercased email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ledger_db::{LedgerDbError, LedgerDbResult, LedgerRead, UnitOfWork, WAITLIST};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

pub struct WaitlistRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> WaitlistRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, email: &str) -> LedgerDbResult<Option<WaitlistEntry>> {
        self.tx.get_json(WAITLIST, &email.to_lowercase())
    }

    /// Most recent signups first.
    pub fn list(&self, limit: usize) -> LedgerDbResult<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self.tx.scan_json(WAITLIST, usize::MAX)?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

impl WaitlistRepository<'_, UnitOfWork<'_>> {
    /// Add an entry. Fails if the email is already on the list.
    pub fn create(&self, entry: &WaitlistEntry) -> LedgerDbResult<()> {
        let key = entry.email.to_lowercase();
        if self.find(&key)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!("Waitlist entry {key}")));
        }
        self.tx.put_json(WAITLIST, &key, entry)
    }
}
