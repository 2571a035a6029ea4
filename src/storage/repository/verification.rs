// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email verification codes.
//!
//! Only a keyed digest of each code is stored. At most one live code exists
//! per email; issuing a new one replaces the previous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ledger_db::{LedgerDbResult, LedgerRead, UnitOfWork, VERIFICATION_CODES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVerificationCode {
    pub email: String,
    pub code_digest: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoredVerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct VerificationRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> VerificationRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, email: &str) -> LedgerDbResult<Option<StoredVerificationCode>> {
        self.tx.get_json(VERIFICATION_CODES, &email.to_lowercase())
    }
}

impl VerificationRepository<'_, UnitOfWork<'_>> {
    pub fn save(&self, code: &StoredVerificationCode) -> LedgerDbResult<()> {
        self.tx
            .put_json(VERIFICATION_CODES, &code.email.to_lowercase(), code)
    }

    pub fn consume(&self, email: &str) -> LedgerDbResult<()> {
        self.tx.remove_json(VERIFICATION_CODES, &email.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger_db::LedgerDb;

    #[test]
    fn latest_code_replaces_previous_and_consume_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        let now = Utc::now();
        for digest in ["first", "second"] {
            let code = StoredVerificationCode {
                email: "Ada@Example.com".into(),
                code_digest: digest.into(),
                expires_at: now + chrono::Duration::minutes(30),
                created_at: now,
            };
            db.write_blocking(|uow| VerificationRepository::new(uow).save(&code))
                .unwrap();
        }

        let snap = db.snapshot().unwrap();
        let stored = VerificationRepository::new(&snap).find("ada@example.com").unwrap().unwrap();
        assert_eq!(stored.code_digest, "second");
        assert!(!stored.is_expired(now));
        assert!(stored.is_expired(now + chrono::Duration::minutes(31)));
        drop(snap);

        db.write_blocking(|uow| VerificationRepository::new(uow).consume("ada@example.com"))
            .unwrap();
        let snap = db.snapshot().unwrap();
        assert!(VerificationRepository::new(&snap).find("ada@example.com").unwrap().is_none());
    }
}
