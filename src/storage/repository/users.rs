// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Phone numbers, emails and tags are unique. Each has its own lookup table
//! (`user_phones`, `user_emails`, `user_tags`) kept in step with the user row
//! by [`UserRepository::save`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ledger_db::{
    KeyTable, LedgerDbError, LedgerDbResult, LedgerRead, UnitOfWork, USERS, USER_EMAILS,
    USER_PHONES, USER_TAGS,
};

/// KYC state of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Verified,
}

/// Onboarding progress. Each step unlocks the next one.
pub mod signup_level {
    pub const PHONE_VERIFIED: u8 = 1;
    pub const PROFILE_ADDED: u8 = 2;
    pub const BVN_VERIFIED: u8 = 3;
    pub const TAG_ASSIGNED: u8 = 4;
    pub const PASSCODE_SET: u8 = 5;
}

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub user_id: String,
    pub phone_number: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Lowercase unique handle, assigned once KYC has passed.
    #[serde(default)]
    pub tag: Option<String>,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub bvn_verified: bool,
    pub kyc_status: KycStatus,
    pub signup_level: u8,
    /// Argon2 PHC string. Never returned via API.
    #[serde(default)]
    pub passcode_hash: Option<String>,
    /// The single device allowed to hold a session.
    #[serde(default)]
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    /// A user whose phone number has just been verified.
    pub fn with_verified_phone(phone_number: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            phone_number: phone_number.into(),
            first_name: None,
            last_name: None,
            email: None,
            tag: None,
            phone_verified: true,
            email_verified: false,
            bvn_verified: false,
            kyc_status: KycStatus::Pending,
            signup_level: signup_level::PHONE_VERIFIED,
            passcode_hash: None,
            device_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.tag.clone().unwrap_or_else(|| self.phone_number.clone()),
        }
    }

    /// Tag for display, falling back to the phone number before tag assignment.
    pub fn handle(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.phone_number)
    }
}

/// Repository for users over a snapshot or a unit of work.
pub struct UserRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> UserRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, user_id: &str) -> LedgerDbResult<Option<StoredUser>> {
        self.tx.get_json(USERS, user_id)
    }

    pub fn get(&self, user_id: &str) -> LedgerDbResult<StoredUser> {
        self.find(user_id)?
            .ok_or_else(|| LedgerDbError::NotFound(format!("User {user_id}")))
    }

    pub fn find_by_tag(&self, tag: &str) -> LedgerDbResult<Option<StoredUser>> {
        self.find_via(USER_TAGS, &tag.to_lowercase())
    }

    pub fn find_by_phone(&self, phone_number: &str) -> LedgerDbResult<Option<StoredUser>> {
        self.find_via(USER_PHONES, phone_number)
    }

    pub fn find_by_email(&self, email: &str) -> LedgerDbResult<Option<StoredUser>> {
        self.find_via(USER_EMAILS, &email.to_lowercase())
    }

    pub fn tag_taken(&self, tag: &str) -> LedgerDbResult<bool> {
        Ok(self.tx.get_key(USER_TAGS, &tag.to_lowercase())?.is_some())
    }

    /// Tags containing `query`, as `(tag, user_id)` pairs.
    pub fn search_tags(&self, query: &str, limit: usize) -> LedgerDbResult<Vec<(String, String)>> {
        let needle = query.to_lowercase();
        self.tx
            .scan_keys(USER_TAGS, limit, &|tag: &str| tag.contains(needle.as_str()))
    }

    fn find_via(&self, index: KeyTable, key: &str) -> LedgerDbResult<Option<StoredUser>> {
        match self.tx.get_key(index, key)? {
            Some(user_id) => self.find(&user_id),
            None => Ok(None),
        }
    }
}

impl UserRepository<'_, UnitOfWork<'_>> {
    /// Insert a new user. Fails if the phone number is already registered.
    pub fn create(&self, user: &StoredUser) -> LedgerDbResult<()> {
        if self.tx.get_key(USER_PHONES, &user.phone_number)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!(
                "User with phone {}",
                user.phone_number
            )));
        }
        self.tx.put_json(USERS, &user.user_id, user)?;
        self.tx.put_key(USER_PHONES, &user.phone_number, &user.user_id)?;
        Ok(())
    }

    /// Update a user and keep the email and tag lookups in step.
    ///
    /// Fails with `AlreadyExists` if the new email or tag belongs to someone else.
    pub fn save(&self, user: &mut StoredUser) -> LedgerDbResult<()> {
        let previous = self.get(&user.user_id)?;

        if let Some(email) = user.email.as_mut() {
            *email = email.to_lowercase();
        }
        if let Some(tag) = user.tag.as_mut() {
            *tag = tag.to_lowercase();
        }

        self.reindex(USER_EMAILS, previous.email.as_deref(), user.email.as_deref(), &user.user_id)?;
        self.reindex(USER_TAGS, previous.tag.as_deref(), user.tag.as_deref(), &user.user_id)?;

        user.updated_at = self.tx.now();
        self.tx.put_json(USERS, &user.user_id, user)
    }

    fn reindex(
        &self,
        index: KeyTable,
        old: Option<&str>,
        new: Option<&str>,
        user_id: &str,
    ) -> LedgerDbResult<()> {
        if old == new {
            return Ok(());
        }
        if let Some(new) = new {
            match self.tx.get_key(index, new)? {
                Some(owner) if owner != user_id => {
                    return Err(LedgerDbError::AlreadyExists(new.to_string()));
                }
                _ => self.tx.put_key(index, new, user_id)?,
            }
        }
        if let Some(old) = old {
            self.tx.remove_key(index, old)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger_db::LedgerDb;

    fn temp_db() -> (LedgerDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn seed(db: &LedgerDb, phone: &str) -> StoredUser {
        db.write_blocking(|uow| {
            let user = StoredUser::with_verified_phone(phone, uow.now());
            UserRepository::new(uow).create(&user)?;
            Ok::<_, LedgerDbError>(user)
        })
        .unwrap()
    }

    #[test]
    fn duplicate_phone_is_rejected() {
        let (db, _dir) = temp_db();
        seed(&db, "+2348011111111");
        let result = db.write_blocking(|uow| {
            let user = StoredUser::with_verified_phone("+2348011111111", uow.now());
            UserRepository::new(uow).create(&user)
        });
        assert!(matches!(result, Err(LedgerDbError::AlreadyExists(_))));
    }

    #[test]
    fn save_normalizes_and_indexes_tag_and_email() {
        let (db, _dir) = temp_db();
        let mut user = seed(&db, "+2348011111111");
        user.email = Some("Ada@Example.com".into());
        user.tag = Some("AdaObi".into());
        db.write_blocking(|uow| UserRepository::new(uow).save(&mut user)).unwrap();

        let snap = db.snapshot().unwrap();
        let repo = UserRepository::new(&snap);
        assert_eq!(repo.find_by_tag("ADAOBI").unwrap().unwrap().user_id, user.user_id);
        assert_eq!(repo.find_by_email("ada@example.com").unwrap().unwrap().user_id, user.user_id);
        assert!(repo.tag_taken("adaobi").unwrap());
    }

    #[test]
    fn changing_email_releases_the_old_one() {
        let (db, _dir) = temp_db();
        let mut user = seed(&db, "+2348011111111");
        user.email = Some("old@example.com".into());
        db.write_blocking(|uow| UserRepository::new(uow).save(&mut user)).unwrap();
        user.email = Some("new@example.com".into());
        db.write_blocking(|uow| UserRepository::new(uow).save(&mut user)).unwrap();

        let snap = db.snapshot().unwrap();
        let repo = UserRepository::new(&snap);
        assert!(repo.find_by_email("old@example.com").unwrap().is_none());
        assert!(repo.find_by_email("new@example.com").unwrap().is_some());
    }

    #[test]
    fn tag_owned_by_someone_else_is_rejected() {
        let (db, _dir) = temp_db();
        let mut first = seed(&db, "+2348011111111");
        let mut second = seed(&db, "+2348022222222");
        first.tag = Some("ada".into());
        db.write_blocking(|uow| UserRepository::new(uow).save(&mut first)).unwrap();

        second.tag = Some("ada".into());
        let result = db.write_blocking(|uow| UserRepository::new(uow).save(&mut second));
        assert!(matches!(result, Err(LedgerDbError::AlreadyExists(_))));
    }

    #[test]
    fn search_matches_substrings() {
        let (db, _dir) = temp_db();
        for (phone, tag) in [("+2348011111111", "adaobi"), ("+2348022222222", "obinna"), ("+2348033333333", "zainab")] {
            let mut user = seed(&db, phone);
            user.tag = Some(tag.into());
            db.write_blocking(|uow| UserRepository::new(uow).save(&mut user)).unwrap();
        }
        let snap = db.snapshot().unwrap();
        let hits = UserRepository::new(&snap).search_tags("OBI", 20).unwrap();
        let tags: Vec<_> = hits.into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["adaobi", "obinna"]);
    }
}
