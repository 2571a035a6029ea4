// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_tags` / `user_phones` / `user_emails`: unique handle → user_id
//! - `accounts`: account_id → serialized StoredAccount
//! - `account_owners`: owner key (`user:{id}` / `group:{id}`) → account_id
//! - `account_numbers`: 10-digit account number → account_id
//! - `groups`: group_id → serialized StoredGroup
//! - `group_tags`: tag → group_id
//! - `group_members`: composite key (group_id|user_id) → joined_at
//! - `transactions`: transaction_id → serialized StoredTransaction
//! - `activity_index`: composite key (owner|!timestamp|transaction_id) → role
//! - `verification_codes`: email → serialized StoredVerificationCode
//! - `otp_challenges`: pin_id → serialized StoredOtpChallenge
//! - `waitlist`: email → serialized WaitlistEntry
//! - `audit_log`: (timestamp|event_id) → serialized AuditEvent
//!
//! ## Units of Work
//!
//! Every mutation runs inside one redb write transaction wrapped in a
//! [`UnitOfWork`]. redb admits a single writer at a time, so a unit of work
//! that reads a balance and writes a derived balance is serializable against
//! every other unit of work. Dropping or aborting the write transaction rolls
//! back every write made through it.
//!
//! [`LedgerDb::write`] runs a unit of work on the blocking pool under an
//! [`OperationScope`]: a deadline plus a cancellation token. The token is
//! checked right before commit, so a cancelled or timed-out operation never
//! commits, and one that already committed is reported as committed.

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
pub(crate) type KeyTable = TableDefinition<'static, &'static str, &'static str>;
pub(crate) type IndexTable = TableDefinition<'static, &'static [u8], &'static str>;

pub(crate) const USERS: JsonTable = TableDefinition::new("users");
pub(crate) const USER_TAGS: KeyTable = TableDefinition::new("user_tags");
pub(crate) const USER_PHONES: KeyTable = TableDefinition::new("user_phones");
pub(crate) const USER_EMAILS: KeyTable = TableDefinition::new("user_emails");

pub(crate) const ACCOUNTS: JsonTable = TableDefinition::new("accounts");
pub(crate) const ACCOUNT_OWNERS: KeyTable = TableDefinition::new("account_owners");
pub(crate) const ACCOUNT_NUMBERS: KeyTable = TableDefinition::new("account_numbers");

pub(crate) const GROUPS: JsonTable = TableDefinition::new("groups");
pub(crate) const GROUP_TAGS: KeyTable = TableDefinition::new("group_tags");
/// Key format: `group_id|user_id`.
pub(crate) const GROUP_MEMBERS: IndexTable = TableDefinition::new("group_members");

pub(crate) const TRANSACTIONS: JsonTable = TableDefinition::new("transactions");
/// Key format: `owner_key|!timestamp_micros_be|transaction_id`, newest first.
pub(crate) const ACTIVITY_INDEX: IndexTable = TableDefinition::new("activity_index");

pub(crate) const VERIFICATION_CODES: JsonTable = TableDefinition::new("verification_codes");
pub(crate) const OTP_CHALLENGES: JsonTable = TableDefinition::new("otp_challenges");
pub(crate) const WAITLIST: JsonTable = TableDefinition::new("waitlist");
pub(crate) const AUDIT_LOG: JsonTable = TableDefinition::new("audit_log");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid cursor")]
    InvalidCursor,

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("operation cancelled before commit")]
    Cancelled,

    #[error("operation exceeded its {0:?} deadline")]
    TimedOut(Duration),

    #[error("ledger worker failed: {0}")]
    Worker(String),
}

pub type LedgerDbResult<T> = Result<T, LedgerDbError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key `prefix | inverted_timestamp_be_bytes | suffix`.
///
/// The inverted timestamp gives newest-first ordering on a forward scan.
pub(crate) fn make_index_key(prefix: &str, timestamp_micros: i64, suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + 8 + 1 + suffix.len());
    key.extend_from_slice(prefix.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!(timestamp_micros as u64)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(suffix.as_bytes());
    key
}

/// Build a composite key `prefix | suffix` for set-like tables.
pub(crate) fn make_pair_key(prefix: &str, suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + suffix.len());
    key.extend_from_slice(prefix.as_bytes());
    key.push(b'|');
    key.extend_from_slice(suffix.as_bytes());
    key
}

/// Range bounds covering every key that starts with `prefix|`.
pub(crate) fn prefix_range(prefix: &str) -> (Vec<u8>, Vec<u8>) {
    let mut start = Vec::with_capacity(prefix.len() + 1);
    start.extend_from_slice(prefix.as_bytes());
    start.push(b'|');
    let mut end = start.clone();
    // Past any valid key with this prefix
    end.extend_from_slice(&[0xFF; 20]);
    (start, end)
}

/// Extract the part after the last '|' of a composite key.
pub(crate) fn key_suffix(key: &[u8]) -> Option<String> {
    let pos = key.iter().rposition(|&b| b == b'|')?;
    String::from_utf8(key[pos + 1..].to_vec()).ok()
}

// =============================================================================
// Operation Scope
// =============================================================================

/// Deadline and cancellation handle for one unit of work.
#[derive(Debug, Clone)]
pub struct OperationScope {
    cancel: CancellationToken,
    timeout: Duration,
}

impl OperationScope {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout,
        }
    }

    /// Tie this scope to a caller-owned token (e.g. server shutdown).
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// =============================================================================
// Read Access
// =============================================================================

/// Read primitives shared by snapshots and units of work.
pub trait LedgerRead {
    fn get_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> LedgerDbResult<Option<T>>;

    fn get_key(&self, table: KeyTable, key: &str) -> LedgerDbResult<Option<String>>;

    fn get_index(&self, table: IndexTable, key: &[u8]) -> LedgerDbResult<Option<String>>;

    /// Forward scan over `start..end`, skipping `after` if it is the first key.
    fn scan_index(
        &self,
        table: IndexTable,
        start: &[u8],
        end: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> LedgerDbResult<Vec<(Vec<u8>, String)>>;

    /// Forward scan over a key table, keeping pairs accepted by `filter`.
    fn scan_keys(
        &self,
        table: KeyTable,
        limit: usize,
        filter: &dyn Fn(&str) -> bool,
    ) -> LedgerDbResult<Vec<(String, String)>>;

    fn scan_json<T: DeserializeOwned>(&self, table: JsonTable, limit: usize) -> LedgerDbResult<Vec<T>>;
}

fn read_json<T, R>(table: &R, key: &str) -> LedgerDbResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn read_key<R>(table: &R, key: &str) -> LedgerDbResult<Option<String>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

fn read_index<R>(table: &R, key: &[u8]) -> LedgerDbResult<Option<String>>
where
    R: ReadableTable<&'static [u8], &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

fn read_index_range<R>(
    table: &R,
    start: &[u8],
    end: &[u8],
    after: Option<&[u8]>,
    limit: usize,
) -> LedgerDbResult<Vec<(Vec<u8>, String)>>
where
    R: ReadableTable<&'static [u8], &'static str>,
{
    let mut results = Vec::with_capacity(limit.min(256));
    let mut skip_first = after.is_some();
    for entry in table.range(start..end)? {
        let entry = entry?;
        let key = entry.0.value().to_vec();
        if skip_first {
            skip_first = false;
            if Some(key.as_slice()) == after {
                continue;
            }
        }
        results.push((key, entry.1.value().to_string()));
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

fn read_key_pairs<R>(
    table: &R,
    limit: usize,
    filter: &dyn Fn(&str) -> bool,
) -> LedgerDbResult<Vec<(String, String)>>
where
    R: ReadableTable<&'static str, &'static str>,
{
    let mut results = Vec::new();
    for entry in table.iter()? {
        let entry = entry?;
        let key = entry.0.value();
        if filter(key) {
            results.push((key.to_string(), entry.1.value().to_string()));
            if results.len() >= limit {
                break;
            }
        }
    }
    Ok(results)
}

fn read_json_values<T, R>(table: &R, limit: usize) -> LedgerDbResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut results = Vec::new();
    for entry in table.iter()?.rev() {
        let entry = entry?;
        results.push(serde_json::from_slice(entry.1.value())?);
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

/// Consistent read-only view of the ledger.
pub struct LedgerSnapshot {
    txn: ReadTransaction,
}

impl LedgerRead for LedgerSnapshot {
    fn get_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> LedgerDbResult<Option<T>> {
        read_json(&self.txn.open_table(table)?, key)
    }

    fn get_key(&self, table: KeyTable, key: &str) -> LedgerDbResult<Option<String>> {
        read_key(&self.txn.open_table(table)?, key)
    }

    fn get_index(&self, table: IndexTable, key: &[u8]) -> LedgerDbResult<Option<String>> {
        read_index(&self.txn.open_table(table)?, key)
    }

    fn scan_index(
        &self,
        table: IndexTable,
        start: &[u8],
        end: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> LedgerDbResult<Vec<(Vec<u8>, String)>> {
        read_index_range(&self.txn.open_table(table)?, start, end, after, limit)
    }

    fn scan_keys(
        &self,
        table: KeyTable,
        limit: usize,
        filter: &dyn Fn(&str) -> bool,
    ) -> LedgerDbResult<Vec<(String, String)>> {
        read_key_pairs(&self.txn.open_table(table)?, limit, filter)
    }

    fn scan_json<T: DeserializeOwned>(&self, table: JsonTable, limit: usize) -> LedgerDbResult<Vec<T>> {
        read_json_values(&self.txn.open_table(table)?, limit)
    }
}

// =============================================================================
// Write Access
// =============================================================================

/// One serializable unit of work. Nothing written through it is visible to
/// other readers until the enclosing write transaction commits.
pub struct UnitOfWork<'t> {
    txn: &'t WriteTransaction,
    now: DateTime<Utc>,
}

impl<'t> UnitOfWork<'t> {
    /// Timestamp shared by every row written in this unit of work.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn put_json<T: Serialize>(&self, table: JsonTable, key: &str, value: &T) -> LedgerDbResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut t = self.txn.open_table(table)?;
        t.insert(key, json.as_slice())?;
        Ok(())
    }

    pub fn put_key(&self, table: KeyTable, key: &str, value: &str) -> LedgerDbResult<()> {
        let mut t = self.txn.open_table(table)?;
        t.insert(key, value)?;
        Ok(())
    }

    pub fn remove_key(&self, table: KeyTable, key: &str) -> LedgerDbResult<()> {
        let mut t = self.txn.open_table(table)?;
        t.remove(key)?;
        Ok(())
    }

    pub fn remove_json(&self, table: JsonTable, key: &str) -> LedgerDbResult<()> {
        let mut t = self.txn.open_table(table)?;
        t.remove(key)?;
        Ok(())
    }

    pub fn put_index(&self, table: IndexTable, key: &[u8], value: &str) -> LedgerDbResult<()> {
        let mut t = self.txn.open_table(table)?;
        t.insert(key, value)?;
        Ok(())
    }
}

impl LedgerRead for UnitOfWork<'_> {
    fn get_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> LedgerDbResult<Option<T>> {
        read_json(&self.txn.open_table(table)?, key)
    }

    fn get_key(&self, table: KeyTable, key: &str) -> LedgerDbResult<Option<String>> {
        read_key(&self.txn.open_table(table)?, key)
    }

    fn get_index(&self, table: IndexTable, key: &[u8]) -> LedgerDbResult<Option<String>> {
        read_index(&self.txn.open_table(table)?, key)
    }

    fn scan_index(
        &self,
        table: IndexTable,
        start: &[u8],
        end: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> LedgerDbResult<Vec<(Vec<u8>, String)>> {
        read_index_range(&self.txn.open_table(table)?, start, end, after, limit)
    }

    fn scan_keys(
        &self,
        table: KeyTable,
        limit: usize,
        filter: &dyn Fn(&str) -> bool,
    ) -> LedgerDbResult<Vec<(String, String)>> {
        read_key_pairs(&self.txn.open_table(table)?, limit, filter)
    }

    fn scan_json<T: DeserializeOwned>(&self, table: JsonTable, limit: usize) -> LedgerDbResult<Vec<T>> {
        read_json_values(&self.txn.open_table(table)?, limit)
    }
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Shared handle to the embedded ledger database.
#[derive(Clone)]
pub struct LedgerDb {
    db: Arc<Database>,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            for table in [
                USERS,
                ACCOUNTS,
                GROUPS,
                TRANSACTIONS,
                VERIFICATION_CODES,
                OTP_CHALLENGES,
                WAITLIST,
                AUDIT_LOG,
            ] {
                let _ = write_txn.open_table(table)?;
            }
            for table in [USER_TAGS, USER_PHONES, USER_EMAILS, ACCOUNT_OWNERS, ACCOUNT_NUMBERS, GROUP_TAGS] {
                let _ = write_txn.open_table(table)?;
            }
            for table in [GROUP_MEMBERS, ACTIVITY_INDEX] {
                let _ = write_txn.open_table(table)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a consistent read-only view.
    pub fn snapshot(&self) -> LedgerDbResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            txn: self.db.begin_read()?,
        })
    }

    /// Run `work` as one unit of work on the calling thread and commit it.
    ///
    /// Blocks while another writer holds the database.
    pub fn write_blocking<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
        E: From<LedgerDbError>,
    {
        match self.run_unit(&CancellationToken::new(), work) {
            Ok(outcome) => outcome,
            Err(e) => Err(e.into()),
        }
    }

    /// Run `work` as one unit of work on the blocking pool, bounded by `scope`.
    ///
    /// If this future is dropped before the unit of work commits, the unit of
    /// work is cancelled and rolled back.
    pub async fn write<T, E, F>(&self, scope: &OperationScope, work: F) -> Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<LedgerDbError> + Send + 'static,
    {
        let token = scope.cancel.child_token();
        let guard = token.clone().drop_guard();
        let worker_token = token.clone();
        let db = self.clone();
        let mut handle = tokio::task::spawn_blocking(move || db.run_unit(&worker_token, work));

        let joined = match tokio::time::timeout(scope.timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                token.cancel();
                let joined = handle.await;
                let _ = guard.disarm();
                return match joined {
                    Ok(Err(LedgerDbError::Cancelled)) => {
                        tracing::warn!(timeout = ?scope.timeout, "Unit of work timed out before commit");
                        Err(LedgerDbError::TimedOut(scope.timeout).into())
                    }
                    other => flatten(other),
                };
            }
        };
        let _ = guard.disarm();
        flatten(joined)
    }

    fn run_unit<T, E, F>(&self, token: &CancellationToken, work: F) -> LedgerDbResult<Result<T, E>>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
    {
        if token.is_cancelled() {
            return Err(LedgerDbError::Cancelled);
        }

        let txn = self.db.begin_write()?;
        let outcome = {
            let uow = UnitOfWork {
                txn: &txn,
                now: Utc::now(),
            };
            work(&uow)
        };

        match outcome {
            Ok(value) => {
                if token.is_cancelled() {
                    txn.abort()?;
                    return Err(LedgerDbError::Cancelled);
                }
                txn.commit()?;
                Ok(Ok(value))
            }
            Err(e) => {
                txn.abort()?;
                Ok(Err(e))
            }
        }
    }
}

fn flatten<T, E>(joined: Result<LedgerDbResult<Result<T, E>>, tokio::task::JoinError>) -> Result<T, E>
where
    E: From<LedgerDbError>,
{
    match joined {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(e.into()),
        Err(e) => Err(LedgerDbError::Worker(e.to_string()).into()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (LedgerDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    #[test]
    fn unusable_data_dir_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = LedgerDb::open(&blocker.join("ledger.redb"));
        assert!(matches!(result, Err(LedgerDbError::Io(_))));
    }

    #[test]
    fn committed_writes_are_visible() {
        let (db, _dir) = temp_db();
        db.write_blocking(|uow| uow.put_key(USER_TAGS, "ada", "user-1"))
            .unwrap();

        let snap = db.snapshot().unwrap();
        assert_eq!(snap.get_key(USER_TAGS, "ada").unwrap(), Some("user-1".to_string()));
    }

    #[test]
    fn failed_unit_of_work_rolls_back_every_write() {
        let (db, _dir) = temp_db();
        let result: Result<(), LedgerDbError> = db.write_blocking(|uow| {
            uow.put_key(USER_TAGS, "ada", "user-1")?;
            uow.put_key(GROUP_TAGS, "trip", "group-1")?;
            Err(LedgerDbError::NotFound("member".into()))
        });
        assert!(matches!(result, Err(LedgerDbError::NotFound(_))));

        let snap = db.snapshot().unwrap();
        assert_eq!(snap.get_key(USER_TAGS, "ada").unwrap(), None);
        assert_eq!(snap.get_key(GROUP_TAGS, "trip").unwrap(), None);
    }

    #[test]
    fn unit_of_work_reads_its_own_writes() {
        let (db, _dir) = temp_db();
        let seen = db
            .write_blocking(|uow| {
                uow.put_key(USER_PHONES, "+2348000000000", "user-1")?;
                uow.get_key(USER_PHONES, "+2348000000000")
            })
            .unwrap();
        assert_eq!(seen, Some("user-1".to_string()));
    }

    #[tokio::test]
    async fn cancelled_scope_never_commits() {
        let (db, _dir) = temp_db();
        let scope = OperationScope::new(Duration::from_secs(5));
        scope.cancel_token().cancel();

        let result: Result<(), LedgerDbError> = db
            .write(&scope, |uow| uow.put_key(USER_TAGS, "ada", "user-1"))
            .await;
        assert!(matches!(result, Err(LedgerDbError::Cancelled)));
        assert_eq!(db.snapshot().unwrap().get_key(USER_TAGS, "ada").unwrap(), None);
    }

    #[tokio::test]
    async fn deadline_exceeded_rolls_back_and_reports_timeout() {
        let (db, _dir) = temp_db();
        let scope = OperationScope::new(Duration::from_millis(20));

        let result: Result<(), LedgerDbError> = db
            .write(&scope, |uow| {
                uow.put_key(USER_TAGS, "slow", "user-1")?;
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(LedgerDbError::TimedOut(_))));
        assert_eq!(db.snapshot().unwrap().get_key(USER_TAGS, "slow").unwrap(), None);
    }

    #[tokio::test]
    async fn parent_cancellation_propagates() {
        let (db, _dir) = temp_db();
        let shutdown = CancellationToken::new();
        let scope = OperationScope::new(Duration::from_secs(5)).with_parent(&shutdown);
        shutdown.cancel();

        let result: Result<(), LedgerDbError> = db
            .write(&scope, |uow| uow.put_key(USER_TAGS, "ada", "user-1"))
            .await;
        assert!(matches!(result, Err(LedgerDbError::Cancelled)));
    }

    #[test]
    fn index_scan_pages_newest_first() {
        let (db, _dir) = temp_db();
        db.write_blocking(|uow| {
            for i in 0..5i64 {
                let key = make_index_key("user:1", 1_000 + i, &format!("tx-{i}"));
                uow.put_index(ACTIVITY_INDEX, &key, "sender")?;
            }
            // Different owner must never leak into the scan
            let other = make_index_key("user:2", 5_000, "tx-x");
            uow.put_index(ACTIVITY_INDEX, &other, "sender")
        })
        .unwrap();

        let snap = db.snapshot().unwrap();
        let (start, end) = prefix_range("user:1");
        let page = snap.scan_index(ACTIVITY_INDEX, &start, &end, None, 3).unwrap();
        let ids: Vec<_> = page.iter().filter_map(|(k, _)| key_suffix(k)).collect();
        assert_eq!(ids, vec!["tx-4", "tx-3", "tx-2"]);

        let last = page.last().unwrap().0.clone();
        let rest = snap
            .scan_index(ACTIVITY_INDEX, &last, &end, Some(&last), 10)
            .unwrap();
        let ids: Vec<_> = rest.iter().filter_map(|(k, _)| key_suffix(k)).collect();
        assert_eq!(ids, vec!["tx-1", "tx-0"]);
    }

    #[test]
    fn make_index_key_ordering() {
        let key_old = make_index_key("user:1", 1000, "tx1");
        let key_new = make_index_key("user:1", 2000, "tx2");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }
}
