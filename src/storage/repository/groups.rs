// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group and membership repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::money::Amount;
use crate::storage::ledger_db::{
    key_suffix, make_pair_key, prefix_range, LedgerDbError, LedgerDbResult, LedgerRead, UnitOfWork,
    GROUPS, GROUP_MEMBERS, GROUP_TAGS,
};

/// Stored group record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGroup {
    pub group_id: String,
    pub name: String,
    /// Lowercase unique handle.
    pub tag: String,
    /// Optional spending target set at creation.
    #[serde(default)]
    pub budget: Option<Amount>,
    pub admin_user_id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Membership row. The admin is not a member unless listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGroupMember {
    pub group_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Upper bound on members returned by a single listing.
const MAX_MEMBERS: usize = 1_000;

/// Repository for groups over a snapshot or a unit of work.
pub struct GroupRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> GroupRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, group_id: &str) -> LedgerDbResult<Option<StoredGroup>> {
        self.tx.get_json(GROUPS, group_id)
    }

    pub fn find_by_tag(&self, tag: &str) -> LedgerDbResult<Option<StoredGroup>> {
        match self.tx.get_key(GROUP_TAGS, &tag.to_lowercase())? {
            Some(group_id) => self.find(&group_id),
            None => Ok(None),
        }
    }

    pub fn tag_taken(&self, tag: &str) -> LedgerDbResult<bool> {
        Ok(self.tx.get_key(GROUP_TAGS, &tag.to_lowercase())?.is_some())
    }

    pub fn is_member(&self, group_id: &str, user_id: &str) -> LedgerDbResult<bool> {
        Ok(self
            .tx
            .get_index(GROUP_MEMBERS, &make_pair_key(group_id, user_id))?
            .is_some())
    }

    pub fn members(&self, group_id: &str) -> LedgerDbResult<Vec<StoredGroupMember>> {
        let (start, end) = prefix_range(group_id);
        let rows = self.tx.scan_index(GROUP_MEMBERS, &start, &end, None, MAX_MEMBERS)?;
        let mut members = Vec::with_capacity(rows.len());
        for (key, joined_at) in rows {
            let Some(user_id) = key_suffix(&key) else {
                continue;
            };
            let joined_at = DateTime::parse_from_rfc3339(&joined_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| LedgerDbError::Corrupt(format!("membership timestamp: {e}")))?;
            members.push(StoredGroupMember {
                group_id: group_id.to_string(),
                user_id,
                joined_at,
            });
        }
        Ok(members)
    }
}

impl GroupRepository<'_, UnitOfWork<'_>> {
    /// Insert a group. Fails if its tag is taken.
    pub fn create(&self, group: &StoredGroup) -> LedgerDbResult<()> {
        let tag = group.tag.to_lowercase();
        if self.tx.get_key(GROUP_TAGS, &tag)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!("Group tag {tag}")));
        }
        self.tx.put_json(GROUPS, &group.group_id, group)?;
        self.tx.put_key(GROUP_TAGS, &tag, &group.group_id)
    }

    /// Insert a membership row. Fails if the user is already a member.
    pub fn add_member(&self, member: &StoredGroupMember) -> LedgerDbResult<()> {
        let key = make_pair_key(&member.group_id, &member.user_id);
        if self.tx.get_index(GROUP_MEMBERS, &key)?.is_some() {
            return Err(LedgerDbError::AlreadyExists(format!(
                "Member {} of group {}",
                member.user_id, member.group_id
            )));
        }
        self.tx.put_index(GROUP_MEMBERS, &key, &member.joined_at.to_rfc3339())
    }
}
