// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account resolution.
//!
//! Turns a tag or identifier into the account it names, checking that the
//! holder is of the expected kind. A tag that exists but names the other kind
//! of holder is reported as [`ResolveError::WrongKind`], not as missing.
//!
//! Resolution has no side effects. The engine runs it inside its unit of
//! work so the balances it reads are the ones it later writes.

use super::error::{LedgerError, Side};
use crate::storage::{
    AccountKind, AccountOwner, AccountRepository, GroupRepository, LedgerDbError, LedgerRead,
    StoredAccount, StoredGroup, StoredUser, UserRepository,
};

pub const TAG_MIN_LEN: usize = 3;
pub const TAG_MAX_LEN: usize = 20;

/// How a caller names an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    /// Public handle of a user or group.
    Tag(String),
    /// Account identifier.
    AccountId(String),
    /// Identifier of the user or group that holds the account.
    Holder(String),
}

impl AccountRef {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    fn describe(&self) -> &str {
        match self {
            AccountRef::Tag(s) | AccountRef::AccountId(s) | AccountRef::Holder(s) => s,
        }
    }
}

/// The holder of a resolved account.
#[derive(Debug, Clone)]
pub enum Holder {
    User(StoredUser),
    Group(StoredGroup),
}

impl Holder {
    /// Tag used as sender/receiver reference on ledger entries.
    pub fn reference(&self) -> &str {
        match self {
            Holder::User(user) => user.handle(),
            Holder::Group(group) => &group.tag,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Holder::User(user) => user.full_name(),
            Holder::Group(group) => group.name.clone(),
        }
    }

    pub fn as_user(&self) -> Option<&StoredUser> {
        match self {
            Holder::User(user) => Some(user),
            Holder::Group(_) => None,
        }
    }
}

/// An account together with its holder.
#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    pub account: StoredAccount,
    pub holder: Holder,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("account not found")]
    NotFound,

    #[error("account belongs to a {actual}")]
    WrongKind { actual: AccountKind },

    #[error(transparent)]
    Storage(#[from] LedgerDbError),
}

impl ResolveError {
    /// Attach the transfer leg and reference for reporting.
    pub fn for_side(self, side: Side, reference: &AccountRef, expected: AccountKind) -> LedgerError {
        match self {
            ResolveError::NotFound => LedgerError::AccountNotFound {
                side,
                reference: reference.describe().to_string(),
            },
            ResolveError::WrongKind { actual } => LedgerError::WrongAccountKind {
                side,
                reference: reference.describe().to_string(),
                expected,
                actual,
            },
            ResolveError::Storage(e) => LedgerError::Persistence(e),
        }
    }
}

/// Lowercase a tag and check its format: 3 to 20 of `[a-z0-9_]`.
pub fn normalize_tag(tag: &str) -> Result<String, LedgerError> {
    let tag = tag.trim().trim_start_matches('@').to_lowercase();
    if tag.len() < TAG_MIN_LEN || tag.len() > TAG_MAX_LEN {
        return Err(LedgerError::validation(format!(
            "Tag must be between {TAG_MIN_LEN} and {TAG_MAX_LEN} characters"
        )));
    }
    if !tag.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_') {
        return Err(LedgerError::validation(
            "Tag may only contain letters, digits and underscores",
        ));
    }
    Ok(tag)
}

/// Resolves accounts over a snapshot or a unit of work.
pub struct AccountResolver<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> AccountResolver<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    /// Resolve `reference` to an account held by a `kind` holder.
    pub fn resolve(&self, reference: &AccountRef, kind: AccountKind) -> Result<ResolvedAccount, ResolveError> {
        match reference {
            AccountRef::Tag(tag) => self.resolve_tag(&tag.trim().trim_start_matches('@').to_lowercase(), kind),
            AccountRef::AccountId(account_id) => {
                let account = AccountRepository::new(self.tx)
                    .find(account_id)?
                    .ok_or(ResolveError::NotFound)?;
                if account.owner.kind() != kind {
                    return Err(ResolveError::WrongKind {
                        actual: account.owner.kind(),
                    });
                }
                let holder = self.load_holder(&account.owner)?;
                Ok(ResolvedAccount { account, holder })
            }
            AccountRef::Holder(id) => {
                let owner = match kind {
                    AccountKind::User => AccountOwner::User(id.clone()),
                    AccountKind::Group => AccountOwner::Group(id.clone()),
                };
                let holder = self.load_holder(&owner)?;
                self.account_of(owner, holder)
            }
        }
    }

    fn resolve_tag(&self, tag: &str, kind: AccountKind) -> Result<ResolvedAccount, ResolveError> {
        let users = UserRepository::new(self.tx);
        let groups = GroupRepository::new(self.tx);

        match kind {
            AccountKind::User => match users.find_by_tag(tag)? {
                Some(user) => self.account_of(AccountOwner::User(user.user_id.clone()), Holder::User(user)),
                None if groups.tag_taken(tag)? => Err(ResolveError::WrongKind {
                    actual: AccountKind::Group,
                }),
                None => Err(ResolveError::NotFound),
            },
            AccountKind::Group => match groups.find_by_tag(tag)? {
                Some(group) => self.account_of(AccountOwner::Group(group.group_id.clone()), Holder::Group(group)),
                None if users.tag_taken(tag)? => Err(ResolveError::WrongKind {
                    actual: AccountKind::User,
                }),
                None => Err(ResolveError::NotFound),
            },
        }
    }

    fn account_of(&self, owner: AccountOwner, holder: Holder) -> Result<ResolvedAccount, ResolveError> {
        let account = AccountRepository::new(self.tx)
            .find_for_owner(&owner)?
            .ok_or(ResolveError::NotFound)?;
        Ok(ResolvedAccount { account, holder })
    }

    fn load_holder(&self, owner: &AccountOwner) -> Result<Holder, ResolveError> {
        match owner {
            AccountOwner::User(id) => UserRepository::new(self.tx)
                .find(id)?
                .map(Holder::User)
                .ok_or(ResolveError::NotFound),
            AccountOwner::Group(id) => GroupRepository::new(self.tx)
                .find(id)?
                .map(Holder::Group)
                .ok_or(ResolveError::NotFound),
        }
    }
}
