// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group wallets: creation, member payments in, admin payouts out.

use std::collections::HashSet;

use serde_json::json;
use tracing::info;

use super::engine::{ensure_positive, move_funds, resolve_leg, EntryDraft, TransferEngine, TransferReceipt};
use super::error::{LedgerError, Side};
use super::money::Amount;
use super::resolver::{normalize_tag, AccountRef};
use crate::storage::{
    AccountKind, AccountOwner, AccountRepository, AuditEvent, AuditEventType, AuditRepository,
    GroupRepository, LedgerDbError, LedgerRead, OperationScope, StoredAccount, StoredGroup,
    StoredGroupMember, StoredUser, TransactionKind, UserRepository,
};

pub const GROUP_NAME_MAX_LEN: usize = 64;

/// Input for [`TransferEngine::create_group`].
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub tag: String,
    pub budget: Option<Amount>,
    /// Tags of the users to add as members.
    pub member_tags: Vec<String>,
}

/// A committed group with its account and members.
#[derive(Debug, Clone)]
pub struct GroupDetails {
    pub group: StoredGroup,
    pub account: StoredAccount,
    pub members: Vec<(StoredGroupMember, StoredUser)>,
}

impl GroupDetails {
    /// Load a group by tag. Visible only to its admin and members.
    pub fn load<R: LedgerRead>(tx: &R, tag: &str, viewer_user_id: &str) -> Result<Self, LedgerError> {
        let groups = GroupRepository::new(tx);
        let group = groups
            .find_by_tag(tag)?
            .ok_or_else(|| LedgerError::not_found("Group not found"))?;

        if group.admin_user_id != viewer_user_id && !groups.is_member(&group.group_id, viewer_user_id)? {
            return Err(LedgerError::not_found("Group not found"));
        }

        let account = AccountRepository::new(tx).get(&group.account_id)?;
        let users = UserRepository::new(tx);
        let mut members = Vec::new();
        for member in groups.members(&group.group_id)? {
            if let Some(user) = users.find(&member.user_id)? {
                members.push((member, user));
            }
        }
        Ok(Self {
            group,
            account,
            members,
        })
    }
}

impl TransferEngine {
    /// Create a group, its zero-balance account and its memberships atomically.
    pub async fn create_group(
        &self,
        scope: &OperationScope,
        creator_user_id: &str,
        request: NewGroup,
    ) -> Result<GroupDetails, LedgerError> {
        let name = request.name.trim().to_string();
        if name.is_empty() || name.chars().count() > GROUP_NAME_MAX_LEN {
            return Err(LedgerError::validation(format!(
                "Group name must be between 1 and {GROUP_NAME_MAX_LEN} characters"
            )));
        }
        let tag = normalize_tag(&request.tag)?;
        let member_tags = request
            .member_tags
            .iter()
            .map(|t| normalize_tag(t))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(budget) = request.budget {
            ensure_positive(budget)?;
        }

        let creator_user_id = creator_user_id.to_string();
        let bank_name = self.settings.bank_name.clone();
        let budget = request.budget;

        let details = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                let groups = GroupRepository::new(uow);
                if groups.tag_taken(&tag)? {
                    return Err(LedgerError::conflict(format!("Group tag '{tag}' is already taken")));
                }

                let users = UserRepository::new(uow);
                users
                    .find(&creator_user_id)?
                    .ok_or_else(|| LedgerError::not_found("User not found"))?;

                let mut seen = HashSet::new();
                let mut member_users = Vec::with_capacity(member_tags.len());
                for member_tag in &member_tags {
                    let user = users
                        .find_by_tag(member_tag)?
                        .ok_or_else(|| LedgerError::not_found(format!("User with tag '{member_tag}' does not exist")))?;
                    if user.user_id == creator_user_id {
                        return Err(LedgerError::validation(
                            "You cannot add yourself to the group as the group creator",
                        ));
                    }
                    if !seen.insert(user.user_id.clone()) {
                        return Err(LedgerError::validation(format!(
                            "'{member_tag}' is listed more than once"
                        )));
                    }
                    member_users.push(user);
                }

                let now = uow.now();
                let group_id = uuid::Uuid::new_v4().to_string();
                let mut account = StoredAccount::open(
                    AccountOwner::Group(group_id.clone()),
                    name.clone(),
                    bank_name,
                    Amount::ZERO,
                    now,
                );
                let group = StoredGroup {
                    group_id: group_id.clone(),
                    name,
                    tag,
                    budget,
                    admin_user_id: creator_user_id.clone(),
                    account_id: account.account_id.clone(),
                    created_at: now,
                };

                groups.create(&group).map_err(|e| match e {
                    LedgerDbError::AlreadyExists(_) => {
                        LedgerError::conflict(format!("Group tag '{}' is already taken", group.tag))
                    }
                    other => other.into(),
                })?;
                AccountRepository::new(uow).create(&mut account)?;

                let mut members = Vec::with_capacity(member_users.len());
                for user in member_users {
                    let member = StoredGroupMember {
                        group_id: group_id.clone(),
                        user_id: user.user_id.clone(),
                        joined_at: now,
                    };
                    groups.add_member(&member)?;
                    members.push((member, user));
                }

                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::GroupCreated)
                        .with_user(&creator_user_id)
                        .with_resource("group", &group.group_id)
                        .with_details(json!({ "tag": group.tag, "members": members.len() })),
                )?;

                Ok(GroupDetails {
                    group,
                    account,
                    members,
                })
            })
            .await?;

        info!(
            group_id = %details.group.group_id,
            tag = %details.group.tag,
            members = details.members.len(),
            "Group created"
        );
        Ok(details)
    }

    /// Pay from the caller's personal account into a group account.
    pub async fn group_transfer(
        &self,
        scope: &OperationScope,
        payer_user_id: &str,
        group_tag: &str,
        amount: Amount,
        description: String,
    ) -> Result<TransferReceipt, LedgerError> {
        let payer_user_id = payer_user_id.to_string();
        let group_ref = AccountRef::tag(group_tag);

        let settlement = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                ensure_positive(amount)?;
                let source = resolve_leg(
                    uow,
                    &AccountRef::Holder(payer_user_id.clone()),
                    AccountKind::User,
                    Side::Source,
                )?;
                let destination = resolve_leg(uow, &group_ref, AccountKind::Group, Side::Destination)?;
                move_funds(
                    uow,
                    source,
                    destination,
                    EntryDraft {
                        initiator_user_id: payer_user_id,
                        amount,
                        description,
                        kind: TransactionKind::GroupPayment,
                        audit: AuditEventType::GroupPaymentCompleted,
                    },
                )
            })
            .await?;

        info!(
            transaction_id = %settlement.transaction.transaction_id,
            amount = %settlement.transaction.amount,
            group = %settlement.transaction.receiver_ref,
            "Group payment completed"
        );
        Ok(self.notify(settlement).await)
    }

    /// Pay from a group account to one of its members. Admin only.
    pub async fn group_payout(
        &self,
        scope: &OperationScope,
        admin_user_id: &str,
        group_tag: &str,
        member_tag: &str,
        amount: Amount,
        description: String,
    ) -> Result<TransferReceipt, LedgerError> {
        let admin_user_id = admin_user_id.to_string();
        let group_ref = AccountRef::tag(group_tag);
        let member_ref = AccountRef::tag(member_tag);

        let settlement = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                ensure_positive(amount)?;
                let source = resolve_leg(uow, &group_ref, AccountKind::Group, Side::Source)?;
                let group_id = source.account.owner.id().to_string();
                let group = GroupRepository::new(uow)
                    .find(&group_id)?
                    .ok_or_else(|| LedgerError::not_found("Group not found"))?;
                if group.admin_user_id != admin_user_id {
                    return Err(LedgerError::Forbidden(
                        "Only the group admin can pay out from the group".to_string(),
                    ));
                }

                let destination = resolve_leg(uow, &member_ref, AccountKind::User, Side::Destination)?;
                let member_id = destination.account.owner.id();
                if member_id != group.admin_user_id && !GroupRepository::new(uow).is_member(&group_id, member_id)? {
                    return Err(LedgerError::validation(format!(
                        "'{}' is not a member of this group",
                        destination.holder.reference()
                    )));
                }

                move_funds(
                    uow,
                    source,
                    destination,
                    EntryDraft {
                        initiator_user_id: admin_user_id,
                        amount,
                        description,
                        kind: TransactionKind::GroupPayment,
                        audit: AuditEventType::GroupPayoutCompleted,
                    },
                )
            })
            .await?;

        info!(
            transaction_id = %settlement.transaction.transaction_id,
            amount = %settlement.transaction.amount,
            group = %settlement.transaction.sender_ref,
            member = %settlement.transaction.receiver_ref,
            "Group payout completed"
        );
        Ok(self.notify(settlement).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::engine::test_support::*;
    use crate::notifications::test_support::RecordingSms;
    use crate::storage::ledger_db::{ACCOUNTS, ACCOUNT_OWNERS, GROUP_MEMBERS};
    use crate::storage::{TransactionRepository, TransactionStatus};

    fn new_group(tag: &str, members: &[&str]) -> NewGroup {
        NewGroup {
            name: "Lagos Trip".to_string(),
            tag: tag.to_string(),
            budget: Some(naira("50000")),
            member_tags: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn group_exists(engine: &TransferEngine, tag: &str) -> bool {
        let snap = engine.db.snapshot().unwrap();
        GroupRepository::new(&snap).tag_taken(tag).unwrap()
    }

    /// (all accounts, group-owned accounts, membership rows)
    fn stored_rows(engine: &TransferEngine) -> (usize, usize, usize) {
        let snap = engine.db.snapshot().unwrap();
        let accounts = snap.scan_json::<StoredAccount>(ACCOUNTS, usize::MAX).unwrap().len();
        let group_accounts = snap
            .scan_keys(ACCOUNT_OWNERS, usize::MAX, &|key| key.starts_with("group:"))
            .unwrap()
            .len();
        let members = snap
            .scan_index(GROUP_MEMBERS, &[], &[0xff], None, usize::MAX)
            .unwrap()
            .len();
        (accounts, group_accounts, members)
    }

    #[tokio::test]
    async fn creates_group_account_and_members() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "0");
        seed_user(&engine.db, "chidi", "+2348000000003", "0");

        let details = engine
            .create_group(&scope(), &ada.user_id, new_group("Trip", &["bola", "@chidi"]))
            .await
            .unwrap();

        assert_eq!(details.group.tag, "trip");
        assert_eq!(details.group.admin_user_id, ada.user_id);
        assert_eq!(details.account.balance, Amount::ZERO);
        assert_eq!(details.account.owner, AccountOwner::Group(details.group.group_id.clone()));
        assert_eq!(details.members.len(), 2);

        let snap = engine.db.snapshot().unwrap();
        let loaded = GroupDetails::load(&snap, "trip", &bola.user_id).unwrap();
        assert_eq!(loaded.group.group_id, details.group.group_id);
        assert_eq!(loaded.members.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_tag_is_a_conflict() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        seed_user(&engine.db, "bola", "+2348000000002", "0");

        engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola"]))
            .await
            .unwrap();
        let before = stored_rows(&engine);
        assert_eq!(before, (3, 1, 1));

        let err = engine
            .create_group(&scope(), &ada.user_id, new_group("TRIP", &["bola"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(stored_rows(&engine), before);
    }

    #[tokio::test]
    async fn unresolvable_member_persists_nothing() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        seed_user(&engine.db, "bola", "+2348000000002", "0");

        let err = engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola", "ghost"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert!(!group_exists(&engine, "trip"));
        assert_eq!(stored_rows(&engine), (2, 0, 0));
    }

    #[tokio::test]
    async fn name_length_counts_characters() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");

        let mut request = new_group("owambe", &[]);
        request.name = "ọ".repeat(GROUP_NAME_MAX_LEN);
        let details = engine.create_group(&scope(), &ada.user_id, request).await.unwrap();
        assert_eq!(details.group.name.chars().count(), GROUP_NAME_MAX_LEN);

        let mut request = new_group("owambe2", &[]);
        request.name = "ọ".repeat(GROUP_NAME_MAX_LEN + 1);
        let err = engine.create_group(&scope(), &ada.user_id, request).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn creator_and_duplicates_are_rejected() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        seed_user(&engine.db, "bola", "+2348000000002", "0");

        let err = engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola", "ada"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola", "BOLA"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(!group_exists(&engine, "trip"));
    }

    #[tokio::test]
    async fn member_pays_in_and_admin_pays_out() {
        let sms = Arc::new(RecordingSms::default());
        let (engine, _dir) = temp_engine(sms.clone());
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "500");

        let details = engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola"]))
            .await
            .unwrap();
        let group_owner = AccountOwner::Group(details.group.group_id.clone());

        let paid_in = engine
            .group_transfer(&scope(), &bola.user_id, "trip", naira("200"), "fuel".into())
            .await
            .unwrap();
        assert_eq!(paid_in.transaction.kind, TransactionKind::GroupPayment);
        assert_eq!(paid_in.transaction.receiver_ref, "trip");
        assert_eq!(paid_in.source_balance, naira("300"));
        assert_eq!(balance_of(&engine.db, group_owner.clone()), naira("200"));
        assert_eq!(sms.messages().len(), 1);

        let paid_out = engine
            .group_payout(&scope(), &ada.user_id, "trip", "bola", naira("50"), "refund".into())
            .await
            .unwrap();
        assert_eq!(paid_out.transaction.sender_ref, "trip");
        assert_eq!(paid_out.transaction.receiver_ref, "bola");
        assert_eq!(paid_out.transaction.status, TransactionStatus::Completed);
        assert_eq!(balance_of(&engine.db, group_owner.clone()), naira("150"));
        assert_eq!(user_balance(&engine.db, &bola), naira("350"));

        let snap = engine.db.snapshot().unwrap();
        let history = TransactionRepository::new(&snap)
            .list_for_owner(&group_owner, None, 10)
            .unwrap();
        assert_eq!(history.entries.len(), 2);
    }

    #[tokio::test]
    async fn payout_is_admin_only_and_member_only() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "500");
        seed_user(&engine.db, "chidi", "+2348000000003", "0");

        engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &["bola"]))
            .await
            .unwrap();
        engine
            .group_transfer(&scope(), &bola.user_id, "trip", naira("100"), String::new())
            .await
            .unwrap();

        let err = engine
            .group_payout(&scope(), &bola.user_id, "trip", "bola", naira("10"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = engine
            .group_payout(&scope(), &ada.user_id, "trip", "chidi", naira("10"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = engine
            .group_payout(&scope(), &ada.user_id, "trip", "bola", naira("100.01"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn group_tag_used_as_user_is_wrong_kind() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &[]))
            .await
            .unwrap();

        let err = engine.transfer(&scope(), order(&ada, "trip", "10")).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::WrongAccountKind {
                actual: AccountKind::Group,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn outsiders_cannot_view_a_group() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let chidi = seed_user(&engine.db, "chidi", "+2348000000003", "0");
        engine
            .create_group(&scope(), &ada.user_id, new_group("trip", &[]))
            .await
            .unwrap();

        let snap = engine.db.snapshot().unwrap();
        assert!(GroupDetails::load(&snap, "trip", &ada.user_id).is_ok());
        assert!(matches!(
            GroupDetails::load(&snap, "trip", &chidi.user_id),
            Err(LedgerError::NotFound(_))
        ));
    }
}
