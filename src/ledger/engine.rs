// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance-transfer engine.
//!
//! Every operation that moves money runs as one [`UnitOfWork`]: resolve both
//! accounts, check preconditions, debit, credit, append the ledger entry and
//! its audit event. Nothing is written unless all of it is. Notifications are
//! sent after commit and can only ever produce a warning.
//!
//! Preconditions are checked in a fixed order and the first failure wins:
//! positive amount, then sufficient balance, then distinct accounts.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::error::{LedgerError, Side};
use super::money::Amount;
use super::resolver::{normalize_tag, AccountRef, AccountResolver, Holder, ResolvedAccount};
use crate::notifications::{Notice, NotificationDispatcher, NotificationWarning};
use crate::storage::{
    signup_level, AccountKind, AccountOwner, AccountRepository, ActivityRole, AuditEvent,
    AuditEventType, AuditRepository, KycStatus, LedgerDb, LedgerDbError, OperationScope,
    StoredAccount, StoredTransaction, StoredUser, TransactionEnvironment, TransactionKind,
    TransactionRepository, TransactionStatus, UnitOfWork, UserRepository,
};

/// Ledger-wide settings taken from configuration.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Bank name printed on every virtual account.
    pub bank_name: String,
    /// Balance a user account starts with when its tag is assigned.
    pub opening_balance: Amount,
}

/// A direct transfer between two user accounts.
#[derive(Debug, Clone)]
pub struct TransferOrder {
    pub initiator_user_id: String,
    pub source: AccountRef,
    pub destination: AccountRef,
    pub amount: Amount,
    pub description: String,
}

/// Result of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction: StoredTransaction,
    /// Balance of the debited account after the transfer.
    pub source_balance: Amount,
    pub warning: Option<NotificationWarning>,
}

/// Result of a committed funds request.
#[derive(Debug, Clone)]
pub struct RequestReceipt {
    pub transaction: StoredTransaction,
    pub warning: Option<NotificationWarning>,
}

/// A funds request paid by its requestee.
#[derive(Debug, Clone)]
pub struct RequestSettlement {
    pub request: StoredTransaction,
    pub transfer: TransferReceipt,
}

/// What the ledger entry for a move of funds should say.
pub(crate) struct EntryDraft {
    pub initiator_user_id: String,
    pub amount: Amount,
    pub description: String,
    pub kind: TransactionKind,
    pub audit: AuditEventType,
}

/// Both legs of a committed move, with post-transfer balances.
pub(crate) struct Settlement {
    pub transaction: StoredTransaction,
    pub source: ResolvedAccount,
    pub destination: ResolvedAccount,
}

impl Settlement {
    /// SMS notices for the parties of this move.
    pub(crate) fn notices(&self) -> Vec<Notice> {
        let amount = self.transaction.amount;
        let source_balance = self.source.account.balance;
        let destination_balance = self.destination.account.balance;

        match (&self.source.holder, &self.destination.holder) {
            (Holder::User(payer), Holder::User(payee)) => vec![
                Notice::debit(&payer.phone_number, amount, source_balance),
                Notice::credit(&payee.phone_number, amount, payer.handle(), destination_balance),
            ],
            (Holder::User(payer), Holder::Group(group)) => {
                vec![Notice::group_debit(&payer.phone_number, amount, &group.tag, source_balance)]
            }
            (Holder::Group(group), Holder::User(payee)) => {
                vec![Notice::group_payout(&payee.phone_number, amount, &group.tag, destination_balance)]
            }
            (Holder::Group(_), Holder::Group(_)) => Vec::new(),
        }
    }

    fn into_receipt(self, warning: Option<NotificationWarning>) -> TransferReceipt {
        TransferReceipt {
            source_balance: self.source.account.balance,
            transaction: self.transaction,
            warning,
        }
    }
}

/// Moves money between virtual accounts.
#[derive(Clone)]
pub struct TransferEngine {
    pub(crate) db: LedgerDb,
    pub(crate) notifier: NotificationDispatcher,
    pub(crate) settings: Arc<LedgerSettings>,
}

impl TransferEngine {
    pub fn new(db: LedgerDb, notifier: NotificationDispatcher, settings: LedgerSettings) -> Self {
        Self {
            db,
            notifier,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Move `amount` from one user account to another.
    pub async fn transfer(&self, scope: &OperationScope, order: TransferOrder) -> Result<TransferReceipt, LedgerError> {
        let settlement = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                ensure_positive(order.amount)?;
                let source = resolve_leg(uow, &order.source, AccountKind::User, Side::Source)?;
                let destination = resolve_leg(uow, &order.destination, AccountKind::User, Side::Destination)?;
                move_funds(
                    uow,
                    source,
                    destination,
                    EntryDraft {
                        initiator_user_id: order.initiator_user_id,
                        amount: order.amount,
                        description: order.description,
                        kind: TransactionKind::TransferOut,
                        audit: AuditEventType::TransferCompleted,
                    },
                )
            })
            .await?;

        info!(
            transaction_id = %settlement.transaction.transaction_id,
            amount = %settlement.transaction.amount,
            sender = %settlement.transaction.sender_ref,
            receiver = %settlement.transaction.receiver_ref,
            "Transfer completed"
        );

        let warning = self.notifier.dispatch(settlement.notices()).await;
        Ok(settlement.into_receipt(warning))
    }

    pub(crate) async fn notify(&self, settlement: Settlement) -> TransferReceipt {
        let warning = self.notifier.dispatch(settlement.notices()).await;
        settlement.into_receipt(warning)
    }

    // =========================================================================
    // Funds Requests
    // =========================================================================

    /// Ask another user for funds. Records a pending request; moves nothing.
    pub async fn request_funds(
        &self,
        scope: &OperationScope,
        requester_user_id: &str,
        requestee: AccountRef,
        amount: Amount,
        description: String,
    ) -> Result<RequestReceipt, LedgerError> {
        let requester_user_id = requester_user_id.to_string();

        let (transaction, requestee_user, requester_tag) = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                ensure_positive(amount)?;
                let requester = resolve_leg(
                    uow,
                    &AccountRef::Holder(requester_user_id.clone()),
                    AccountKind::User,
                    Side::Destination,
                )?;
                let payer = resolve_leg(uow, &requestee, AccountKind::User, Side::Source)?;
                if payer.account.account_id == requester.account.account_id {
                    return Err(LedgerError::SelfTransferRejected);
                }

                let now = uow.now();
                let transaction = StoredTransaction {
                    transaction_id: uuid::Uuid::new_v4().to_string(),
                    initiator_user_id: requester_user_id.clone(),
                    amount,
                    description,
                    environment: TransactionEnvironment::WithinSystem,
                    kind: TransactionKind::Request,
                    sender_ref: payer.holder.reference().to_string(),
                    receiver_ref: requester.holder.reference().to_string(),
                    source_account_id: None,
                    destination_account_id: None,
                    counterparty_user_id: Some(payer.account.owner.id().to_string()),
                    settlement_id: None,
                    status: TransactionStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                TransactionRepository::new(uow).record(
                    &transaction,
                    &[
                        (&requester.account.owner, ActivityRole::Requester),
                        (&payer.account.owner, ActivityRole::Requestee),
                    ],
                )?;
                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::FundsRequested)
                        .with_user(&requester_user_id)
                        .with_resource("transaction", &transaction.transaction_id)
                        .with_details(json!({
                            "amount": transaction.amount.to_string(),
                            "requestee": transaction.sender_ref,
                        })),
                )?;

                let requestee_user = payer.holder.as_user().cloned();
                let requester_tag = requester.holder.reference().to_string();
                Ok((transaction, requestee_user, requester_tag))
            })
            .await?;

        info!(
            transaction_id = %transaction.transaction_id,
            amount = %transaction.amount,
            requestee = %transaction.sender_ref,
            "Funds requested"
        );

        let notices = requestee_user
            .map(|user| {
                vec![Notice::funds_request(
                    &user.phone_number,
                    user.first_name.as_deref().unwrap_or_default(),
                    user.last_name.as_deref().unwrap_or_default(),
                    &requester_tag,
                    transaction.amount,
                )]
            })
            .unwrap_or_default();
        let warning = self.notifier.dispatch(notices).await;

        Ok(RequestReceipt { transaction, warning })
    }

    /// Pay a pending funds request. Only its requestee may do so.
    pub async fn pay_request(
        &self,
        scope: &OperationScope,
        caller_user_id: &str,
        transaction_id: &str,
    ) -> Result<RequestSettlement, LedgerError> {
        let caller_user_id = caller_user_id.to_string();
        let transaction_id = transaction_id.to_string();

        let (request, settlement) = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                let request = load_pending_request(uow, &transaction_id, &caller_user_id)?;

                ensure_positive(request.amount)?;
                let source = resolve_leg(
                    uow,
                    &AccountRef::Holder(caller_user_id.clone()),
                    AccountKind::User,
                    Side::Source,
                )?;
                let destination = resolve_leg(
                    uow,
                    &AccountRef::Holder(request.initiator_user_id.clone()),
                    AccountKind::User,
                    Side::Destination,
                )?;
                let settlement = move_funds(
                    uow,
                    source,
                    destination,
                    EntryDraft {
                        initiator_user_id: caller_user_id.clone(),
                        amount: request.amount,
                        description: request.description.clone(),
                        kind: TransactionKind::TransferOut,
                        audit: AuditEventType::TransferCompleted,
                    },
                )?;

                let request = TransactionRepository::new(uow).update_status(
                    &request.transaction_id,
                    TransactionStatus::Completed,
                    Some(settlement.transaction.transaction_id.clone()),
                )?;
                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::FundsRequestSettled)
                        .with_user(&caller_user_id)
                        .with_resource("transaction", &request.transaction_id)
                        .with_details(json!({ "settlement_id": settlement.transaction.transaction_id })),
                )?;

                Ok((request, settlement))
            })
            .await?;

        info!(
            transaction_id = %request.transaction_id,
            settlement_id = %settlement.transaction.transaction_id,
            amount = %request.amount,
            "Funds request settled"
        );

        let transfer = self.notify(settlement).await;
        Ok(RequestSettlement { request, transfer })
    }

    /// Decline a pending funds request. Only its requestee may do so.
    pub async fn decline_request(
        &self,
        scope: &OperationScope,
        caller_user_id: &str,
        transaction_id: &str,
    ) -> Result<StoredTransaction, LedgerError> {
        let caller_user_id = caller_user_id.to_string();
        let transaction_id = transaction_id.to_string();

        let request = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                let request = load_pending_request(uow, &transaction_id, &caller_user_id)?;
                let request = TransactionRepository::new(uow).update_status(
                    &request.transaction_id,
                    TransactionStatus::Failed,
                    None,
                )?;
                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::FundsRequestDeclined)
                        .with_user(&caller_user_id)
                        .with_resource("transaction", &request.transaction_id),
                )?;
                Ok(request)
            })
            .await?;

        info!(transaction_id = %request.transaction_id, "Funds request declined");
        Ok(request)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Assign a user's tag and open their account, in one unit of work.
    pub async fn assign_tag(
        &self,
        scope: &OperationScope,
        user_id: &str,
        tag: &str,
    ) -> Result<(StoredUser, StoredAccount), LedgerError> {
        let tag = normalize_tag(tag)?;
        let user_id = user_id.to_string();
        let settings = Arc::clone(&self.settings);

        let (user, account) = self
            .db
            .write(scope, move |uow| -> Result<_, LedgerError> {
                let users = UserRepository::new(uow);
                let mut user = users
                    .find(&user_id)?
                    .ok_or_else(|| LedgerError::not_found("User not found"))?;

                if user.kyc_status != KycStatus::Verified {
                    return Err(LedgerError::validation(
                        "Complete BVN verification before choosing a tag",
                    ));
                }
                if user.tag.is_some() {
                    return Err(LedgerError::conflict("A tag has already been assigned to this user"));
                }
                if users.tag_taken(&tag)? {
                    return Err(LedgerError::conflict("Tag is already taken"));
                }

                user.tag = Some(tag.clone());
                user.signup_level = user.signup_level.max(signup_level::TAG_ASSIGNED);
                users.save(&mut user).map_err(|e| match e {
                    LedgerDbError::AlreadyExists(_) => LedgerError::conflict("Tag is already taken"),
                    other => other.into(),
                })?;

                let mut account = StoredAccount::open(
                    AccountOwner::User(user.user_id.clone()),
                    user.full_name(),
                    settings.bank_name.clone(),
                    settings.opening_balance,
                    uow.now(),
                );
                AccountRepository::new(uow).create(&mut account).map_err(|e| match e {
                    LedgerDbError::AlreadyExists(_) => LedgerError::conflict("User already has an account"),
                    other => other.into(),
                })?;

                AuditRepository::new(uow).log(
                    AuditEvent::new(AuditEventType::TagAssigned)
                        .with_user(&user.user_id)
                        .with_resource("account", &account.account_id)
                        .with_details(json!({ "tag": tag })),
                )?;

                Ok((user, account))
            })
            .await?;

        info!(user_id = %user.user_id, account_id = %account.account_id, "Tag assigned and account opened");
        Ok((user, account))
    }
}

// =============================================================================
// Unit-of-Work Steps
// =============================================================================

pub(crate) fn ensure_positive(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

pub(crate) fn resolve_leg(
    uow: &UnitOfWork<'_>,
    reference: &AccountRef,
    kind: AccountKind,
    side: Side,
) -> Result<ResolvedAccount, LedgerError> {
    AccountResolver::new(uow)
        .resolve(reference, kind)
        .map_err(|e| e.for_side(side, reference, kind))
}

/// Debit `source`, credit `destination` and append the completed entry.
pub(crate) fn move_funds(
    uow: &UnitOfWork<'_>,
    mut source: ResolvedAccount,
    mut destination: ResolvedAccount,
    draft: EntryDraft,
) -> Result<Settlement, LedgerError> {
    ensure_positive(draft.amount)?;

    let available = source.account.balance;
    if available < draft.amount {
        return Err(LedgerError::InsufficientFunds {
            available,
            requested: draft.amount,
        });
    }
    if source.account.account_id == destination.account.account_id {
        return Err(LedgerError::SelfTransferRejected);
    }

    let debited = available
        .checked_sub(draft.amount)
        .ok_or(LedgerError::InsufficientFunds {
            available,
            requested: draft.amount,
        })?;
    let credited = destination
        .account
        .balance
        .checked_add(draft.amount)
        .ok_or(LedgerError::BalanceOverflow)?;

    let accounts = AccountRepository::new(uow);
    accounts.save_balance(&mut source.account, debited)?;
    accounts.save_balance(&mut destination.account, credited)?;

    let now = uow.now();
    let transaction = StoredTransaction {
        transaction_id: uuid::Uuid::new_v4().to_string(),
        initiator_user_id: draft.initiator_user_id,
        amount: draft.amount,
        description: draft.description,
        environment: TransactionEnvironment::WithinSystem,
        kind: draft.kind,
        sender_ref: source.holder.reference().to_string(),
        receiver_ref: destination.holder.reference().to_string(),
        source_account_id: Some(source.account.account_id.clone()),
        destination_account_id: Some(destination.account.account_id.clone()),
        counterparty_user_id: None,
        settlement_id: None,
        status: TransactionStatus::Completed,
        created_at: now,
        updated_at: now,
    };
    TransactionRepository::new(uow).record(
        &transaction,
        &[
            (&source.account.owner, ActivityRole::Sender),
            (&destination.account.owner, ActivityRole::Receiver),
        ],
    )?;

    AuditRepository::new(uow).log(
        AuditEvent::new(draft.audit)
            .with_user(&transaction.initiator_user_id)
            .with_resource("transaction", &transaction.transaction_id)
            .with_details(json!({
                "amount": transaction.amount.to_string(),
                "source_account_id": source.account.account_id,
                "destination_account_id": destination.account.account_id,
            })),
    )?;

    Ok(Settlement {
        transaction,
        source,
        destination,
    })
}

fn load_pending_request(
    uow: &UnitOfWork<'_>,
    transaction_id: &str,
    caller_user_id: &str,
) -> Result<StoredTransaction, LedgerError> {
    let request = TransactionRepository::new(uow)
        .find(transaction_id)?
        .filter(|tx| tx.kind == TransactionKind::Request)
        .ok_or_else(|| LedgerError::not_found("Funds request not found"))?;

    if request.counterparty_user_id.as_deref() != Some(caller_user_id) {
        if request.initiator_user_id == caller_user_id {
            return Err(LedgerError::Forbidden(
                "Only the requested user can settle this request".to_string(),
            ));
        }
        // Non-participants don't learn that the request exists
        return Err(LedgerError::not_found("Funds request not found"));
    }
    if request.status != TransactionStatus::Pending {
        warn!(transaction_id, status = %request.status, "Funds request already settled");
        return Err(LedgerError::conflict(format!(
            "Funds request is already {}",
            request.status
        )));
    }
    Ok(request)
}

// =============================================================================
// Test Support
// =============================================================================


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::notifications::test_support::{FailingSms, RecordingSms};
    use crate::storage::TransactionRepository;

    fn history_len(db: &LedgerDb, user: &StoredUser) -> usize {
        let snap = db.snapshot().unwrap();
        TransactionRepository::new(&snap)
            .list_for_owner(&AccountOwner::User(user.user_id.clone()), None, 100)
            .unwrap()
            .entries
            .len()
    }

    #[tokio::test]
    async fn transfer_conserves_funds() {
        let sms = Arc::new(RecordingSms::default());
        let (engine, _dir) = temp_engine(sms.clone());
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "1000");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "500");

        let receipt = engine.transfer(&scope(), order(&ada, "bola", "300")).await.unwrap();

        assert_eq!(user_balance(&engine.db, &ada), naira("700"));
        assert_eq!(user_balance(&engine.db, &bola), naira("800"));
        assert_eq!(receipt.source_balance, naira("700"));
        assert_eq!(receipt.transaction.amount, naira("300"));
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        assert_eq!(receipt.transaction.sender_ref, "ada");
        assert_eq!(receipt.transaction.receiver_ref, "bola");
        assert!(receipt.warning.is_none());
        assert_eq!(history_len(&engine.db, &ada), 1);
        assert_eq!(history_len(&engine.db, &bola), 1);

        let sent = sms.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("debited with 300.00"));
        assert!(sent[1].1.contains("credited with 300.00 by ada"));
    }

    #[tokio::test]
    async fn insufficient_funds_changes_nothing() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "0");

        let err = engine
            .transfer(&scope(), order(&ada, "bola", "100.01"))
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientFunds { available, requested } => {
                assert_eq!(available, naira("100"));
                assert_eq!(requested, naira("100.01"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(user_balance(&engine.db, &ada), naira("100"));
        assert_eq!(user_balance(&engine.db, &bola), Amount::ZERO);
        assert_eq!(history_len(&engine.db, &ada), 0);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_first() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");

        // Zero amount wins over the unknown receiver
        let err = engine.transfer(&scope(), order(&ada, "nobody", "0")).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount));
    }

    #[tokio::test]
    async fn self_transfer_is_rejected() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "50");

        let err = engine.transfer(&scope(), order(&ada, "ada", "10")).await.unwrap_err();
        assert!(matches!(err, LedgerError::SelfTransferRejected));
        assert_eq!(user_balance(&engine.db, &ada), naira("50"));
        assert_eq!(history_len(&engine.db, &ada), 0);
    }

    #[tokio::test]
    async fn unknown_receiver_reports_destination_side() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "50");

        let err = engine.transfer(&scope(), order(&ada, "ghost", "10")).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AccountNotFound {
                side: Side::Destination,
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overdraft_admits_exactly_one() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "0");
        let chidi = seed_user(&engine.db, "chidi", "+2348000000003", "0");

        let first = {
            let engine = engine.clone();
            let order = order(&ada, "bola", "70");
            tokio::spawn(async move { engine.transfer(&scope(), order).await })
        };
        let second = {
            let engine = engine.clone();
            let order = order(&ada, "chidi", "60");
            tokio::spawn(async move { engine.transfer(&scope(), order).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))));

        let remaining = user_balance(&engine.db, &ada);
        let credited = user_balance(&engine.db, &bola)
            .checked_add(user_balance(&engine.db, &chidi))
            .unwrap();
        assert_eq!(remaining.checked_add(credited).unwrap(), naira("100"));
    }

    #[tokio::test]
    async fn mutual_transfers_both_complete() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "100");

        let (first, second) = (scope(), scope());
        let (a, b) = tokio::join!(
            engine.transfer(&first, order(&ada, "bola", "30")),
            engine.transfer(&second, order(&bola, "ada", "20")),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(user_balance(&engine.db, &ada), naira("90"));
        assert_eq!(user_balance(&engine.db, &bola), naira("110"));
    }

    #[tokio::test]
    async fn notification_failure_is_a_warning() {
        let (engine, _dir) = temp_engine(Arc::new(FailingSms));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "0");

        let receipt = engine.transfer(&scope(), order(&ada, "bola", "40")).await.unwrap();

        let warning = receipt.warning.unwrap();
        assert_eq!(warning.kind, crate::notifications::NOTIFICATION_FAILURE);
        assert_eq!(warning.failed, 2);
        assert_eq!(user_balance(&engine.db, &ada), naira("60"));
        assert_eq!(user_balance(&engine.db, &bola), naira("40"));
    }

    #[tokio::test]
    async fn cancelled_transfer_never_commits() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "100");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "0");

        let scope = scope();
        scope.cancel_token().cancel();
        let err = engine.transfer(&scope, order(&ada, "bola", "10")).await.unwrap_err();

        assert!(matches!(err, LedgerError::Persistence(LedgerDbError::Cancelled)));
        assert_eq!(user_balance(&engine.db, &ada), naira("100"));
        assert_eq!(user_balance(&engine.db, &bola), Amount::ZERO);
    }

    #[tokio::test]
    async fn funds_request_is_pending_and_notifies_requestee() {
        let sms = Arc::new(RecordingSms::default());
        let (engine, _dir) = temp_engine(sms.clone());
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "100");

        let receipt = engine
            .request_funds(&scope(), &ada.user_id, AccountRef::tag("bola"), naira("25"), "lunch".into())
            .await
            .unwrap();

        let tx = receipt.transaction;
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.kind, TransactionKind::Request);
        assert_eq!(tx.sender_ref, "bola");
        assert_eq!(tx.receiver_ref, "ada");
        assert_eq!(tx.counterparty_user_id.as_deref(), Some(bola.user_id.as_str()));
        assert_eq!(user_balance(&engine.db, &bola), naira("100"));

        let sent = sms.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+2348000000002");
        assert!(sent[0].1.contains("request from ada"));
    }

    #[tokio::test]
    async fn requesting_from_yourself_is_rejected() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");

        let err = engine
            .request_funds(&scope(), &ada.user_id, AccountRef::tag("ada"), naira("5"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SelfTransferRejected));
    }

    #[tokio::test]
    async fn paying_a_request_settles_it_once() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "100");

        let request = engine
            .request_funds(&scope(), &ada.user_id, AccountRef::tag("bola"), naira("25"), "lunch".into())
            .await
            .unwrap()
            .transaction;

        // Requester cannot pay their own request
        let err = engine
            .pay_request(&scope(), &ada.user_id, &request.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let settled = engine
            .pay_request(&scope(), &bola.user_id, &request.transaction_id)
            .await
            .unwrap();
        assert_eq!(settled.request.status, TransactionStatus::Completed);
        assert_eq!(
            settled.request.settlement_id.as_deref(),
            Some(settled.transfer.transaction.transaction_id.as_str())
        );
        assert_eq!(user_balance(&engine.db, &ada), naira("25"));
        assert_eq!(user_balance(&engine.db, &bola), naira("75"));

        let err = engine
            .pay_request(&scope(), &bola.user_id, &request.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(user_balance(&engine.db, &bola), naira("75"));
    }

    #[tokio::test]
    async fn unaffordable_request_stays_pending() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "10");

        let request = engine
            .request_funds(&scope(), &ada.user_id, AccountRef::tag("bola"), naira("25"), String::new())
            .await
            .unwrap()
            .transaction;

        let err = engine
            .pay_request(&scope(), &bola.user_id, &request.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        let snap = engine.db.snapshot().unwrap();
        let stored = TransactionRepository::new(&snap).get(&request.transaction_id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn declining_a_request_marks_it_failed() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        let ada = seed_user(&engine.db, "ada", "+2348000000001", "0");
        let bola = seed_user(&engine.db, "bola", "+2348000000002", "100");
        let chidi = seed_user(&engine.db, "chidi", "+2348000000003", "0");

        let request = engine
            .request_funds(&scope(), &ada.user_id, AccountRef::tag("bola"), naira("25"), String::new())
            .await
            .unwrap()
            .transaction;

        let err = engine
            .decline_request(&scope(), &chidi.user_id, &request.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let declined = engine
            .decline_request(&scope(), &bola.user_id, &request.transaction_id)
            .await
            .unwrap();
        assert_eq!(declined.status, TransactionStatus::Failed);

        let err = engine
            .pay_request(&scope(), &bola.user_id, &request.transaction_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn assign_tag_opens_account_with_opening_balance() {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("ledger.redb")).unwrap();
        let engine = TransferEngine::new(
            db.clone(),
            NotificationDispatcher::new(Arc::new(RecordingSms::default())),
            LedgerSettings {
                bank_name: "Guaranty Trust Bank".to_string(),
                opening_balance: naira("1000"),
            },
        );

        let user = db
            .write_blocking(|uow| {
                let mut user = StoredUser::with_verified_phone("+2348000000009", uow.now());
                user.kyc_status = KycStatus::Verified;
                user.bvn_verified = true;
                UserRepository::new(uow).create(&user)?;
                Ok::<_, LedgerDbError>(user)
            })
            .unwrap();

        let (user, account) = engine.assign_tag(&scope(), &user.user_id, "@Dayo").await.unwrap();
        assert_eq!(user.tag.as_deref(), Some("dayo"));
        assert_eq!(user.signup_level, signup_level::TAG_ASSIGNED);
        assert_eq!(account.balance, naira("1000"));
        assert_eq!(account.bank_name, "Guaranty Trust Bank");
        assert_eq!(account.account_number.len(), 10);

        let err = engine.assign_tag(&scope(), &user.user_id, "other").await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn assign_tag_requires_kyc_and_a_free_tag() {
        let (engine, _dir) = temp_engine(Arc::new(RecordingSms::default()));
        seed_user(&engine.db, "taken", "+2348000000001", "0");

        let (pending, verified) = engine
            .db
            .write_blocking(|uow| {
                let users = UserRepository::new(uow);
                let pending = StoredUser::with_verified_phone("+2348000000002", uow.now());
                users.create(&pending)?;
                let mut verified = StoredUser::with_verified_phone("+2348000000003", uow.now());
                verified.kyc_status = KycStatus::Verified;
                users.create(&verified)?;
                Ok::<_, LedgerDbError>((pending, verified))
            })
            .unwrap();

        let err = engine.assign_tag(&scope(), &pending.user_id, "fresh").await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = engine.assign_tag(&scope(), &verified.user_id, "TAKEN").await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let err = engine.assign_tag(&scope(), &verified.user_id, "a!").await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
