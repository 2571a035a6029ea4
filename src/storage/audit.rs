// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for ledger mutations and onboarding steps.
//!
//! Events are written inside the same unit of work as the change they
//! describe, so an audit row exists exactly when the change committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ledger_db::{LedgerDbResult, LedgerRead, UnitOfWork, AUDIT_LOG};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Onboarding
    UserRegistered,
    ProfileUpdated,
    EmailVerified,
    BvnVerified,
    TagAssigned,
    PasscodeSet,
    DeviceBound,

    // Ledger
    TransferCompleted,
    GroupPaymentCompleted,
    GroupPayoutCompleted,
    FundsRequested,
    FundsRequestSettled,
    FundsRequestDeclined,

    // Groups
    GroupCreated,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (transaction_id, group_id, etc.).
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn storage_key(&self) -> String {
        format!("{:020}|{}", self.timestamp.timestamp_micros(), self.event_id)
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> AuditRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    /// Most recent events, newest first.
    pub fn recent(&self, limit: usize) -> LedgerDbResult<Vec<AuditEvent>> {
        self.tx.scan_json(AUDIT_LOG, limit)
    }
}

impl AuditRepository<'_, UnitOfWork<'_>> {
    /// Append an event, stamped with the unit of work's clock.
    pub fn log(&self, mut event: AuditEvent) -> LedgerDbResult<()> {
        event.timestamp = self.tx.now();
        self.tx.put_json(AUDIT_LOG, &event.storage_key(), &event)
    }
}
