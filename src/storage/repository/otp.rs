// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outstanding phone OTP challenges.
//!
//! A challenge binds a provider pin id to the phone number it was sent to
//! and the flow that requested it. Verification consumes it, so a pin id
//! can be redeemed once and only for that phone.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ledger_db::{LedgerDbResult, LedgerRead, UnitOfWork, OTP_CHALLENGES};

/// Lifetime of a challenge. Matches the provider's pin lifetime.
pub const OTP_CHALLENGE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Signup,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOtpChallenge {
    pub pin_id: String,
    pub phone_number: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoredOtpChallenge {
    pub fn issue(
        pin_id: impl Into<String>,
        phone_number: impl Into<String>,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            pin_id: pin_id.into(),
            phone_number: phone_number.into(),
            purpose,
            expires_at: now + Duration::minutes(OTP_CHALLENGE_TTL_MINUTES),
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True when this challenge may be redeemed for `phone_number` in `purpose`.
    pub fn admits(&self, phone_number: &str, purpose: OtpPurpose, now: DateTime<Utc>) -> bool {
        self.phone_number == phone_number && self.purpose == purpose && !self.is_expired(now)
    }
}

pub struct OtpChallengeRepository<'a, R> {
    tx: &'a R,
}

impl<'a, R: LedgerRead> OtpChallengeRepository<'a, R> {
    pub fn new(tx: &'a R) -> Self {
        Self { tx }
    }

    pub fn find(&self, pin_id: &str) -> LedgerDbResult<Option<StoredOtpChallenge>> {
        self.tx.get_json(OTP_CHALLENGES, pin_id)
    }
}

impl OtpChallengeRepository<'_, UnitOfWork<'_>> {
    pub fn save(&self, challenge: &StoredOtpChallenge) -> LedgerDbResult<()> {
        self.tx.put_json(OTP_CHALLENGES, &challenge.pin_id, challenge)
    }

    pub fn consume(&self, pin_id: &str) -> LedgerDbResult<()> {
        self.tx.remove_json(OTP_CHALLENGES, pin_id)
    }
}
