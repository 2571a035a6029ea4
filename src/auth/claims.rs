// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;
use crate::storage::StoredUser;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Device the token was issued to
    pub device_id: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated caller extracted from a verified token.
///
/// This is the identity handlers and the ledger trust for the rest of the
/// request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Device bound to the session
    pub device_id: String,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            device_id: claims.device_id,
            expires_at: claims.exp,
        }
    }

    /// Reject tokens issued to a device the user has since replaced.
    pub fn ensure_bound_device(&self, user: &StoredUser) -> Result<(), AuthError> {
        if user.user_id != self.user_id {
            return Err(AuthError::InternalError("token subject does not match user".into()));
        }
        match user.device_id.as_deref() {
            Some(device_id) if device_id == self.device_id => Ok(()),
            _ => Err(AuthError::DeviceMismatch),
        }
    }
}
