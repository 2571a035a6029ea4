// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access tokens.
//!
//! Tokens carry `{sub, device_id, iat, exp}` and are signed with the server
//! secret. Verification allows 60 seconds of clock skew.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, AuthenticatedUser, TokenClaims};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &str, device_id: &str) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            device_id: device_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        let token_data = decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        })?;

        Ok(AuthenticatedUser::from_claims(token_data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::hours(1))
    }

    #[test]
    fn issued_token_verifies() {
        let issued = issuer().issue("user_1", "device_1").unwrap();
        let user = issuer().verify(&issued.token).unwrap();
        assert_eq!(user.user_id, "user_1");
        assert_eq!(user.device_id, "device_1");
        assert_eq!(user.expires_at, issued.expires_at.timestamp());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issued = TokenIssuer::new(b"another-secret-another-secret-!!", Duration::hours(1))
            .issue("user_1", "device_1")
            .unwrap();
        assert!(matches!(issuer().verify(&issued.token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = TokenIssuer::new(SECRET, Duration::hours(-2))
            .issue("user_1", "device_1")
            .unwrap();
        assert!(matches!(issuer().verify(&issued.token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(issuer().verify("not-a-jwt"), Err(AuthError::MalformedToken)));
    }
}
