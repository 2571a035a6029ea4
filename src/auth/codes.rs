// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email verification codes.
//!
//! Codes are six random digits. Only an HMAC-SHA256 digest keyed with the
//! server secret and bound to the email address is stored.

use base64ct::{Base64, Encoding};
use chrono::Duration;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const EMAIL_CODE_LENGTH: usize = 6;

pub fn email_code_ttl() -> Duration {
    Duration::minutes(30)
}

pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

fn keyed_mac(secret: &[u8], email: &str, code: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::InternalError(format!("invalid code secret: {e}")))?;
    mac.update(email.to_lowercase().as_bytes());
    mac.update(b"|");
    mac.update(code.as_bytes());
    Ok(mac)
}

/// Keyed digest of `code` for `email`.
pub fn code_digest(secret: &[u8], email: &str, code: &str) -> Result<String, AuthError> {
    let mac = keyed_mac(secret, email, code)?;
    Ok(Base64::encode_string(&mac.finalize().into_bytes()))
}

/// Compare a submitted code against a stored digest in constant time.
pub fn verify_code(secret: &[u8], email: &str, code: &str, stored_digest: &str) -> bool {
    let Ok(expected) = Base64::decode_vec(stored_digest) else {
        return false;
    };
    match keyed_mac(secret, email, code) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), EMAIL_CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn digest_binds_code_to_email() {
        let digest = code_digest(SECRET, "Ada@Example.com", "123456").unwrap();
        assert!(verify_code(SECRET, "ada@example.com", "123456", &digest));
        assert!(!verify_code(SECRET, "ada@example.com", "123457", &digest));
        assert!(!verify_code(SECRET, "bola@example.com", "123456", &digest));
        assert!(!verify_code(b"other-secret", "ada@example.com", "123456", &digest));
        assert!(!verify_code(SECRET, "ada@example.com", "123456", "%%%"));
    }
}
