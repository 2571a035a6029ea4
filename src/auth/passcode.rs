// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Six-digit login passcodes, stored as argon2 PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;

pub const PASSCODE_LENGTH: usize = 6;

pub fn is_valid_passcode(passcode: &str) -> bool {
    passcode.len() == PASSCODE_LENGTH && passcode.bytes().all(|b| b.is_ascii_digit())
}

pub fn hash_passcode(passcode: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(passcode.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(format!("passcode hashing failed: {e}")))
}

/// `Ok(false)` on mismatch; `Err` only if the stored hash is unreadable.
pub fn verify_passcode(passcode: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::InternalError(format!("stored passcode hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(passcode.as_bytes(), &parsed)
        .is_ok())
}
