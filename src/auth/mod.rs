// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Passcode login with phone OTP, issuing HS256 bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. Client submits phone number and passcode (`login-request`)
//! 2. Server checks the argon2 passcode hash and sends an OTP
//! 3. Client submits the OTP with its `device_id` (`verify-login`)
//! 4. Server binds that device to the user and returns a JWT
//!    `{sub, device_id, iat, exp}`
//! 5. Client sends `Authorization: Bearer <jwt>` on every other call
//!
//! ## Security
//!
//! - One active device per user; logging in elsewhere invalidates older tokens
//! - Clock skew tolerance is 60 seconds
//! - Email codes are stored as keyed digests, never in clear

pub mod claims;
pub mod codes;
pub mod error;
pub mod extractor;
pub mod passcode;
pub mod token;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use token::{IssuedToken, TokenIssuer};
