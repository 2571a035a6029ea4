// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Olra - Virtual Account Ledger and Transfer Service
//!
//! Users onboard with phone, email and BVN checks, receive a virtual account
//! and move money to each other by tag. Group wallets pool funds under an
//! admin, and funds requests let one user ask another for money.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens, passcodes and verification codes
//! - `ledger` - Money type, account resolution and the transfer engine
//! - `storage` - Embedded redb ledger and typed repositories
//! - `providers` - SMS/OTP, email and KYC upstreams
//! - `notifications` - Post-commit SMS alerts

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod providers;
pub mod state;
pub mod storage;
