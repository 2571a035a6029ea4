// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upstream providers: SMS/OTP, email and KYC.
//!
//! Each concern is a trait so handlers and the notification dispatcher can
//! run against Termii/IdentityPass in production, the sandbox in development
//! builds, and in-test doubles.

use std::sync::Arc;

use async_trait::async_trait;

pub mod identitypass;
pub mod sandbox;
pub mod termii;

pub use identitypass::IdentityPassClient;
pub use sandbox::{SandboxEmail, SandboxKyc, SandboxSms};
pub use termii::TermiiClient;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} configuration missing: {name}")]
    MissingConfig { provider: &'static str, name: String },

    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },

    #[error("{provider} response was invalid: {message}")]
    InvalidResponse { provider: &'static str, message: String },
}

/// Outcome of handing a message to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub accepted: bool,
    /// Provider message id, when one was returned.
    pub reference: Option<String>,
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Send a one-time PIN and return the provider's pin id.
    async fn send_otp(&self, phone_number: &str) -> Result<String, ProviderError>;

    async fn verify_otp(&self, pin_id: &str, pin: &str) -> Result<bool, ProviderError>;

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<DeliveryStatus, ProviderError>;
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<DeliveryStatus, ProviderError>;
}

#[async_trait]
pub trait KycProvider: Send + Sync {
    async fn verify_bvn(&self, bvn: &str) -> Result<bool, ProviderError>;
}

/// The provider set used by the running service.
#[derive(Clone)]
pub struct Providers {
    pub sms: Arc<dyn SmsProvider>,
    pub email: Arc<dyn EmailProvider>,
    pub kyc: Arc<dyn KycProvider>,
}

impl Providers {
    /// Real providers where configured.
    ///
    /// Unconfigured providers fall back to the sandbox only in `dev` builds.
    pub fn from_env() -> Result<Self, ProviderError> {
        let (sms, email): (Arc<dyn SmsProvider>, Arc<dyn EmailProvider>) = if TermiiClient::is_configured() {
            let termii = Arc::new(TermiiClient::from_env()?);
            let sms: Arc<dyn SmsProvider> = termii.clone();
            let email: Arc<dyn EmailProvider> = termii;
            (sms, email)
        } else if cfg!(feature = "dev") {
            tracing::warn!("Termii not configured, using sandbox SMS and email providers");
            let sms: Arc<dyn SmsProvider> = Arc::new(SandboxSms);
            let email: Arc<dyn EmailProvider> = Arc::new(SandboxEmail);
            (sms, email)
        } else {
            return Err(ProviderError::MissingConfig {
                provider: "termii",
                name: termii::TERMII_API_KEY_ENV.to_string(),
            });
        };

        let kyc: Arc<dyn KycProvider> = if IdentityPassClient::is_configured() {
            Arc::new(IdentityPassClient::from_env()?)
        } else if cfg!(feature = "dev") {
            tracing::warn!("IdentityPass not configured, using sandbox KYC provider");
            Arc::new(SandboxKyc)
        } else {
            return Err(ProviderError::MissingConfig {
                provider: "identitypass",
                name: identitypass::IDENTITYPASS_API_KEY_ENV.to_string(),
            });
        };

        Ok(Self { sms, email, kyc })
    }

    /// Sandbox providers for every concern.
    pub fn sandbox() -> Self {
        Self {
            sms: Arc::new(SandboxSms),
            email: Arc::new(SandboxEmail),
            kyc: Arc::new(SandboxKyc),
        }
    }
}

// =============================================================================
// Environment Helpers
// =============================================================================

pub(crate) fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_required(provider: &'static str, name: &str) -> Result<String, ProviderError> {
    env_optional(name).ok_or_else(|| ProviderError::MissingConfig {
        provider,
        name: name.to_string(),
    })
}

pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
