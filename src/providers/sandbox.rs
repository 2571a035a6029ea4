// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Offline providers for development builds and tests.
//!
//! Nothing leaves the process: messages are logged, every OTP is
//! [`SANDBOX_OTP_PIN`] and any well-formed BVN verifies.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{DeliveryStatus, EmailProvider, KycProvider, ProviderError, SmsProvider};

pub const SANDBOX_OTP_PIN: &str = "000000";

const BVN_LENGTH: usize = 11;

#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxSms;

#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxEmail;

#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxKyc;

#[async_trait]
impl SmsProvider for SandboxSms {
    async fn send_otp(&self, phone_number: &str) -> Result<String, ProviderError> {
        let pin_id = format!("sandbox-{}", Uuid::new_v4());
        info!(phone_number, pin_id = %pin_id, "Sandbox OTP issued");
        Ok(pin_id)
    }

    async fn verify_otp(&self, pin_id: &str, pin: &str) -> Result<bool, ProviderError> {
        Ok(pin_id.starts_with("sandbox-") && pin == SANDBOX_OTP_PIN)
    }

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<DeliveryStatus, ProviderError> {
        info!(phone_number, message, "Sandbox SMS");
        Ok(DeliveryStatus {
            accepted: true,
            reference: None,
        })
    }
}

#[async_trait]
impl EmailProvider for SandboxEmail {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<DeliveryStatus, ProviderError> {
        info!(email, code, "Sandbox email verification code");
        Ok(DeliveryStatus {
            accepted: true,
            reference: None,
        })
    }
}

#[async_trait]
impl KycProvider for SandboxKyc {
    async fn verify_bvn(&self, bvn: &str) -> Result<bool, ProviderError> {
        Ok(bvn.len() == BVN_LENGTH && bvn.bytes().all(|b| b.is_ascii_digit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn otp_verifies_only_with_fixed_pin() {
        let sms = SandboxSms;
        let pin_id = sms.send_otp("+2348011111111").await.unwrap();
        assert!(sms.verify_otp(&pin_id, SANDBOX_OTP_PIN).await.unwrap());
        assert!(!sms.verify_otp(&pin_id, "123456").await.unwrap());
        assert!(!sms.verify_otp("foreign-pin", SANDBOX_OTP_PIN).await.unwrap());
    }

    #[tokio::test]
    async fn bvn_must_be_eleven_digits() {
        let kyc = SandboxKyc;
        assert!(kyc.verify_bvn("22222222222").await.unwrap());
        assert!(!kyc.verify_bvn("2222222222").await.unwrap());
        assert!(!kyc.verify_bvn("2222222222a").await.unwrap());
    }
}
