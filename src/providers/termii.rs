// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Termii integration for SMS, phone OTP and email verification codes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{
    env_or_default, env_optional, env_required, DeliveryStatus, EmailProvider, ProviderError,
    SmsProvider,
};

const PROVIDER: &str = "termii";

pub const TERMII_BASE_URL_ENV: &str = "TERMII_BASE_URL";
pub const TERMII_API_KEY_ENV: &str = "TERMII_API_KEY";
pub const TERMII_SENDER_ID_ENV: &str = "TERMII_SENDER_ID";
pub const TERMII_EMAIL_CONFIG_ID_ENV: &str = "TERMII_EMAIL_CONFIG_ID";

const DEFAULT_BASE_URL: &str = "https://api.ng.termii.com/api";
const DEFAULT_SENDER_ID: &str = "N-Alert";

const PIN_ATTEMPTS: u32 = 3;
const PIN_TTL_MINUTES: u32 = 10;
const PIN_LENGTH: u32 = 6;
const PIN_PLACEHOLDER: &str = "< 1234 >";

#[derive(Debug, Clone)]
pub struct TermiiClient {
    base_url: String,
    api_key: String,
    sender_id: String,
    email_configuration_id: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct OtpSendResponse {
    #[serde(rename = "pinId")]
    pin_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message_id: Option<String>,
}

impl TermiiClient {
    pub fn is_configured() -> bool {
        env_optional(TERMII_API_KEY_ENV).is_some()
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url = env_or_default(TERMII_BASE_URL_ENV, DEFAULT_BASE_URL);
        let api_key = env_required(PROVIDER, TERMII_API_KEY_ENV)?;
        let sender_id = env_or_default(TERMII_SENDER_ID_ENV, DEFAULT_SENDER_ID);
        let email_configuration_id = env_optional(TERMII_EMAIL_CONFIG_ID_ENV);
        Self::new(base_url, api_key, sender_id, email_configuration_id)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender_id: impl Into<String>,
        email_configuration_id: Option<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender_id: sender_id.into(),
            email_configuration_id,
            http,
        })
    }

    fn otp_payload(&self, phone_number: &str) -> Value {
        json!({
            "api_key": self.api_key,
            "message_type": "NUMERIC",
            "to": phone_number,
            "from": self.sender_id,
            "channel": "dnd",
            "pin_attempts": PIN_ATTEMPTS,
            "pin_time_to_live": PIN_TTL_MINUTES,
            "pin_length": PIN_LENGTH,
            "pin_placeholder": PIN_PLACEHOLDER,
            "message_text": format!(
                "Your Olra confirmation code is {PIN_PLACEHOLDER}. Do not share it with anyone. Valid for {PIN_TTL_MINUTES} minutes, one-time use only"
            ),
            "pin_type": "NUMERIC",
        })
    }

    /// POST a JSON body and return the JSON response with its status.
    async fn post_json(&self, path: &str, payload: &Value) -> Result<(reqwest::StatusCode, Value), ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .header("Content-Type", "application/json")
            .header("cache-control", "no-cache")
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: format!("POST {path} failed: {e}"),
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: format!("POST {path} returned {status} with invalid JSON: {e}"),
        })?;
        Ok((status, body))
    }

    async fn post_expecting_success(&self, path: &str, payload: &Value) -> Result<Value, ProviderError> {
        let (status, body) = self.post_json(path, payload).await?;
        if !status.is_success() {
            return Err(ProviderError::Request {
                provider: PROVIDER,
                message: format!("POST {path} returned {status}: {body}"),
            });
        }
        Ok(body)
    }
}

/// Termii reports `verified` as a bool, as `"True"`, or as a reason such as `"Expired"`.
fn parse_verified(body: &Value) -> Option<bool> {
    match body.get("verified")? {
        Value::Bool(verified) => Some(*verified),
        Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
        _ => None,
    }
}

#[async_trait]
impl SmsProvider for TermiiClient {
    async fn send_otp(&self, phone_number: &str) -> Result<String, ProviderError> {
        let body = self
            .post_expecting_success("/sms/otp/send", &self.otp_payload(phone_number))
            .await?;
        let parsed: OtpSendResponse = serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: format!("OTP send response: {e}"),
        })?;
        let pin_id = parsed.pin_id.filter(|p| !p.is_empty()).ok_or(ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: "OTP send response did not include pinId".to_string(),
        })?;

        info!(pin_id = %pin_id, "Phone OTP sent");
        Ok(pin_id)
    }

    async fn verify_otp(&self, pin_id: &str, pin: &str) -> Result<bool, ProviderError> {
        let payload = json!({
            "api_key": self.api_key,
            "pin_id": pin_id,
            "pin": pin,
        });
        let (status, body) = self.post_json("/sms/otp/verify", &payload).await?;

        match parse_verified(&body) {
            Some(verified) => Ok(verified),
            None if status.is_success() => Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: format!("OTP verify response without verified flag: {body}"),
            }),
            None => Err(ProviderError::Request {
                provider: PROVIDER,
                message: format!("POST /sms/otp/verify returned {status}: {body}"),
            }),
        }
    }

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<DeliveryStatus, ProviderError> {
        let payload = json!({
            "api_key": self.api_key,
            "to": phone_number,
            "from": self.sender_id,
            "sms": message,
            "type": "plain",
            "channel": "dnd",
        });
        let body = self.post_expecting_success("/sms/send", &payload).await?;
        let parsed: MessageResponse = serde_json::from_value(body).unwrap_or(MessageResponse { message_id: None });

        if parsed.message_id.is_none() {
            warn!("Termii accepted SMS without returning a message_id");
        }
        Ok(DeliveryStatus {
            accepted: true,
            reference: parsed.message_id,
        })
    }
}

#[async_trait]
impl EmailProvider for TermiiClient {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<DeliveryStatus, ProviderError> {
        let configuration_id = self
            .email_configuration_id
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                provider: PROVIDER,
                name: TERMII_EMAIL_CONFIG_ID_ENV.to_string(),
            })?;
        let payload = json!({
            "api_key": self.api_key,
            "email_address": email,
            "code": code,
            "email_configuration_id": configuration_id,
        });
        let body = self.post_expecting_success("/email/otp/send", &payload).await?;
        let parsed: MessageResponse = serde_json::from_value(body).unwrap_or(MessageResponse { message_id: None });

        info!("Email verification code sent");
        Ok(DeliveryStatus {
            accepted: true,
            reference: parsed.message_id,
        })
    }
}
