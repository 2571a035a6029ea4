// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IdentityPass BVN verification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{env_or_default, env_optional, env_required, KycProvider, ProviderError};

const PROVIDER: &str = "identitypass";

pub const IDENTITYPASS_BVN_URL_ENV: &str = "IDENTITYPASS_BVN_URL";
pub const IDENTITYPASS_API_KEY_ENV: &str = "IDENTITYPASS_API_KEY";
pub const IDENTITYPASS_APP_ID_ENV: &str = "IDENTITYPASS_APP_ID";

const DEFAULT_BVN_URL: &str =
    "https://api.myidentitypay.com/api/v2/biometrics/merchant/data/verification/bvn";

#[derive(Debug, Clone)]
pub struct IdentityPassClient {
    bvn_url: String,
    api_key: String,
    app_id: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct BvnResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    detail: Option<String>,
}

impl IdentityPassClient {
    pub fn is_configured() -> bool {
        env_optional(IDENTITYPASS_API_KEY_ENV).is_some()
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(
            env_or_default(IDENTITYPASS_BVN_URL_ENV, DEFAULT_BVN_URL),
            env_required(PROVIDER, IDENTITYPASS_API_KEY_ENV)?,
            env_required(PROVIDER, IDENTITYPASS_APP_ID_ENV)?,
        )
    }

    pub fn new(
        bvn_url: impl Into<String>,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            bvn_url: bvn_url.into(),
            api_key: api_key.into(),
            app_id: app_id.into(),
            http,
        })
    }
}

#[async_trait]
impl KycProvider for IdentityPassClient {
    async fn verify_bvn(&self, bvn: &str) -> Result<bool, ProviderError> {
        let response = self
            .http
            .post(&self.bvn_url)
            .header("x-api-key", &self.api_key)
            .header("app-id", &self.app_id)
            .json(&json!({ "number": bvn }))
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: format!("BVN lookup failed: {e}"),
            })?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Request {
                provider: PROVIDER,
                message: format!("BVN lookup returned {status}: {body}"),
            });
        }

        let parsed: BvnResponse = response.json().await.map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: format!("BVN lookup returned {status} with invalid JSON: {e}"),
        })?;

        info!(
            verified = parsed.status,
            detail = parsed.detail.as_deref().unwrap_or(""),
            "BVN lookup completed"
        );
        Ok(parsed.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_without_status_is_not_verified() {
        let parsed: BvnResponse = serde_json::from_str(r#"{"detail":"BVN not found"}"#).unwrap();
        assert!(!parsed.status);
        assert_eq!(parsed.detail.as_deref(), Some("BVN not found"));
    }

    #[test]
    fn verified_response_parses() {
        let parsed: BvnResponse =
            serde_json::from_str(r#"{"status":true,"detail":"Verification Successfull","bvn_data":{}}"#).unwrap();
        assert!(parsed.status);
    }
}
