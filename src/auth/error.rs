// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session and credential failures.
//!
//! Rejections carry a machine-readable `error_code` next to the usual
//! envelope fields so clients can tell an expired session from a revoked one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    #[error("Session token is malformed")]
    MalformedToken,
    #[error("Session token signature is invalid")]
    InvalidSignature,
    #[error("Session has expired, please log in again")]
    TokenExpired,
    #[error("Session token is not yet valid")]
    TokenNotYetValid,
    /// A newer login replaced the device this token was issued to.
    #[error("This session belongs to a device that has been signed out")]
    DeviceMismatch,
    #[error("Invalid phone number or passcode")]
    InvalidCredentials,
    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct AuthRejection {
    error: bool,
    response_code: u16,
    message: String,
    data: Option<()>,
    error_code: &'static str,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::DeviceMismatch => "device_mismatch",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::InternalError(detail) => {
                tracing::error!(error = %detail, "Authentication failure");
                "Internal authentication error".to_string()
            }
            other => other.to_string(),
        };
        let body = AuthRejection {
            error: true,
            response_code: status.as_u16(),
            message,
            data: None,
            error_code: self.error_code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn rejection(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_header_is_401_with_code() {
        let (status, body) = rejection(AuthError::MissingAuthHeader).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], true);
        assert_eq!(body["response_code"], 401);
        assert_eq!(body["error_code"], "missing_auth_header");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn signed_out_device_is_distinguishable() {
        let (status, body) = rejection(AuthError::DeviceMismatch).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "device_mismatch");
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let (status, body) = rejection(AuthError::InternalError("key length 3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal authentication error");
    }
}
