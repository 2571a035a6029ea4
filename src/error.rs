// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Response envelopes and the HTTP mapping of the error taxonomy.
//!
//! Every business endpoint answers with
//! `{error, response_code, message, data, warning?}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::ledger::{LedgerError, MoneyError};
use crate::notifications::NotificationWarning;
use crate::providers::ProviderError;
use crate::storage::LedgerDbError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// Envelope returned for failed requests.
#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Always `true`.
    pub error: bool,
    pub response_code: u16,
    pub message: String,
    /// Always `null`.
    #[schema(value_type = Option<Object>)]
    pub data: Option<()>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope {
            error: true,
            response_code: self.status.as_u16(),
            message: self.message,
            data: None,
        });
        (self.status, body).into_response()
    }
}

impl From<LedgerDbError> for ApiError {
    fn from(e: LedgerDbError) -> Self {
        match e {
            LedgerDbError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            LedgerDbError::AlreadyExists(what) => ApiError::conflict(format!("{what} already exists")),
            LedgerDbError::InvalidCursor => ApiError::bad_request("Invalid pagination cursor"),
            LedgerDbError::InvalidTransition { from, to } => {
                ApiError::conflict(format!("Cannot move a {from} transaction to {to}"))
            }
            LedgerDbError::TimedOut(_) => {
                error!(error = %e, "Ledger operation timed out");
                ApiError::gateway_timeout("The operation timed out and was rolled back")
            }
            LedgerDbError::Cancelled => {
                ApiError::service_unavailable("The operation was cancelled and rolled back")
            }
            other => {
                error!(error = %other, "Ledger persistence failure");
                ApiError::service_unavailable("Ledger temporarily unavailable, no changes were made")
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount
            | LedgerError::SelfTransferRejected
            | LedgerError::WrongAccountKind { .. }
            | LedgerError::Validation(_) => ApiError::bad_request(e.to_string()),
            LedgerError::AccountNotFound { .. } | LedgerError::NotFound(_) => ApiError::not_found(e.to_string()),
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow => {
                ApiError::unprocessable(e.to_string())
            }
            LedgerError::Conflict(_) => ApiError::conflict(e.to_string()),
            LedgerError::Forbidden(_) => ApiError::forbidden(e.to_string()),
            LedgerError::Persistence(inner) => inner.into(),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        error!(error = %e, "Upstream provider failure");
        match e {
            ProviderError::MissingConfig { provider, .. } => {
                ApiError::service_unavailable(format!("{provider} is not configured"))
            }
            ProviderError::Request { provider, .. } | ProviderError::InvalidResponse { provider, .. } => {
                ApiError::bad_gateway(format!("{provider} request failed, please retry"))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        if let AuthError::InternalError(ref detail) = e {
            error!(error = %detail, "Authentication internal error");
            return ApiError::internal("Internal authentication error");
        }
        ApiError::new(e.status_code(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, rejection.body_text())
            }
            other => ApiError::bad_request(other.body_text()),
        }
    }
}

impl From<MoneyError> for ApiError {
    fn from(e: MoneyError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub error: bool,
    pub response_code: u16,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<NotificationWarning>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            response_code: StatusCode::OK.as_u16(),
            message: message.into(),
            data,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<NotificationWarning>) -> Self {
        self.warning = warning;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.response_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Amount, Side};
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn ledger_errors_map_to_statuses() {
        let cases = [
            (LedgerError::InvalidAmount, StatusCode::BAD_REQUEST),
            (LedgerError::SelfTransferRejected, StatusCode::BAD_REQUEST),
            (
                LedgerError::AccountNotFound {
                    side: Side::Destination,
                    reference: "ghost".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                LedgerError::InsufficientFunds {
                    available: Amount::ZERO,
                    requested: Amount::from_minor(1),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (LedgerError::conflict("taken"), StatusCode::CONFLICT),
            (LedgerError::Forbidden("admin only".into()), StatusCode::FORBIDDEN),
            (
                LedgerError::Persistence(LedgerDbError::Worker("boom".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LedgerError::Persistence(LedgerDbError::TimedOut(std::time::Duration::from_secs(1))),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn provider_errors_are_bad_gateway() {
        let err = ApiError::from(ProviderError::Request {
            provider: "termii",
            message: "timeout".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(!err.message.contains("timeout"));
    }

    #[tokio::test]
    async fn error_envelope_shape() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["response_code"], 400);
        assert_eq!(body["message"], "bad data");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn success_envelope_omits_absent_warning() {
        let body = body_json(ApiResponse::ok("done", serde_json::json!({"id": 1})).into_response()).await;
        assert_eq!(body["error"], false);
        assert_eq!(body["response_code"], 200);
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("warning").is_none());

        let warning = NotificationWarning {
            kind: "notification_failure".into(),
            message: "1 of 2 notifications could not be delivered".into(),
            failed: 1,
        };
        let body = body_json(
            ApiResponse::ok("done", ())
                .with_warning(Some(warning))
                .into_response(),
        )
        .await;
        assert_eq!(body["warning"]["kind"], "notification_failure");
    }
}
