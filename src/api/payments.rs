// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer-to-peer transfers and funds requests.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{extract::ApiJson, load_caller};
use crate::{
    auth::Auth,
    error::{ApiError, ApiResponse, ApiResult},
    ledger::{AccountRef, TransferOrder, TransferReceipt},
    models::{parse_amount, TransactionView, TransferView},
    state::AppState,
};

pub(crate) const DESCRIPTION_MAX_LEN: usize = 140;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Send money to another user.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Tag of the receiving user
    pub receiver_tag: String,
    /// Decimal amount, at most 2 decimal places (e.g. "300.50")
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Ask another user for money.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RequestFundsRequest {
    /// Tag of the user being asked to pay
    pub requestee_tag: String,
    /// Decimal amount, at most 2 decimal places
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A funds request and the transfer that paid it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestSettlementView {
    pub request: TransactionView,
    pub transfer: TransferView,
}

pub(crate) fn description(value: Option<String>) -> Result<String, ApiError> {
    let value = value.map(|d| d.trim().to_string()).unwrap_or_default();
    if value.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(ApiError::bad_request(format!(
            "description must be at most {DESCRIPTION_MAX_LEN} characters"
        )));
    }
    Ok(value)
}

pub(crate) fn transfer_view(receipt: &TransferReceipt) -> TransferView {
    TransferView {
        transaction: TransactionView::from(&receipt.transaction),
        balance: receipt.source_balance.to_string(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Transfer money from the caller's account to another user's account.
#[utoipa::path(
    post,
    path = "/v1/payment/transfer",
    tag = "Payments",
    request_body = TransferRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transfer completed", body = TransferView),
        (status = 400, description = "Invalid amount or self-transfer", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Receiver not found", body = crate::error::ErrorEnvelope),
        (status = 422, description = "Insufficient funds", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Ledger unavailable, nothing was written", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Auth(auth): Auth,
    ApiJson(body): ApiJson<TransferRequest>,
) -> ApiResult<TransferView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;
    let amount = parse_amount("amount", &body.amount)?;

    let receipt = state
        .engine
        .transfer(
            &state.scope(),
            TransferOrder {
                initiator_user_id: auth.user_id.clone(),
                source: AccountRef::Holder(auth.user_id),
                destination: AccountRef::tag(body.receiver_tag.trim()),
                amount,
                description: description(body.description)?,
            },
        )
        .await?;

    Ok(ApiResponse::ok("Transfer successful", transfer_view(&receipt)).with_warning(receipt.warning))
}

/// Ask another user for funds. Nothing moves until they pay.
#[utoipa::path(
    post,
    path = "/v1/payment/request-funds",
    tag = "Payments",
    request_body = RequestFundsRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Request recorded as pending", body = TransactionView),
        (status = 400, description = "Invalid amount or self-request", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Requestee not found", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn request_funds(
    State(state): State<AppState>,
    Auth(auth): Auth,
    ApiJson(body): ApiJson<RequestFundsRequest>,
) -> ApiResult<TransactionView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;
    let amount = parse_amount("amount", &body.amount)?;

    let receipt = state
        .engine
        .request_funds(
            &state.scope(),
            &auth.user_id,
            AccountRef::tag(body.requestee_tag.trim()),
            amount,
            description(body.description)?,
        )
        .await?;

    Ok(ApiResponse::ok("Funds request sent", TransactionView::from(&receipt.transaction))
        .with_warning(receipt.warning))
}

/// Pay a pending funds request addressed to the caller.
#[utoipa::path(
    post,
    path = "/v1/payment/requests/{transaction_id}/pay",
    tag = "Payments",
    params(("transaction_id" = String, Path, description = "Funds request transaction ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Request paid", body = RequestSettlementView),
        (status = 403, description = "Caller made the request", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Request not found", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Request is no longer pending", body = crate::error::ErrorEnvelope),
        (status = 422, description = "Insufficient funds", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn pay_request(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(transaction_id): Path<String>,
) -> ApiResult<RequestSettlementView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;

    let settlement = state
        .engine
        .pay_request(&state.scope(), &auth.user_id, &transaction_id)
        .await?;

    let view = RequestSettlementView {
        request: TransactionView::from(&settlement.request),
        transfer: transfer_view(&settlement.transfer),
    };
    Ok(ApiResponse::ok("Funds request paid", view).with_warning(settlement.transfer.warning))
}

/// Decline a pending funds request addressed to the caller.
#[utoipa::path(
    post,
    path = "/v1/payment/requests/{transaction_id}/decline",
    tag = "Payments",
    params(("transaction_id" = String, Path, description = "Funds request transaction ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Request declined", body = TransactionView),
        (status = 403, description = "Caller made the request", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Request not found", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Request is no longer pending", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn decline_request(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(transaction_id): Path<String>,
) -> ApiResult<TransactionView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;

    let request = state
        .engine
        .decline_request(&state.scope(), &auth.user_id, &transaction_id)
        .await?;

    Ok(ApiResponse::ok("Funds request declined", TransactionView::from(&request)))
}
