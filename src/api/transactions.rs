// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction history endpoints.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::IntoParams;

use super::load_caller;
use crate::{
    auth::Auth,
    error::{ApiError, ApiResponse, ApiResult},
    models::{TransactionPageView, TransactionView},
    state::AppState,
    storage::{AccountOwner, TransactionRepository},
};

pub(crate) const DEFAULT_PAGE_SIZE: usize = 20;
pub(crate) const MAX_PAGE_SIZE: usize = 100;

/// Pagination parameters for history listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// `next_cursor` from the previous page
    pub cursor: Option<String>,
    /// Maximum number of results (default: 20, max: 100)
    #[param(default = 20)]
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub(crate) fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// List the caller's transactions, newest first.
#[utoipa::path(
    get,
    path = "/v1/transactions",
    tag = "Transactions",
    params(HistoryQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of history", body = TransactionPageView),
        (status = 400, description = "Invalid cursor", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<TransactionPageView> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;

    let page = TransactionRepository::new(&snapshot).list_for_owner(
        &AccountOwner::User(user.user_id),
        query.cursor.as_deref(),
        query.page_size(),
    )?;
    Ok(ApiResponse::ok("Transactions", TransactionPageView::from(page)))
}

/// Get one transaction the caller took part in.
#[utoipa::path(
    get,
    path = "/v1/transactions/{transaction_id}",
    tag = "Transactions",
    params(("transaction_id" = String, Path, description = "Transaction ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transaction details", body = TransactionView),
        (status = 404, description = "Not found or not a participant", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(transaction_id): Path<String>,
) -> ApiResult<TransactionView> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;

    let transactions = TransactionRepository::new(&snapshot);
    let not_found = || ApiError::not_found("Transaction not found");
    let transaction = transactions.find(&transaction_id)?.ok_or_else(not_found)?;
    let role = transactions
        .role_of(&AccountOwner::User(user.user_id), &transaction)?
        .ok_or_else(not_found)?;

    let view = TransactionView {
        role: Some(role.as_str().to_string()),
        ..TransactionView::from(&transaction)
    };
    Ok(ApiResponse::ok("Transaction details", view))
}
