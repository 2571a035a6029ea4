// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.

use axum::extract::State;

use super::load_caller;
use crate::{
    auth::Auth,
    error::{ApiError, ApiResponse, ApiResult},
    models::AccountView,
    state::AppState,
    storage::{AccountOwner, AccountRepository},
};

/// Get the caller's virtual account and balance.
#[utoipa::path(
    get,
    path = "/v1/account",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account details", body = AccountView),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No account yet, choose a tag first", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn get_account(State(state): State<AppState>, Auth(auth): Auth) -> ApiResult<AccountView> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;
    let account = AccountRepository::new(&snapshot)
        .find_for_owner(&AccountOwner::User(user.user_id))?
        .ok_or_else(|| ApiError::not_found("No account yet, choose a tag first"))?;
    Ok(ApiResponse::ok("Account details", AccountView::from(&account)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::api::test_support::signed_in;
    use crate::auth::AuthenticatedUser;
    use crate::providers::Providers;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn returns_balance_as_decimal_string() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (_, auth) = signed_in(&state, "ada", "+2348000000001", "1250.5");

        let account = get_account(State(state), Auth(auth)).await.unwrap().data;
        assert_eq!(account.balance, "1250.50");
        assert_eq!(account.bank_name, "Test Bank");
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let (state, _dir) = test_state(Providers::sandbox());
        let ghost = AuthenticatedUser {
            user_id: "ghost".into(),
            device_id: "d".into(),
            expires_at: i64::MAX,
        };
        let err = get_account(State(state), Auth(ghost)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
