// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Group wallet endpoints.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{
    extract::ApiJson,
    load_caller,
    payments::{description, transfer_view},
    transactions::HistoryQuery,
};
use crate::{
    auth::Auth,
    error::{ApiResponse, ApiResult},
    ledger::{GroupDetails, NewGroup},
    models::{parse_amount, GroupView, TransactionPageView, TransferView},
    state::AppState,
    storage::{AccountOwner, TransactionRepository},
};

// =============================================================================
// Request Types
// =============================================================================

/// Create a group wallet. The caller becomes its admin.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    /// Unique group tag, 3-20 characters of `a-z`, `0-9` and `_`
    pub tag: String,
    /// Optional spending target, decimal string
    #[serde(default)]
    pub budget: Option<String>,
    /// Tags of the users to add. Must not include the caller.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Pay from the caller's account into a group.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GroupTransferRequest {
    pub group_tag: String,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Pay out from a group to one of its members.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GroupPayoutRequest {
    pub member_tag: String,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a group, its account and its memberships in one step.
#[utoipa::path(
    post,
    path = "/v1/group/create-group",
    tag = "Groups",
    request_body = CreateGroupRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Group created", body = GroupView),
        (status = 400, description = "Invalid input or creator listed as member", body = crate::error::ErrorEnvelope),
        (status = 404, description = "A member tag does not exist", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Group tag already taken", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    Auth(auth): Auth,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> ApiResult<GroupView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;
    let budget = body
        .budget
        .as_deref()
        .map(|b| parse_amount("budget", b))
        .transpose()?;

    let details = state
        .engine
        .create_group(
            &state.scope(),
            &auth.user_id,
            NewGroup {
                name: body.name,
                tag: body.tag,
                budget,
                member_tags: body.members,
            },
        )
        .await?;

    Ok(ApiResponse::ok("Group created", GroupView::from(&details)))
}

/// Pay from the caller's account into a group account.
#[utoipa::path(
    post,
    path = "/v1/group/group-transfer",
    tag = "Groups",
    request_body = GroupTransferRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payment completed", body = TransferView),
        (status = 400, description = "Invalid amount", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Group not found", body = crate::error::ErrorEnvelope),
        (status = 422, description = "Insufficient funds", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn group_transfer(
    State(state): State<AppState>,
    Auth(auth): Auth,
    ApiJson(body): ApiJson<GroupTransferRequest>,
) -> ApiResult<TransferView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;
    let amount = parse_amount("amount", &body.amount)?;

    let receipt = state
        .engine
        .group_transfer(
            &state.scope(),
            &auth.user_id,
            body.group_tag.trim(),
            amount,
            description(body.description)?,
        )
        .await?;

    Ok(ApiResponse::ok("Group payment successful", transfer_view(&receipt)).with_warning(receipt.warning))
}

/// Get a group with its balance and members. Visible to admin and members.
#[utoipa::path(
    get,
    path = "/v1/group/{tag}",
    tag = "Groups",
    params(("tag" = String, Path, description = "Group tag")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Group details", body = GroupView),
        (status = 404, description = "Group not found", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(tag): Path<String>,
) -> ApiResult<GroupView> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;
    let details = GroupDetails::load(&snapshot, &tag, &user.user_id)?;
    Ok(ApiResponse::ok("Group details", GroupView::from(&details)))
}

/// Pay from a group account to a member. Admin only.
#[utoipa::path(
    post,
    path = "/v1/group/{tag}/payout",
    tag = "Groups",
    params(("tag" = String, Path, description = "Group tag")),
    request_body = GroupPayoutRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payout completed", body = TransferView),
        (status = 400, description = "Invalid amount or not a member", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Caller is not the group admin", body = crate::error::ErrorEnvelope),
        (status = 422, description = "Insufficient group funds", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn group_payout(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(tag): Path<String>,
    ApiJson(body): ApiJson<GroupPayoutRequest>,
) -> ApiResult<TransferView> {
    load_caller(&state.ledger.snapshot()?, &auth)?;
    let amount = parse_amount("amount", &body.amount)?;

    let receipt = state
        .engine
        .group_payout(
            &state.scope(),
            &auth.user_id,
            &tag,
            body.member_tag.trim(),
            amount,
            description(body.description)?,
        )
        .await?;

    Ok(ApiResponse::ok("Group payout successful", transfer_view(&receipt)).with_warning(receipt.warning))
}

/// List a group's transactions, newest first.
#[utoipa::path(
    get,
    path = "/v1/group/{tag}/transactions",
    tag = "Groups",
    params(("tag" = String, Path, description = "Group tag"), HistoryQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of group history", body = TransactionPageView),
        (status = 404, description = "Group not found", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn group_transactions(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Path(tag): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<TransactionPageView> {
    let snapshot = state.ledger.snapshot()?;
    let user = load_caller(&snapshot, &auth)?;
    let details = GroupDetails::load(&snapshot, &tag, &user.user_id)?;

    let page = TransactionRepository::new(&snapshot).list_for_owner(
        &AccountOwner::Group(details.group.group_id),
        query.cursor.as_deref(),
        query.page_size(),
    )?;
    Ok(ApiResponse::ok("Group transactions", TransactionPageView::from(page)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::api::test_support::signed_in;
    use crate::ledger::engine::test_support::user_balance;
    use crate::providers::Providers;
    use crate::state::test_support::test_state;

    fn create(tag: &str, members: &[&str]) -> ApiJson<CreateGroupRequest> {
        ApiJson(CreateGroupRequest {
            name: "Lagos Trip".into(),
            tag: tag.into(),
            budget: Some("50000".into()),
            members: members.iter().map(|m| m.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn group_lifecycle() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (_, ada_auth) = signed_in(&state, "ada", "+2348000000001", "0");
        let (bola, bola_auth) = signed_in(&state, "bola", "+2348000000002", "1000");
        let (_, cara_auth) = signed_in(&state, "cara", "+2348000000003", "0");

        let group = create_group(State(state.clone()), Auth(ada_auth.clone()), create("trip", &["bola"]))
            .await
            .unwrap()
            .data;
        assert_eq!(group.account.balance, "0.00");
        assert_eq!(group.budget.as_deref(), Some("50000.00"));
        assert_eq!(group.members.len(), 1);

        let paid = group_transfer(
            State(state.clone()),
            Auth(bola_auth.clone()),
            ApiJson(GroupTransferRequest {
                group_tag: "trip".into(),
                amount: "400".into(),
                description: Some("hotel deposit".into()),
            }),
        )
        .await
        .unwrap()
        .data;
        assert_eq!(paid.balance, "600.00");
        assert_eq!(paid.transaction.kind, "group-payment");

        let err = group_payout(
            State(state.clone()),
            Auth(bola_auth.clone()),
            Path("trip".into()),
            ApiJson(GroupPayoutRequest {
                member_tag: "bola".into(),
                amount: "100".into(),
                description: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let payout = group_payout(
            State(state.clone()),
            Auth(ada_auth.clone()),
            Path("trip".into()),
            ApiJson(GroupPayoutRequest {
                member_tag: "bola".into(),
                amount: "150".into(),
                description: None,
            }),
        )
        .await
        .unwrap()
        .data;
        assert_eq!(payout.balance, "250.00");
        assert_eq!(user_balance(&state.ledger, &bola).to_string(), "750.00");

        let view = get_group(State(state.clone()), Auth(bola_auth), Path("trip".into()))
            .await
            .unwrap()
            .data;
        assert_eq!(view.account.balance, "250.00");

        let history = group_transactions(
            State(state.clone()),
            Auth(ada_auth),
            Path("trip".into()),
            Query(HistoryQuery::default()),
        )
        .await
        .unwrap()
        .data;
        assert_eq!(history.transactions.len(), 2);
        assert_eq!(history.transactions[0].role.as_deref(), Some("sender"));
        assert_eq!(history.transactions[1].role.as_deref(), Some("receiver"));

        let err = get_group(State(state), Auth(cara_auth), Path("trip".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn creator_cannot_be_a_member() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (_, ada_auth) = signed_in(&state, "ada", "+2348000000001", "0");

        let err = create_group(State(state), Auth(ada_auth), create("trip", &["ada"]))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_group_tag_conflicts() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (_, ada_auth) = signed_in(&state, "ada", "+2348000000001", "0");

        create_group(State(state.clone()), Auth(ada_auth.clone()), create("trip", &[]))
            .await
            .unwrap();
        let err = create_group(State(state), Auth(ada_auth), create("TRIP", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_budget_is_rejected() {
        let (state, _dir) = test_state(Providers::sandbox());
        let (_, ada_auth) = signed_in(&state, "ada", "+2348000000001", "0");

        let mut request = create("trip", &[]);
        request.0.budget = Some("12.345".into());
        let err = create_group(State(state), Auth(ada_auth), request).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
