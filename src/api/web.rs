// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public website endpoints.

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::{
    extract::ApiJson,
    users::{normalize_email, normalize_phone, require_name},
};
use crate::{
    error::{ApiError, ApiResponse, ApiResult},
    state::AppState,
    storage::{LedgerDbError, WaitlistEntry, WaitlistRepository},
};

/// Join the pre-launch waitlist.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JoinWaitlistRequest {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WaitlistView {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl From<WaitlistEntry> for WaitlistView {
    fn from(entry: WaitlistEntry) -> Self {
        Self {
            full_name: entry.full_name,
            email: entry.email,
            phone_number: entry.phone_number,
            created_at: entry.created_at,
        }
    }
}

/// Add a name, email and phone number to the waitlist. One entry per email.
#[utoipa::path(
    post,
    path = "/v1/web/add-waitlist",
    tag = "Web",
    request_body = JoinWaitlistRequest,
    responses(
        (status = 200, description = "Added to waitlist", body = WaitlistView),
        (status = 400, description = "Invalid name, email or phone number", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Email already on the waitlist", body = crate::error::ErrorEnvelope),
    )
)]
pub async fn join_waitlist(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<JoinWaitlistRequest>,
) -> ApiResult<WaitlistView> {
    let full_name = require_name("full_name", &body.full_name)?;
    let email = normalize_email(&body.email)?;
    let phone_number = normalize_phone(&body.phone_number)?;

    let entry = state
        .ledger
        .write(&state.scope(), move |uow| -> Result<WaitlistEntry, ApiError> {
            let entry = WaitlistEntry {
                full_name,
                email,
                phone_number,
                created_at: uow.now(),
            };
            WaitlistRepository::new(uow).create(&entry).map_err(|e| match e {
                LedgerDbError::AlreadyExists(_) => {
                    ApiError::conflict("User with this email address exists in waitlist")
                }
                other => other.into(),
            })?;
            Ok(entry)
        })
        .await?;

    info!(email = %entry.email, "Waitlist signup");
    Ok(ApiResponse::ok("User added to waitlist successfully", WaitlistView::from(entry)))
}
