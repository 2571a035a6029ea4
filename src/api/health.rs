// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Missing,
    Unavailable,
}

impl CheckStatus {
    fn is_ok(self) -> bool {
        self == CheckStatus::Ok
    }
}

/// Per-component readiness.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: CheckStatus,
    /// The configured data directory exists.
    pub data_dir: CheckStatus,
    /// The ledger database opens a read transaction.
    pub ledger: CheckStatus,
}

impl HealthChecks {
    fn run(state: &AppState) -> Self {
        let data_dir = if state.config.data_dir.is_dir() {
            CheckStatus::Ok
        } else {
            CheckStatus::Missing
        };
        let ledger = match state.ledger.snapshot() {
            Ok(_) => CheckStatus::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "Ledger readiness check failed");
                CheckStatus::Unavailable
            }
        };
        Self {
            service: CheckStatus::Ok,
            data_dir,
            ledger,
        }
    }

    fn all_ok(&self) -> bool {
        self.service.is_ok() && self.data_dir.is_ok() && self.ledger.is_ok()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Full component report. 503 when any component is down.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All components healthy", body = ReadyResponse),
        (status = 503, description = "At least one component is down", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let checks = HealthChecks::run(&state);
    if checks.all_ok() {
        (StatusCode::OK, Json(ReadyResponse { status: "ok".into(), checks }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "degraded".into(),
                checks,
            }),
        )
    }
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".into() })
}

/// Ready to take traffic once the ledger is reachable.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
