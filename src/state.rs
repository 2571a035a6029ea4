// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use chrono::Duration;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::ledger::{LedgerSettings, TransferEngine};
use crate::notifications::NotificationDispatcher;
use crate::providers::Providers;
use crate::storage::{LedgerDb, OperationScope};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: LedgerDb,
    pub engine: TransferEngine,
    pub providers: Providers,
    pub tokens: TokenIssuer,
    /// Cancelled on shutdown; every unit of work is scoped under it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, ledger: LedgerDb, providers: Providers) -> Self {
        let notifier = NotificationDispatcher::new(Arc::clone(&providers.sms));
        let engine = TransferEngine::new(
            ledger.clone(),
            notifier,
            LedgerSettings {
                bank_name: config.bank_name.clone(),
                opening_balance: config.default_account_balance,
            },
        );
        let tokens = TokenIssuer::new(&config.jwt_secret, Duration::hours(config.token_ttl_hours));

        Self {
            config: Arc::new(config),
            ledger,
            engine,
            providers,
            tokens,
            shutdown: CancellationToken::new(),
        }
    }

    /// Deadline and cancellation scope for one ledger operation.
    pub fn scope(&self) -> OperationScope {
        OperationScope::new(self.config.operation_timeout).with_parent(&self.shutdown)
    }
}
