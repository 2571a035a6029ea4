// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;

use olra_server::{
    api::router, config::AppConfig, logging::init_tracing, providers::Providers, state::AppState,
    storage::LedgerDb,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    std::fs::create_dir_all(&config.data_dir)?;
    let ledger = LedgerDb::open(&config.ledger_path())?;
    info!(path = %config.ledger_path().display(), "Ledger opened");

    let providers = Providers::from_env()?;
    let addr = config.bind_address();
    let state = AppState::new(config, ledger, providers);
    let shutdown = state.shutdown.clone();

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Olra server listening (docs at /docs)");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested, cancelling in-flight ledger work");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
