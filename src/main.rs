// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use intent_relay::api::router;
use intent_relay::config::RelayConfig;
use intent_relay::destination::EvmSubmitter;
use intent_relay::orchestrator::RelayOrchestrator;
use intent_relay::source::{CasperRpc, SourceWatcher};
use intent_relay::state::{AppState, RelaySnapshot};
use intent_relay::status::StatusBoard;
use intent_relay::zk::{CryptoGateway, ProofBuilder};

/// Capacity of the watcher-to-orchestrator event channel. Backpressure on a
/// full channel slows polling rather than dropping events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = RelayConfig::from_env();
    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(1);
    }

    let gateway = CryptoGateway::from_config(&config.zk);
    let prover = if gateway.is_mock() { "mock" } else { "snarkjs" };

    let submitter = match EvmSubmitter::new(&config.destination, config.submit_timeout) {
        Ok(submitter) => submitter,
        Err(e) => {
            error!(error = %e, "Failed to initialize destination submitter");
            std::process::exit(1);
        }
    };

    // Startup banner: relayer account facts, best effort.
    match submitter.relayer_info().await {
        Ok(relayer) => info!(
            address = %relayer.address,
            balance_wei = %relayer.balance_wei,
            gas_price_gwei = relayer.gas_price_gwei,
            prover,
            "Relayer account ready"
        ),
        Err(e) => warn!(error = %e, "Could not fetch relayer account info"),
    }

    let relayer_address = format!("{:#x}", submitter.address());
    let status = StatusBoard::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();

    let watcher = SourceWatcher::new(
        CasperRpc::new(config.source.node_url.clone()),
        config.source.contract_hash.clone(),
        config.poll_interval,
        config.max_signature_attempts,
        status.clone(),
        events_tx.clone(),
    );
    let watcher_task = tokio::spawn(watcher.run(shutdown.clone()));

    let orchestrator = Arc::new(RelayOrchestrator::new(
        ProofBuilder::new(gateway, config.zk.proof_output_dir.clone()),
        submitter,
        status.clone(),
        config.destination.chain_id,
        config.intent_ttl_secs,
    ));
    let orchestrator_task = tokio::spawn(orchestrator.run(events_rx, shutdown.clone()));

    let snapshot = RelaySnapshot::new(&config, relayer_address, prover.to_string());
    let app = router(AppState::new(status, events_tx, snapshot));

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Failed to parse bind address");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind status API");
            std::process::exit(1);
        }
    };

    info!("Intent relay listening on http://{addr} (docs at /docs)");

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await });

    tokio::select! {
        result = async { server.await } => {
            if let Err(e) = result {
                error!(error = %e, "Status API server failed");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping relay");
        }
    }

    shutdown.cancel();
    let _ = watcher_task.await;
    let _ = orchestrator_task.await;
    info!("Intent relay stopped");
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
