// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use relational_relay_server::{
    api::router,
    config::{log_format_from_env, AppConfig},
    state::AppState,
    storage::{ConfiguredBackend, DurableBackend, LedgerStore},
    telemetry,
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    telemetry::init(log_format_from_env());

    if let Err(e) = run().await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    // Install the ring crypto provider for rustls before any TLS work.
    // An error only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = AppConfig::from_env()?;

    let backend = ConfiguredBackend::from_config(&config.ledger_backend)?;
    info!(backend = backend.name(), "Ledger storage configured");
    if matches!(backend, ConfiguredBackend::None) {
        warn!("No durable ledger backend configured; wallet state will not survive restarts");
    }

    let addr = config.bind_addr;
    let tls = config.tls.clone();
    info!(
        executor_forwarding = config.executor_url.is_some(),
        envelope_verification = config.shared_secret.is_some(),
        upstream = %config.upstream_url,
        "Relay configured"
    );

    let state = AppState::new(config, LedgerStore::new(backend))?;
    let app = router(state);

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutting down");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    match tls {
        Some(paths) => {
            let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;
            info!("Relational Relay listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Relational Relay listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    shutdown.cancel();
}
