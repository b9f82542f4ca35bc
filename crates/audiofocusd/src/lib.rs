// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audio focus arbitration: per-display grant/pause/lost resolution for
//! concurrent audio requests, driven by a policy matrix loaded at startup.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::AudiofocusConfig;
use crate::engine::actor;
use crate::policy::PolicyTable;
use crate::resolver::DisplayResolver;
use crate::transport::{build_router, AppState};

/// Run the service until shutdown.
pub async fn run(config: AudiofocusConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let policy = PolicyTable::load(&config.policy)?;
    let resolver = if config.automotive {
        DisplayResolver::with_automotive_defaults()
    } else {
        DisplayResolver::empty()
    };

    let engine = actor::spawn(policy.clone(), shutdown.clone());
    let state = Arc::new(AppState {
        policy,
        resolver: tokio::sync::RwLock::new(resolver),
        engine,
        automotive: config.automotive,
    });

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, automotive = config.automotive, "audiofocusd listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Waits for `SIGTERM`/`SIGINT` (or an internally triggered cancellation)
/// and fires `shutdown`, mirroring the teacher's `CancellationToken`-driven
/// graceful shutdown.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}
