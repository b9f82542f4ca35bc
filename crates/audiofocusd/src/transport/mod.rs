// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the audio focus arbitration service.

pub mod http;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use std::sync::Arc;

use crate::engine::actor::EngineHandle;
use crate::policy::PolicyTable;
use crate::resolver::DisplayResolver;

/// Shared, read-only-except-for-`resolver` state every connection handler
/// needs. The policy table never changes after startup (spec.md §4.1); the
/// resolver may gain new token mappings from a single-threaded collaborator
/// outside the request path (spec.md §4.2), hence the lock.
pub struct AppState {
    pub policy: PolicyTable,
    pub resolver: tokio::sync::RwLock<DisplayResolver>,
    pub engine: EngineHandle,
    pub automotive: bool,
}

/// Build the axum `Router` for this service.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::health))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
