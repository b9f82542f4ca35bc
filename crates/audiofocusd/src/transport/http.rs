// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /api/v1/health`, exempt from the WS upgrade (spec.md §6).

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::resolver::DisplayId;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub display_count: usize,
}

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), display_count: DisplayId::ALL.len() })
}
