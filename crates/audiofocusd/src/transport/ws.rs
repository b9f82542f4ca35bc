// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws` — the single JSON-frame bus this crate exposes (spec.md §6's
//! ambient addition). Grounded on the teacher's per-session WS handler
//! (`examples/groblegark-coop/crates/mux/src/transport/ws.rs`): one
//! connection, one `tokio::select!` loop multiplexing client frames
//! against engine-originated pushes, with cleanup on drop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::AppState;
use crate::error::AudioFocusError;
use crate::handlers::{self, RequestContext};
use crate::protocol::{FocusReply, IncomingOp, ServerMessage};
use crate::registry::{Bucket, Handle};

/// Query parameters for the WS upgrade. `app_id` is this crate's stand-in
/// for "application id resolved from the transport" (spec.md §3) since
/// there is no real session/auth layer to resolve it from here.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub app_id: String,
}

/// `GET /ws?appId=...`
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query.app_id))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, app_id: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut subscriptions: Vec<(Bucket, Handle)> = Vec::new();
    let ctx = RequestContext { app_id: &app_id, automotive: state.automotive };

    loop {
        tokio::select! {
            pushed = push_rx.recv() => {
                match pushed {
                    Some(payload) => {
                        if send_json(&mut ws_tx, &payload).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply_and_handle = match serde_json::from_str::<IncomingOp>(&text) {
                            Ok(op) => {
                                let resolver = state.resolver.read().await;
                                let result = handlers::handle_op(
                                    op,
                                    &ctx,
                                    &state.policy,
                                    &resolver,
                                    &state.engine,
                                    push_tx.clone(),
                                ).await;
                                drop(resolver);
                                result
                            }
                            Err(err) => {
                                tracing::warn!(app_id = %app_id, %err, "malformed client frame");
                                (
                                    ServerMessage::Focus(FocusReply::error(
                                        AudioFocusError::InvalidSchema.code().unwrap_or(1),
                                        "malformed request",
                                    )),
                                    None,
                                )
                            }
                        };

                        let (reply, tracked) = reply_and_handle;
                        if let Some(pair) = tracked {
                            subscriptions.push(pair);
                        }
                        if send_json(&mut ws_tx, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    for (bucket, handle) in subscriptions {
        state.engine.cancel(bucket, handle);
    }
}

async fn send_json(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    payload: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_owned());
    ws_tx.send(Message::Text(text.into())).await
}
