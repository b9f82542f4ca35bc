// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine actor: a single Tokio task owns the [`FocusEngine`] and
//! serializes every mutation through a command channel (spec.md §5),
//! the same run-loop shape as the teacher's `WsBridge::connect`/`run_loop`
//! (`examples/groblegark-coop/crates/mux/src/upstream/bridge.rs`) without
//! the `Arc<RwLock<_>>` the teacher needs for its multi-writer clients map
//! — here there is exactly one writer, the actor itself.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::FocusEngine;
use crate::policy::PolicyTable;
use crate::protocol::{FocusReply, ServerMessage, StatusEnvelope};
use crate::registry::{Bucket, Handle};
use crate::resolver::DisplayId;

/// One request to the engine, with a `oneshot` reply channel for anything
/// that needs a synchronous answer.
enum Command {
    RequestFocus {
        display_id: DisplayId,
        app_id: String,
        request_type: String,
        stream_type: String,
        tx: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<(FocusReply, Option<Handle>)>,
    },
    ReleaseFocus {
        display_id: DisplayId,
        app_id: String,
        reply: oneshot::Sender<Result<FocusReply, crate::error::AudioFocusError>>,
    },
    GetStatus {
        display_id: DisplayId,
        app_id: String,
        subscribe: bool,
        tx: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<(StatusEnvelope, Option<Handle>)>,
    },
    Cancel {
        bucket: Bucket,
        handle: Handle,
    },
}

/// Cheaply cloneable front for the engine actor. Every connection task
/// holds one of these; none of them touch [`FocusEngine`] directly.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub async fn request_focus(
        &self,
        display_id: DisplayId,
        app_id: impl Into<String>,
        request_type: impl Into<String>,
        stream_type: impl Into<String>,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> anyhow::Result<(FocusReply, Option<Handle>)> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::RequestFocus {
                display_id,
                app_id: app_id.into(),
                request_type: request_type.into(),
                stream_type: stream_type.into(),
                tx,
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("focus engine actor is gone"))?;
        rx.await.map_err(|_| anyhow::anyhow!("focus engine actor dropped the reply"))
    }

    pub async fn release_focus(
        &self,
        display_id: DisplayId,
        app_id: impl Into<String>,
    ) -> anyhow::Result<Result<FocusReply, crate::error::AudioFocusError>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::ReleaseFocus { display_id, app_id: app_id.into(), reply })
            .await
            .map_err(|_| anyhow::anyhow!("focus engine actor is gone"))?;
        rx.await.map_err(|_| anyhow::anyhow!("focus engine actor dropped the reply"))
    }

    pub async fn get_status(
        &self,
        display_id: DisplayId,
        app_id: impl Into<String>,
        subscribe: bool,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> anyhow::Result<(StatusEnvelope, Option<Handle>)> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::GetStatus { display_id, app_id: app_id.into(), subscribe, tx, reply })
            .await
            .map_err(|_| anyhow::anyhow!("focus engine actor is gone"))?;
        rx.await.map_err(|_| anyhow::anyhow!("focus engine actor dropped the reply"))
    }

    /// Fire-and-forget cancellation (spec.md §4.4.5): no reply is expected,
    /// matching the client-disconnect path that triggers it.
    pub fn cancel(&self, bucket: Bucket, handle: Handle) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let _ = commands.send(Command::Cancel { bucket, handle }).await;
        });
    }
}

/// Spawn the engine actor, returning a handle to it. The task runs until
/// `cancel` fires or every [`EngineHandle`] clone is dropped.
pub fn spawn(policy: PolicyTable, cancel: CancellationToken) -> EngineHandle {
    let (commands, rx) = mpsc::channel(256);
    tokio::spawn(run(policy, rx, cancel));
    EngineHandle { commands }
}

async fn run(policy: PolicyTable, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
    let mut engine = FocusEngine::new(policy);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("focus engine actor shutting down");
                return;
            }
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { return };
                handle(&mut engine, cmd);
            }
        }
    }
}

fn handle(engine: &mut FocusEngine, cmd: Command) {
    match cmd {
        Command::RequestFocus { display_id, app_id, request_type, stream_type, tx, reply } => {
            let outcome = engine.request_focus(display_id, &app_id, &request_type, &stream_type, tx);
            let _ = reply.send(outcome);
        }
        Command::ReleaseFocus { display_id, app_id, reply } => {
            let result = engine.release_focus(display_id, &app_id);
            let _ = reply.send(result);
        }
        Command::GetStatus { display_id, app_id, subscribe, tx, reply } => {
            let outcome = engine.get_status(display_id, &app_id, subscribe, tx);
            let _ = reply.send(outcome);
        }
        Command::Cancel { bucket, handle } => {
            engine.cancel(bucket, handle);
        }
    }
}
