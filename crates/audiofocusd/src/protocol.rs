// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the `/ws` bus surface (spec.md §6).
//!
//! The transport itself ("the RPC/message transport and subscription
//! plumbing") is an out-of-scope external collaborator per spec.md §1;
//! these types are the minimal concrete JSON shape this crate uses to be
//! runnable end to end, not a redesign of a real bus protocol.

use serde::{Deserialize, Serialize};

/// One inbound operation, tagged by `op` (spec.md §6's operation table).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum IncomingOp {
    RequestFocus(RequestFocusParams),
    ReleaseFocus(ReleaseFocusParams),
    GetStatus(GetStatusParams),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFocusParams {
    pub request_type: String,
    pub display_id: Option<u8>,
    pub session_token: Option<String>,
    pub stream_type: String,
    #[serde(default)]
    pub subscribe: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFocusParams {
    pub display_id: Option<u8>,
    pub session_token: Option<String>,
    /// Required by the wire schema (spec.md §6) but not consulted by the
    /// engine: `releaseFocus` matches on `appId` alone (spec.md §4.4.2),
    /// so a connection holding more than one grant must issue one release
    /// per `appId` rather than disambiguate by stream.
    pub stream_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStatusParams {
    pub display_id: Option<u8>,
    pub session_token: Option<String>,
    #[serde(default)]
    pub subscribe: bool,
}

/// Result tag for `requestFocus`/`releaseFocus` replies and unicast
/// notifications (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusResult {
    Granted,
    GrantedAlready,
    CannotBeGranted,
    Pause,
    Lost,
    SuccessfullyReleased,
}

/// A single JSON frame sent back to a client: either a focus reply /
/// notification, or a status broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Focus(FocusReply),
    Status(StatusEnvelope),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusReply {
    pub return_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FocusResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl FocusReply {
    pub fn ok(result: FocusResult) -> Self {
        Self { return_value: true, result: Some(result), error_code: None, error_text: None }
    }

    /// A denied-but-successful arbitration (spec.md §7: `PolicyConflict`).
    pub fn denied() -> Self {
        Self::ok(FocusResult::CannotBeGranted)
    }

    pub fn error(code: i32, text: impl Into<String>) -> Self {
        Self {
            return_value: false,
            result: None,
            error_code: Some(code),
            error_text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEnvelope {
    pub return_value: bool,
    pub audio_focus_status: Vec<DisplayStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayStatus {
    pub display_id: u8,
    pub active_requests: Vec<AppInfoWire>,
    pub paused_requests: Vec<AppInfoWire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfoWire {
    pub app_id: String,
    pub request_type: String,
    pub stream_type: String,
}
