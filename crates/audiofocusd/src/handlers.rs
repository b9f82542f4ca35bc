// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RequestHandlers (spec.md §4.5): schema validation, `displayId`/`appId`
//! resolution, and dispatch into the engine actor. One instance is shared
//! by every connection; `app_id` is per-connection context resolved by the
//! transport layer (spec.md §4.5: "resolves `appId`... from transport").

use tokio::sync::mpsc;

use crate::engine::actor::EngineHandle;
use crate::error::{AudioFocusError, ERR_CODE_INVALID_DISPLAY_ID};
use crate::policy::PolicyTable;
use crate::protocol::{FocusReply, GetStatusParams, IncomingOp, ReleaseFocusParams, RequestFocusParams, ServerMessage};
use crate::registry::{Bucket, Handle};
use crate::resolver::{DisplayId, DisplayResolver};

/// Per-connection context a handler needs but a single JSON frame doesn't
/// carry on its own.
pub struct RequestContext<'a> {
    pub app_id: &'a str,
    pub automotive: bool,
}

/// Dispatch one parsed operation. Returns the reply to send back over the
/// socket and, when the operation created a subscription, the
/// `(bucket, handle)` pair the connection task must remember so it can
/// cancel it on disconnect (spec.md §4.4.5).
pub async fn handle_op(
    op: IncomingOp,
    ctx: &RequestContext<'_>,
    policy: &PolicyTable,
    resolver: &DisplayResolver,
    engine: &EngineHandle,
    tx: mpsc::UnboundedSender<ServerMessage>,
) -> (ServerMessage, Option<(Bucket, Handle)>) {
    if ctx.app_id.is_empty() {
        return (schema_error("appId must not be empty"), None);
    }

    match op {
        IncomingOp::RequestFocus(params) => {
            handle_request_focus(params, ctx, policy, resolver, engine, tx).await
        }
        IncomingOp::ReleaseFocus(params) => {
            handle_release_focus(params, ctx, resolver, engine).await
        }
        IncomingOp::GetStatus(params) => {
            handle_get_status(params, ctx, resolver, engine, tx).await
        }
    }
}

async fn handle_request_focus(
    params: RequestFocusParams,
    ctx: &RequestContext<'_>,
    policy: &PolicyTable,
    resolver: &DisplayResolver,
    engine: &EngineHandle,
    tx: mpsc::UnboundedSender<ServerMessage>,
) -> (ServerMessage, Option<(Bucket, Handle)>) {
    if !params.subscribe {
        return (focus_error(AudioFocusError::Internal), None);
    }
    if !policy.is_known(&params.request_type) {
        return (
            focus_error(AudioFocusError::UnknownRequest),
            None,
        );
    }

    let display_id = match resolve_display_id(
        params.display_id,
        params.session_token.as_deref(),
        ctx.automotive,
        resolver,
    ) {
        Ok(id) => id,
        Err(reply) => return (ServerMessage::Focus(reply), None),
    };

    match engine
        .request_focus(display_id, ctx.app_id, &params.request_type, &params.stream_type, tx)
        .await
    {
        Ok((reply, handle)) => {
            (ServerMessage::Focus(reply), handle.map(|h| (Bucket::RequestFocus, h)))
        }
        Err(err) => {
            tracing::warn!(%err, "focus engine actor unavailable for requestFocus");
            (focus_error(AudioFocusError::Internal), None)
        }
    }
}

async fn handle_release_focus(
    params: ReleaseFocusParams,
    ctx: &RequestContext<'_>,
    resolver: &DisplayResolver,
    engine: &EngineHandle,
) -> (ServerMessage, Option<(Bucket, Handle)>) {
    let display_id = match resolve_display_id(
        params.display_id,
        params.session_token.as_deref(),
        ctx.automotive,
        resolver,
    ) {
        Ok(id) => id,
        Err(reply) => return (ServerMessage::Focus(reply), None),
    };

    match engine.release_focus(display_id, ctx.app_id).await {
        Ok(Ok(reply)) => (ServerMessage::Focus(reply), None),
        Ok(Err(err)) => (focus_error(err), None),
        Err(err) => {
            tracing::warn!(%err, "focus engine actor unavailable for releaseFocus");
            (focus_error(AudioFocusError::Internal), None)
        }
    }
}

async fn handle_get_status(
    params: GetStatusParams,
    ctx: &RequestContext<'_>,
    resolver: &DisplayResolver,
    engine: &EngineHandle,
    tx: mpsc::UnboundedSender<ServerMessage>,
) -> (ServerMessage, Option<(Bucket, Handle)>) {
    let display_id = match resolve_display_id(
        params.display_id,
        params.session_token.as_deref(),
        ctx.automotive,
        resolver,
    ) {
        Ok(id) => id,
        Err(reply) => return (ServerMessage::Focus(reply), None),
    };

    match engine.get_status(display_id, ctx.app_id, params.subscribe, tx).await {
        Ok((status, handle)) => {
            (ServerMessage::Status(status), handle.map(|h| (Bucket::GetStatus, h)))
        }
        Err(err) => {
            tracing::warn!(%err, "focus engine actor unavailable for getStatus");
            (focus_error(AudioFocusError::Internal), None)
        }
    }
}

/// Resolve the effective display id: automotive builds derive it from the
/// session token, others take the explicit integer (spec.md §4.2/§6).
fn resolve_display_id(
    explicit: Option<u8>,
    session_token: Option<&str>,
    automotive: bool,
    resolver: &DisplayResolver,
) -> Result<DisplayId, FocusReply> {
    let resolved = if automotive {
        session_token.and_then(|token| resolver.resolve(token))
    } else {
        explicit.and_then(|raw| DisplayId::try_from(raw).ok())
    };
    resolved.ok_or_else(|| FocusReply::error(ERR_CODE_INVALID_DISPLAY_ID, "invalid display id"))
}

fn schema_error(text: &str) -> ServerMessage {
    ServerMessage::Focus(FocusReply::error(
        AudioFocusError::InvalidSchema.code().unwrap_or(1),
        text,
    ))
}

fn focus_error(err: AudioFocusError) -> ServerMessage {
    ServerMessage::Focus(FocusReply::error(err.code().unwrap_or(3), err.text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::actor;
    use crate::protocol::{FocusResult, IncomingOp};
    use tokio_util::sync::CancellationToken;

    const POLICY: &str = r#"{
        "requestType": [
            { "request": "AFREQUEST_GAIN", "priority": 1, "incoming": [] }
        ]
    }"#;

    fn ctx(app_id: &str) -> RequestContext<'_> {
        RequestContext { app_id, automotive: false }
    }

    #[test]
    fn resolve_display_id_accepts_explicit_integer_in_non_automotive_mode() {
        let resolver = DisplayResolver::empty();
        let result = resolve_display_id(Some(1), None, false, &resolver);
        assert_eq!(result.unwrap(), DisplayId::RSE_L);
    }

    #[test]
    fn resolve_display_id_rejects_out_of_range_integer() {
        let resolver = DisplayResolver::empty();
        let reply = resolve_display_id(Some(9), None, false, &resolver).unwrap_err();
        assert_eq!(reply.error_code, Some(ERR_CODE_INVALID_DISPLAY_ID));
    }

    #[test]
    fn resolve_display_id_uses_session_token_in_automotive_mode() {
        let resolver = DisplayResolver::with_automotive_defaults();
        let result = resolve_display_id(None, Some("RSE-L"), true, &resolver);
        assert_eq!(result.unwrap(), DisplayId::RSE_L);
    }

    #[tokio::test]
    async fn request_focus_with_subscribe_false_is_internal_error() {
        let policy = PolicyTable::parse(POLICY).expect("valid policy");
        let resolver = DisplayResolver::empty();
        let engine = actor::spawn(policy.clone(), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        let op = IncomingOp::RequestFocus(RequestFocusParams {
            request_type: "AFREQUEST_GAIN".into(),
            display_id: Some(0),
            session_token: None,
            stream_type: "music".into(),
            subscribe: false,
        });

        let (reply, handle) = handle_op(op, &ctx("app.a"), &policy, &resolver, &engine, tx).await;
        assert!(handle.is_none());
        match reply {
            ServerMessage::Focus(r) => assert_eq!(r.error_code, Some(3)),
            ServerMessage::Status(_) => panic!("expected a focus reply"),
        }
    }

    #[tokio::test]
    async fn empty_app_id_is_rejected_as_invalid_schema() {
        let policy = PolicyTable::parse(POLICY).expect("valid policy");
        let resolver = DisplayResolver::empty();
        let engine = actor::spawn(policy.clone(), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        let op = IncomingOp::RequestFocus(RequestFocusParams {
            request_type: "AFREQUEST_GAIN".into(),
            display_id: Some(0),
            session_token: None,
            stream_type: "music".into(),
            subscribe: true,
        });

        let (reply, handle) = handle_op(op, &ctx(""), &policy, &resolver, &engine, tx).await;
        assert!(handle.is_none());
        match reply {
            ServerMessage::Focus(r) => assert_eq!(r.error_code, Some(1)),
            ServerMessage::Status(_) => panic!("expected a focus reply"),
        }
    }

    #[tokio::test]
    async fn unknown_request_type_is_rejected() {
        let policy = PolicyTable::parse(POLICY).expect("valid policy");
        let resolver = DisplayResolver::empty();
        let engine = actor::spawn(policy.clone(), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        let op = IncomingOp::RequestFocus(RequestFocusParams {
            request_type: "NOT_A_TYPE".into(),
            display_id: Some(0),
            session_token: None,
            stream_type: "music".into(),
            subscribe: true,
        });

        let (reply, _handle) = handle_op(op, &ctx("app.a"), &policy, &resolver, &engine, tx).await;
        match reply {
            ServerMessage::Focus(r) => assert_eq!(r.error_code, Some(2)),
            ServerMessage::Status(_) => panic!("expected a focus reply"),
        }
    }

    #[tokio::test]
    async fn successful_request_focus_returns_a_trackable_handle() {
        let policy = PolicyTable::parse(POLICY).expect("valid policy");
        let resolver = DisplayResolver::empty();
        let engine = actor::spawn(policy.clone(), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        let op = IncomingOp::RequestFocus(RequestFocusParams {
            request_type: "AFREQUEST_GAIN".into(),
            display_id: Some(0),
            session_token: None,
            stream_type: "music".into(),
            subscribe: true,
        });

        let (reply, handle) = handle_op(op, &ctx("app.a"), &policy, &resolver, &engine, tx).await;
        assert!(handle.is_some());
        match reply {
            ServerMessage::Focus(r) => assert_eq!(r.result, Some(FocusResult::Granted)),
            ServerMessage::Status(_) => panic!("expected a focus reply"),
        }
    }
}
