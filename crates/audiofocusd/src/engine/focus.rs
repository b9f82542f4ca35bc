// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core focus-arbitration algorithms (spec.md §4.4.1–§4.4.6), as methods
//! on [`FocusEngine`](super::FocusEngine).

use tokio::sync::mpsc;

use super::state::{AppInfo, Entry};
use super::FocusEngine;
use crate::error::AudioFocusError;
use crate::policy::Action;
use crate::protocol::{FocusReply, FocusResult, ServerMessage, StatusEnvelope};
use crate::registry::{Bucket, Handle};
use crate::resolver::DisplayId;

impl FocusEngine {
    /// `requestFocus` (spec.md §4.4.1). Returns the synchronous reply and,
    /// on a fresh grant, the new subscription handle (for the caller's
    /// own bookkeeping — see `registry::Handle`'s design note).
    pub fn request_focus(
        &mut self,
        display_id: DisplayId,
        app_id: &str,
        request_type: &str,
        stream_type: &str,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> (FocusReply, Option<Handle>) {
        // Step 1: duplicate check.
        if self.display(display_id).contains(app_id, request_type) {
            return (FocusReply::ok(FocusResult::GrantedAlready), None);
        }

        // Step 2: feasibility.
        if !self.is_feasible(display_id, request_type) {
            return (FocusReply::denied(), None);
        }

        // Step 3: transitions to the active list (snapshot order).
        let actions: Vec<Action> = self
            .display(display_id)
            .active
            .iter()
            .map(|e| {
                self.policy
                    .action_for(&e.info.request_type, request_type)
                    .unwrap_or(Action::Mix) // unreachable: is_feasible already checked this is Some.
            })
            .collect();

        let active_entries = std::mem::take(&mut self.display_mut(display_id).active);
        let mut still_active = Vec::with_capacity(active_entries.len());
        for (entry, action) in active_entries.into_iter().zip(actions) {
            match action {
                Action::Mix => still_active.push(entry),
                Action::Pause => {
                    self.registry.deliver(
                        Bucket::RequestFocus,
                        entry.handle,
                        ServerMessage::Focus(FocusReply::ok(FocusResult::Pause)),
                    );
                    self.display_mut(display_id).paused.push(entry);
                }
                Action::Lost => {
                    self.registry.deliver(
                        Bucket::RequestFocus,
                        entry.handle,
                        ServerMessage::Focus(FocusReply::ok(FocusResult::Lost)),
                    );
                    self.registry.remove(Bucket::RequestFocus, entry.handle);
                }
            }
        }
        self.display_mut(display_id).active = still_active;

        // Step 4: lost transitions on the paused list.
        let paused_entries = std::mem::take(&mut self.display_mut(display_id).paused);
        let mut still_paused = Vec::with_capacity(paused_entries.len());
        for entry in paused_entries {
            if self.policy.action_for(&entry.info.request_type, request_type) == Some(Action::Lost)
            {
                self.registry.deliver(
                    Bucket::RequestFocus,
                    entry.handle,
                    ServerMessage::Focus(FocusReply::ok(FocusResult::Lost)),
                );
                self.registry.remove(Bucket::RequestFocus, entry.handle);
            } else {
                still_paused.push(entry);
            }
        }
        self.display_mut(display_id).paused = still_paused;

        // Step 5: grant.
        let handle = self.registry.add(Bucket::RequestFocus, app_id, display_id, tx);
        self.display_mut(display_id).active.push(Entry {
            info: AppInfo {
                app_id: app_id.to_owned(),
                request_type: request_type.to_owned(),
                stream_type: stream_type.to_owned(),
            },
            handle,
        });

        // Step 6: broadcast.
        self.broadcast_status(display_id);

        (FocusReply::ok(FocusResult::Granted), Some(handle))
    }

    /// `isFeasible` (spec.md §4.4.3). Feasible iff every currently active
    /// entry has a defined action for `arriving_type`; an empty active
    /// list is always feasible.
    pub fn is_feasible(&self, display_id: DisplayId, arriving_type: &str) -> bool {
        self.display(display_id)
            .active
            .iter()
            .all(|e| self.policy.action_for(&e.info.request_type, arriving_type).is_some())
    }

    /// `releaseFocus` (spec.md §4.4.2).
    pub fn release_focus(
        &mut self,
        display_id: DisplayId,
        app_id: &str,
    ) -> Result<FocusReply, AudioFocusError> {
        let display = self.display_mut(display_id);
        let (entry, was_active) = if let Some(pos) =
            display.active.iter().position(|e| e.info.app_id == app_id)
        {
            (display.active.remove(pos), true)
        } else if let Some(pos) = display.paused.iter().position(|e| e.info.app_id == app_id) {
            (display.paused.remove(pos), false)
        } else {
            return Err(AudioFocusError::NotRegistered);
        };

        self.registry.remove(Bucket::RequestFocus, entry.handle);

        if was_active {
            self.promote(display_id, &entry.info.request_type);
        }

        self.broadcast_status(display_id);
        Ok(FocusReply::ok(FocusResult::SuccessfullyReleased))
    }

    /// `getStatus` (spec.md §4.6), optionally subscribing the caller to
    /// future broadcasts on this display.
    pub fn get_status(
        &mut self,
        display_id: DisplayId,
        app_id: &str,
        subscribe: bool,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> (StatusEnvelope, Option<Handle>) {
        let handle =
            subscribe.then(|| self.registry.add(Bucket::GetStatus, app_id, display_id, tx));
        (super::status::build_status(display_id, self.display(display_id)), handle)
    }

    /// Subscription cancellation (spec.md §4.4.5 for `requestFocus`; a
    /// plain unregister for `getStatus`, which carries no engine-state
    /// side effect of its own).
    pub fn cancel(&mut self, bucket: Bucket, handle: Handle) {
        match bucket {
            Bucket::RequestFocus => self.cancel_request_focus(handle),
            Bucket::GetStatus => {
                self.registry.remove(Bucket::GetStatus, handle);
            }
        }
    }

    fn cancel_request_focus(&mut self, handle: Handle) {
        let Some((display_id, _app_id)) = self.registry.remove_by_handle(Bucket::RequestFocus, handle)
        else {
            return;
        };

        let display = self.display_mut(display_id);
        if let Some(pos) = display.active.iter().position(|e| e.handle == handle) {
            let entry = display.active.remove(pos);
            self.promote(display_id, &entry.info.request_type);
            self.broadcast_status(display_id);
        } else if let Some(pos) = display.paused.iter().position(|e| e.handle == handle) {
            display.paused.remove(pos);
            self.broadcast_status(display_id);
        }
    }

    /// Paused-to-active promotion (spec.md §4.4.4), triggered by the
    /// removal of an active entry of type `trigger_type`.
    fn promote(&mut self, display_id: DisplayId, trigger_type: &str) {
        let display = self.display_mut(display_id);
        if display.active.is_empty() && display.paused.len() == 1 {
            let entry = display.paused.remove(0);
            let handle = entry.handle;
            display.active.push(entry);
            self.registry.deliver(
                Bucket::RequestFocus,
                handle,
                ServerMessage::Focus(FocusReply::ok(FocusResult::Granted)),
            );
            return;
        }

        loop {
            let promote_idx = {
                let display = self.display(display_id);
                let mut found = None;
                for (i, p) in display.paused.iter().enumerate() {
                    let blocked_by_trigger =
                        self.policy.action_for(&p.info.request_type, trigger_type)
                            == Some(Action::Pause);
                    if !blocked_by_trigger {
                        continue;
                    }
                    let still_obstructed = display.active.iter().any(|a| {
                        matches!(
                            self.policy.action_for(&a.info.request_type, &p.info.request_type),
                            Some(Action::Pause) | Some(Action::Lost)
                        )
                    });
                    if !still_obstructed {
                        found = Some(i);
                        break;
                    }
                }
                found
            };

            let Some(i) = promote_idx else { break };
            let display = self.display_mut(display_id);
            let entry = display.paused.remove(i);
            let handle = entry.handle;
            display.active.push(entry);
            self.registry.deliver(
                Bucket::RequestFocus,
                handle,
                ServerMessage::Focus(FocusReply::ok(FocusResult::Granted)),
            );
        }
    }

    fn broadcast_status(&self, display_id: DisplayId) {
        let payload = super::status::build_status(display_id, self.display(display_id));
        self.registry.broadcast(Bucket::GetStatus, display_id, ServerMessage::Status(payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyTable;

    fn engine_with(policy_json: &str) -> FocusEngine {
        FocusEngine::new(PolicyTable::parse(policy_json).expect("valid policy"))
    }

    fn chan() -> (mpsc::UnboundedSender<ServerMessage>, mpsc::UnboundedReceiver<ServerMessage>) {
        mpsc::unbounded_channel()
    }

    fn recv_result(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> FocusResult {
        match rx.try_recv().expect("expected a message") {
            ServerMessage::Focus(reply) => reply.result.expect("expected a result"),
            ServerMessage::Status(_) => panic!("expected a focus message, got status"),
        }
    }

    // Scenario 1: single grant.
    #[test]
    fn single_grant() {
        let mut engine = engine_with(r#"{"requestType":[{"request":"MEDIA","priority":1,"incoming":[]}]}"#);
        let (tx, _rx) = chan();
        let (reply, handle) =
            engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx);
        assert_eq!(reply.result, Some(FocusResult::Granted));
        assert!(handle.is_some());
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
    }

    // Scenario 2: duplicate grant.
    #[test]
    fn duplicate_grant_is_idempotent() {
        let mut engine = engine_with(r#"{"requestType":[{"request":"MEDIA","priority":1,"incoming":[]}]}"#);
        let (tx, _rx) = chan();
        engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx.clone());
        let (reply, handle) = engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx);
        assert_eq!(reply.result, Some(FocusResult::GrantedAlready));
        assert!(handle.is_none());
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
    }

    // Scenario 3: pause then resume.
    #[test]
    fn pause_then_resume_on_release() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [ { "NAV": "pause" } ] },
                { "request": "NAV", "priority": 2, "incoming": [ { "MEDIA": "mix" } ] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_a, mut rx_a) = chan();
        let (tx_b, mut rx_b) = chan();

        engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);
        let (reply_b, _) = engine.request_focus(DisplayId::HOST, "B", "NAV", "prompt", tx_b);

        assert_eq!(reply_b.result, Some(FocusResult::Granted));
        assert_eq!(recv_result(&mut rx_a), FocusResult::Pause);
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
        assert_eq!(engine.display(DisplayId::HOST).paused.len(), 1);

        let release = engine.release_focus(DisplayId::HOST, "B").expect("registered");
        assert_eq!(release.result, Some(FocusResult::SuccessfullyReleased));
        assert_eq!(recv_result(&mut rx_a), FocusResult::Granted);
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
        assert!(engine.display(DisplayId::HOST).paused.is_empty());
    }

    // Scenario 4: lost transition.
    #[test]
    fn lost_transition_drops_subscription() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [ { "CALL": "lost" } ] },
                { "request": "CALL", "priority": 10, "incoming": [ { "MEDIA": "mix" } ] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_a, mut rx_a) = chan();
        let (tx_c, _rx_c) = chan();

        engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);
        let (reply_c, _) = engine.request_focus(DisplayId::HOST, "C", "CALL", "call", tx_c);

        assert_eq!(reply_c.result, Some(FocusResult::Granted));
        assert_eq!(recv_result(&mut rx_a), FocusResult::Lost);
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
        assert_eq!(engine.display(DisplayId::HOST).active[0].info.app_id, "C");
        assert!(engine.display(DisplayId::HOST).paused.is_empty());
    }

    // Scenario 5: infeasible request.
    #[test]
    fn infeasible_request_denied() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [] },
                { "request": "CALL", "priority": 10, "incoming": [] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_c, _rx_c) = chan();
        let (tx_a, _rx_a) = chan();

        engine.request_focus(DisplayId::HOST, "C", "CALL", "call", tx_c);
        let (reply_a, handle) = engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);

        assert_eq!(reply_a.result, Some(FocusResult::CannotBeGranted));
        assert!(handle.is_none());
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
    }

    // Scenario 6: cancellation promotes the paused holder.
    #[test]
    fn cancellation_promotes_paused_holder() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [ { "NAV": "pause" } ] },
                { "request": "NAV", "priority": 2, "incoming": [ { "MEDIA": "mix" } ] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_a, mut rx_a) = chan();
        let (tx_b, _rx_b) = chan();

        let (_, handle_a) = engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);
        engine.request_focus(DisplayId::HOST, "B", "NAV", "prompt", tx_b);
        assert_eq!(recv_result(&mut rx_a), FocusResult::Pause);

        engine.cancel(Bucket::RequestFocus, handle_a.expect("granted"));

        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
        assert_eq!(engine.display(DisplayId::HOST).active[0].info.app_id, "B");
        assert!(engine.display(DisplayId::HOST).paused.is_empty());
    }

    #[test]
    fn release_of_unregistered_app_is_not_registered() {
        let mut engine = engine_with(r#"{"requestType":[{"request":"MEDIA","priority":1,"incoming":[]}]}"#);
        let err = engine.release_focus(DisplayId::HOST, "ghost").unwrap_err();
        assert_eq!(err, AudioFocusError::NotRegistered);
    }

    #[test]
    fn mix_leaves_active_entries_untouched() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [ { "NAV": "mix" } ] },
                { "request": "NAV", "priority": 2, "incoming": [ { "MEDIA": "mix" } ] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_a, mut rx_a) = chan();
        let (tx_b, _rx_b) = chan();

        engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);
        let (reply_b, _) = engine.request_focus(DisplayId::HOST, "B", "NAV", "prompt", tx_b);

        assert_eq!(reply_b.result, Some(FocusResult::Granted));
        assert!(rx_a.try_recv().is_err(), "A should receive no notification on mix");
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 2);
    }

    #[test]
    fn displays_are_independent() {
        let policy = r#"{
            "requestType": [
                { "request": "MEDIA", "priority": 1, "incoming": [ { "CALL": "lost" } ] },
                { "request": "CALL", "priority": 10, "incoming": [ { "MEDIA": "mix" } ] }
            ]
        }"#;
        let mut engine = engine_with(policy);
        let (tx_a, mut rx_a) = chan();
        let (tx_c, _rx_c) = chan();

        engine.request_focus(DisplayId::HOST, "A", "MEDIA", "music", tx_a);
        engine.request_focus(DisplayId::RSE_L, "C", "CALL", "call", tx_c);

        // A is on a different display and must be untouched.
        assert!(rx_a.try_recv().is_err());
        assert_eq!(engine.display(DisplayId::HOST).active.len(), 1);
        assert_eq!(engine.display(DisplayId::RSE_L).active.len(), 1);
    }
}
