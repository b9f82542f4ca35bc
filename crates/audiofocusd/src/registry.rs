// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber registry: per-bucket `(appId, replyHandle)` bookkeeping
//! (spec.md §4.3).
//!
//! Owned exclusively by the single engine task (spec.md §5), so unlike
//! the teacher's `WsBridge::clients` (an `Arc<RwLock<HashMap<..>>>` shared
//! across connection tasks, `examples/groblegark-coop/crates/mux/src/upstream/bridge.rs`)
//! this is a plain struct with no locking.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::protocol::ServerMessage;
use crate::resolver::DisplayId;

/// Which operation a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    RequestFocus,
    GetStatus,
}

/// Opaque subscription handle, unique within the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

/// A single subscriber entry: who it is, which display it is scoped to,
/// and where to deliver its notifications.
struct Subscriber {
    app_id: String,
    display_id: DisplayId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Per-bucket `(handle → subscriber)` registry.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_handle: u64,
    buckets: HashMap<Bucket, HashMap<Handle, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber to `bucket`, returning its handle.
    pub fn add(
        &mut self,
        bucket: Bucket,
        app_id: impl Into<String>,
        display_id: DisplayId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Handle {
        self.next_handle += 1;
        let handle = Handle(self.next_handle);
        self.buckets.entry(bucket).or_default().insert(
            handle,
            Subscriber { app_id: app_id.into(), display_id, tx },
        );
        handle
    }

    /// Detach a subscriber. Idempotent: removing an already-absent handle
    /// is a no-op.
    pub fn remove(&mut self, bucket: Bucket, handle: Handle) {
        if let Some(entries) = self.buckets.get_mut(&bucket) {
            entries.remove(&handle);
        }
    }

    /// Send `payload` to exactly one subscriber. Returns `false` if the
    /// handle is unknown or the send failed (the peer is presumed dead;
    /// per spec.md §7 `TransportFailure` is logged by the caller, not
    /// treated as a state-changing error here).
    pub fn deliver(&self, bucket: Bucket, handle: Handle, payload: ServerMessage) -> bool {
        let Some(entries) = self.buckets.get(&bucket) else { return false };
        let Some(subscriber) = entries.get(&handle) else { return false };
        subscriber.tx.send(payload).is_ok()
    }

    /// Multicast `payload` to every subscriber of `bucket` scoped to
    /// `display_id`. Dead sends are left for cancellation to clean up
    /// (spec.md §7 `TransportFailure`).
    pub fn broadcast(&self, bucket: Bucket, display_id: DisplayId, payload: ServerMessage) {
        let Some(entries) = self.buckets.get(&bucket) else { return };
        for subscriber in entries.values().filter(|s| s.display_id == display_id) {
            let _ = subscriber.tx.send(payload.clone());
        }
    }

    /// Remove and return the `(display_id, app_id)` of `handle` in
    /// `bucket`, if present. Used by `requestFocus`'s `lost` transitions
    /// and by explicit release to drop a subscription.
    pub fn remove_by_handle(
        &mut self,
        bucket: Bucket,
        handle: Handle,
    ) -> Option<(DisplayId, String)> {
        self.buckets
            .get_mut(&bucket)?
            .remove(&handle)
            .map(|s| (s.display_id, s.app_id))
    }
}
