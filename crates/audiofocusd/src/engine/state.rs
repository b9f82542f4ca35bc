// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-display data model (spec.md §3): `AppInfo` and the active/paused
//! `DisplayState` lists.

use crate::protocol::AppInfoWire;
use crate::registry::Handle;

/// A granted or paused application request. `(app_id, request_type)`
/// identifies a grant uniquely within a display (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub app_id: String,
    pub request_type: String,
    pub stream_type: String,
}

impl AppInfo {
    pub fn to_wire(&self) -> AppInfoWire {
        AppInfoWire {
            app_id: self.app_id.clone(),
            request_type: self.request_type.clone(),
            stream_type: self.stream_type.clone(),
        }
    }
}

/// An `AppInfo` paired with the subscriber-registry handle used to notify
/// it later (`PAUSE`/`LOST`/`GRANTED`).
#[derive(Debug)]
pub struct Entry {
    pub info: AppInfo,
    pub handle: Handle,
}

/// Active/paused lists for a single display (spec.md §3). Insertion order
/// is the arbitration order.
#[derive(Debug, Default)]
pub struct DisplayState {
    pub active: Vec<Entry>,
    pub paused: Vec<Entry>,
}

impl DisplayState {
    /// Whether `(app_id, request_type)` already holds a grant, active or
    /// paused (spec.md §4.4.1 step 1).
    pub fn contains(&self, app_id: &str, request_type: &str) -> bool {
        self.active.iter().chain(self.paused.iter()).any(|e| matches(e, app_id, request_type))
    }

    pub fn active_wire(&self) -> Vec<AppInfoWire> {
        self.active.iter().map(|e| e.info.to_wire()).collect()
    }

    pub fn paused_wire(&self) -> Vec<AppInfoWire> {
        self.paused.iter().map(|e| e.info.to_wire()).collect()
    }
}

fn matches(entry: &Entry, app_id: &str, request_type: &str) -> bool {
    entry.info.app_id == app_id && entry.info.request_type == request_type
}
