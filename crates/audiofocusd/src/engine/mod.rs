// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The focus arbitration engine (spec.md §4.4): per-display active/paused
//! state, the feasibility/transition algorithm, and the actor that owns
//! it all on a single Tokio task.

pub mod actor;
mod focus;
pub mod state;
pub mod status;

use crate::policy::PolicyTable;
use crate::registry::SubscriberRegistry;
use crate::resolver::DisplayId;
use state::DisplayState;

/// Per-display active/paused state plus the subscriber registry that
/// joins grants to reply channels. Owned exclusively by one actor task
/// (spec.md §5) — no field here needs locking.
pub struct FocusEngine {
    policy: PolicyTable,
    displays: [DisplayState; 3],
    registry: SubscriberRegistry,
}

impl FocusEngine {
    pub fn new(policy: PolicyTable) -> Self {
        Self {
            policy,
            displays: [DisplayState::default(), DisplayState::default(), DisplayState::default()],
            registry: SubscriberRegistry::new(),
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Read-only view of one display's active/paused lists, for status
    /// reporting and tests.
    pub fn snapshot(&self, id: DisplayId) -> &DisplayState {
        self.display(id)
    }

    fn display(&self, id: DisplayId) -> &DisplayState {
        &self.displays[id.as_u8() as usize]
    }

    fn display_mut(&mut self, id: DisplayId) -> &mut DisplayState {
        &mut self.displays[id.as_u8() as usize]
    }
}
