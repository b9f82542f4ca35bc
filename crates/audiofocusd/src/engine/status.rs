// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StatusPublisher (spec.md §4.6): serializes a display's state into the
//! wire `audioFocusStatus` payload. Pure — no I/O, no knowledge of the
//! subscriber registry; the engine actor is the one that pushes the
//! result to subscribers.

use crate::engine::state::DisplayState;
use crate::protocol::{DisplayStatus, StatusEnvelope};
use crate::resolver::DisplayId;

/// Build the single-display status payload spec.md §4.6 describes.
pub fn build_status(display_id: DisplayId, state: &DisplayState) -> StatusEnvelope {
    StatusEnvelope {
        return_value: true,
        audio_focus_status: vec![DisplayStatus {
            display_id: display_id.as_u8(),
            active_requests: state.active_wire(),
            paused_requests: state.paused_wire(),
        }],
    }
}
