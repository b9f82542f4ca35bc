// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client/engine error taxonomy (spec.md §7).
///
/// `PolicyConflict` is deliberately not an error in the protocol sense:
/// `requestFocus` denied by the policy matrix replies with
/// `returnValue: true` and `result: CANNOT_BE_GRANTED`, never an
/// `errorCode`. It is kept in this enum anyway so callers can match on a
/// single type and decide how to reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFocusError {
    /// Malformed JSON frame, or an empty/unresolvable `appId`. Invalid
    /// display ids and unknown request types are reported through their
    /// own paths (`ERR_CODE_INVALID_DISPLAY_ID`, `UnknownRequest`).
    InvalidSchema,
    /// `requestType` not present in the loaded policy table.
    UnknownRequest,
    /// `releaseFocus` for an app with no grant on the display.
    NotRegistered,
    /// Arbitration ran and denied the request. Not a protocol error.
    PolicyConflict,
    /// Anything else (should not normally surface to a client).
    Internal,
}

impl AudioFocusError {
    /// Numeric error code from spec.md §6. `PolicyConflict` has no code:
    /// it is reported via `result`, not `errorCode`.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::InvalidSchema => Some(1),
            Self::UnknownRequest => Some(2),
            Self::Internal => Some(3),
            Self::NotRegistered => Some(3),
            Self::PolicyConflict => None,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::InvalidSchema => "invalid schema",
            Self::UnknownRequest => "unknown request type",
            Self::NotRegistered => "Application not registered",
            Self::PolicyConflict => "denied by policy",
            Self::Internal => "internal error",
        }
    }
}

impl fmt::Display for AudioFocusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl std::error::Error for AudioFocusError {}

/// Error code for an invalid display id, used directly by handlers
/// (spec.md §6: `4 = INVALID_DISPLAY_ID`) since it is not raised by the
/// engine itself — display id validation happens before the engine is
/// ever called.
pub const ERR_CODE_INVALID_DISPLAY_ID: i32 = 4;
