// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy table: the immutable "incoming request → action" matrix loaded
//! once at startup (spec.md §4.1/§6).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// What happens to an already-active holder when another request type
/// arrives while it holds focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Pause,
    Lost,
    Mix,
}

/// One `requestType` entry from the policy config file.
#[derive(Debug, Clone, Deserialize)]
struct RawPolicyEntry {
    request: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    incoming: Vec<HashMap<String, Action>>,
}

/// Top-level shape of the policy JSON document (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
struct RawPolicyConfig {
    #[serde(rename = "requestType")]
    request_type: Vec<RawPolicyEntry>,
}

/// Resolved policy for a single request type.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pub priority: i32,
    incoming: HashMap<String, Action>,
}

/// Immutable, read-only policy table consulted by the engine.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    entries: HashMap<String, PolicyEntry>,
}

impl PolicyTable {
    /// Load and parse the policy document at `path`. A missing file or a
    /// malformed document is a `ConfigError` (spec.md §7): fatal at
    /// startup, never recovered from inside the table itself.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading policy config {}: {e}", path.display()))?;
        Self::parse(&contents)
    }

    /// Parse a policy document already read into memory.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let raw: RawPolicyConfig = serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("parsing policy config: {e}"))?;

        let mut entries = HashMap::with_capacity(raw.request_type.len());
        for raw_entry in raw.request_type {
            let Some(request) = raw_entry.request else {
                tracing::warn!("policy config entry missing `request`, skipping");
                continue;
            };
            let mut incoming = HashMap::new();
            for table in raw_entry.incoming {
                for (other, action) in table {
                    incoming.insert(other, action);
                }
            }
            entries.insert(request, PolicyEntry { priority: raw_entry.priority, incoming });
        }

        Ok(Self { entries })
    }

    /// Look up the policy entry for a request type name.
    pub fn lookup(&self, request_type: &str) -> Option<&PolicyEntry> {
        self.entries.get(request_type)
    }

    /// Whether `request_type` is known to the table.
    pub fn is_known(&self, request_type: &str) -> bool {
        self.entries.contains_key(request_type)
    }

    /// Action to take when `arriving_type` arrives while `holder_type` is
    /// active. `None` means undefined — the pair is incompatible
    /// (spec.md §4.4.3: "silence in the matrix means undefined
    /// interaction → deny"). Also `None` if either type is unknown.
    pub fn action_for(&self, holder_type: &str, arriving_type: &str) -> Option<Action> {
        self.entries.get(holder_type)?.incoming.get(arriving_type).copied()
    }
}
