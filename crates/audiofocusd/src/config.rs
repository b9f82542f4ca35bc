// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the audio focus arbitration service.
#[derive(Debug, Clone, clap::Args)]
pub struct AudiofocusConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "AUDIOFOCUSD_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9900, env = "AUDIOFOCUSD_PORT")]
    pub port: u16,

    /// Path to the policy document (spec.md §6's `requestType` matrix).
    #[arg(long, env = "AUDIOFOCUSD_POLICY")]
    pub policy: std::path::PathBuf,

    /// Run in automotive mode: resolve `displayId` from a session token via
    /// the fixed `host|AVN/RSE-L/RSE-R` table instead of an explicit integer.
    #[arg(long, default_value_t = false, env = "AUDIOFOCUSD_AUTOMOTIVE")]
    pub automotive: bool,
}
