// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon lifecycle configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of the bridge daemon itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// How long shutdown waits for each link task before aborting it,
    /// in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: 500,
        }
    }
}

impl DaemonConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
