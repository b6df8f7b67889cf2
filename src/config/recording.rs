// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CSV recording configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the CSV logging sessions started by the PLC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory receiving one CSV file per logging session.
    ///
    /// Created on the first session if missing.
    pub output_dir: String,

    /// Sampling period of a logging session in milliseconds (10 ms = 100 Hz).
    pub interval_ms: u64,

    /// File name prefix, followed by the session start time
    /// (`output_20250101_120000.csv`).
    pub file_prefix: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: "data_logging".to_string(),
            interval_ms: 10,
            file_prefix: "output".to_string(),
        }
    }
}

impl RecordingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
