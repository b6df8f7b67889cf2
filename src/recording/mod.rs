// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logging sessions driven by the PLC
//!
//! The supervisor only sees the [`LoggingSink`] capability: it starts a
//! session when the PLC raises the logging flag and stops it when the flag
//! drops. A session runs isolated from the streaming path, with its own
//! sensor handle and its own output, and is stopped by a request-and-confirm
//! handshake so its data is flushed before the stop returns.

pub mod csv_recorder;

pub use csv_recorder::CsvRecorder;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::calibration::CalibrationOffset;
use crate::error::BridgeError;

/// Header line of a session file
pub const CSV_HEADER: &str = "Time,Force (N)";

/// One recorded point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSample {
    /// Seconds since the session started
    pub elapsed: f64,
    /// Calibrated force in Newtons
    pub force_newtons: f64,
}

impl ForceSample {
    /// CSV line for this sample, without line terminator
    pub fn csv_row(&self) -> String {
        format!("{},{}", self.elapsed, self.force_newtons)
    }
}

/// Outcome of a stopped session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub id: u64,
    /// File written by the session, if the sink writes files
    pub path: Option<PathBuf>,
    pub rows_written: u64,
    pub invalid_readings: u64,
}

/// Capability to start logging sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoggingSink: Send + Sync {
    /// Start a new session converting readings with `offset`
    ///
    /// # Errors
    ///
    /// [`BridgeError::SinkStart`] when the session cannot be started. No
    /// session is running in that case.
    async fn start(&self, offset: CalibrationOffset) -> Result<Box<dyn SinkSession>, BridgeError>;
}

/// Handle on a running session
#[async_trait]
pub trait SinkSession: Send {
    /// Identifier, unique per sink
    fn id(&self) -> u64;

    /// Request termination and wait until the session confirms it
    ///
    /// # Errors
    ///
    /// [`BridgeError::SinkStop`] when the session ended abnormally. The
    /// session is gone either way.
    async fn stop(self: Box<Self>) -> Result<SessionReport, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_row() {
        let sample = ForceSample {
            elapsed: 0.01,
            force_newtons: -0.5,
        };
        assert_eq!(sample.csv_row(), "0.01,-0.5");
    }
}
