// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy of the bridge
//!
//! Status words that match neither recognized pattern are not errors: they
//! decode to [`crate::plc::StatusSignal::Unknown`] and are only logged.

use std::io;
use thiserror::Error;

/// Errors raised by the sensor, the PLC link and the logging sink
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The sensor returned fewer than the 3 force components
    #[error("Invalid sensor reading: expected at least 3 force components, got {components}")]
    InvalidReading { components: usize },

    /// The sensor could not be queried
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// The outbound connection to the PLC could not be established
    #[error("Failed to connect to PLC at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing a force frame failed (fatal for the streaming path)
    #[error("Failed to write force frame to PLC: {0}")]
    LinkWrite(#[source] io::Error),

    /// Hard failure of the status read direction
    #[error("Failed to read status word from PLC: {0}")]
    LinkRead(#[source] io::Error),

    /// I/O was attempted on a link that has been closed
    #[error("PLC link is closed")]
    LinkClosed,

    /// The logging sink could not start a session
    #[error("Logging session failed to start: {0}")]
    SinkStart(String),

    /// The logging sink did not confirm a clean termination
    #[error("Logging session failed to stop cleanly: {0}")]
    SinkStop(String),
}

impl BridgeError {
    /// Whether this error must bring the whole bridge down
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Connect { .. }
                | BridgeError::LinkWrite(_)
                | BridgeError::LinkRead(_)
                | BridgeError::LinkClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_errors_are_fatal() {
        let err = BridgeError::LinkWrite(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.is_fatal());
        assert!(BridgeError::LinkClosed.is_fatal());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(!BridgeError::InvalidReading { components: 2 }.is_fatal());
        assert!(!BridgeError::SinkStart("no space left".to_string()).is_fatal());
        assert!(!BridgeError::SinkStop("join failed".to_string()).is_fatal());
    }

    #[test]
    fn test_invalid_reading_message() {
        let err = BridgeError::InvalidReading { components: 1 };
        assert_eq!(
            err.to_string(),
            "Invalid sensor reading: expected at least 3 force components, got 1"
        );
    }
}
