// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC link configuration
//!
//! This module defines the structures for configuring the TCP connection to
//! the PLC and the cadence of the two link loops.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the PLC control link.
///
/// # Fields
///
/// * `address` - Address of the PLC (TCP server side of the link)
/// * `port` - TCP port of the PLC
/// * `connect_timeout_ms` - Maximum time to establish the connection
/// * `write_timeout_ms` - Maximum time for one force frame to be accepted;
///   `None` waits forever
/// * `stream_interval_ms` - Period of the force streaming loop (40 ms = 25 Hz)
/// * `status_poll_interval_ms` - Period of the status monitor loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlcConfig {
    pub address: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: Option<u64>,
    pub stream_interval_ms: u64,
    pub status_poll_interval_ms: u64,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            address: "192.168.0.1".to_string(),
            port: 2000,
            connect_timeout_ms: 5000,
            write_timeout_ms: Some(1000),
            stream_interval_ms: 40,
            status_poll_interval_ms: 10,
        }
    }
}

impl PlcConfig {
    /// `host:port` of the PLC
    pub fn socket_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_address() {
        let mut config = PlcConfig::default();
        assert_eq!(config.socket_address(), "192.168.0.1:2000");
        config.address = "::1".to_string();
        assert_eq!(config.socket_address(), "[::1]:2000");
    }
}
