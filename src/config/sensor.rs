// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force/torque sensor configuration
//!
//! This module defines the structures for configuring the connection to the
//! ATI Net F/T sensor.

use serde::{Deserialize, Serialize};

use crate::acquisition::netft::RDT_PORT;

/// Configuration of the force/torque sensor.
///
/// # Example
///
/// ```
/// use rust_force_bridge::config::SensorConfig;
///
/// let sensor_config = SensorConfig {
///     address: "192.168.1.10".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(sensor_config.port, 49152);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// IP address of the Net F/T box.
    pub address: String,

    /// RDT UDP port. Net F/T boxes always answer on 49152.
    pub port: u16,

    /// Maximum time to wait for one RDT record, in milliseconds.
    pub receive_timeout_ms: u64,

    /// Use a simulated sensor returning constant zero readings.
    ///
    /// Useful to exercise the PLC side without hardware.
    pub mock: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.1".to_string(),
            port: RDT_PORT,
            receive_timeout_ms: 1000,
            mock: false,
        }
    }
}
