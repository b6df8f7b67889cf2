// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! ATI Net F/T sensor driver
//!
//! Talks the Raw Data Transfer (RDT) protocol over UDP.
//!
//! ### Request (8 bytes, big-endian)
//!
//! | Offset | Type | Content |
//! |--------|------|---------|
//! | 0 | u16 | header, always `0x1234` |
//! | 2 | u16 | command |
//! | 4 | u32 | sample count (0 = infinite) |
//!
//! ### Response record (36 bytes, big-endian)
//!
//! | Offset | Type | Content |
//! |--------|------|---------|
//! | 0 | u32 | RDT sequence |
//! | 4 | u32 | F/T sequence |
//! | 8 | u32 | status |
//! | 12 | 6 × i32 | Fx, Fy, Fz, Tx, Ty, Tz in counts |

use super::{ForceSensor, Measurement, SensorFactory, MEASUREMENT_AXES};
use crate::config::SensorConfig;
use crate::error::BridgeError;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Default RDT UDP port of a Net F/T box
pub const RDT_PORT: u16 = 49152;

const RDT_HEADER: u16 = 0x1234;
const CMD_START_STREAMING: u16 = 0x0002;
const RECORD_HEADER_LEN: usize = 12;
const RECORD_LEN: usize = RECORD_HEADER_LEN + MEASUREMENT_AXES * 4;

/// Encode an RDT request
pub fn encode_request(command: u16, sample_count: u32) -> [u8; 8] {
    let mut request = [0u8; 8];
    request[0..2].copy_from_slice(&RDT_HEADER.to_be_bytes());
    request[2..4].copy_from_slice(&command.to_be_bytes());
    request[4..8].copy_from_slice(&sample_count.to_be_bytes());
    request
}

/// Decode an RDT record into a measurement
///
/// Only complete 4-byte components are kept, so a truncated datagram yields a
/// measurement with fewer components (an invalid reading when under 3).
pub fn decode_record(datagram: &[u8]) -> Measurement {
    if datagram.len() <= RECORD_HEADER_LEN {
        return Measurement::default();
    }
    let values = datagram[RECORD_HEADER_LEN..]
        .chunks_exact(4)
        .take(MEASUREMENT_AXES)
        .map(|chunk| i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64)
        .collect();
    Measurement::new(values)
}

/// Net F/T sensor reached over UDP
pub struct NetFtSensor {
    socket: UdpSocket,
    receive_timeout: Duration,
    bias: Vec<f64>,
}

impl NetFtSensor {
    /// Bind a local UDP socket and associate it with the sensor address
    pub async fn connect(
        address: &str,
        port: u16,
        receive_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| BridgeError::Sensor(format!("Failed to bind UDP socket: {}", e)))?;
        socket.connect((address, port)).await.map_err(|e| {
            BridgeError::Sensor(format!(
                "Failed to reach Net F/T sensor at {}:{}: {}",
                address, port, e
            ))
        })?;
        debug!("Net F/T socket associated with {}:{}", address, port);
        Ok(Self {
            socket,
            receive_timeout,
            bias: Vec::new(),
        })
    }

    /// Drop records still queued from an earlier request, such as a reply
    /// that arrived after its receive timeout
    fn discard_stale_records(&self) {
        let mut buf = [0u8; RECORD_LEN];
        let mut stale = 0;
        while self.socket.try_recv(&mut buf).is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("Discarded {} stale RDT records", stale);
        }
    }

    async fn send_request(&self, command: u16, sample_count: u32) -> Result<(), BridgeError> {
        self.discard_stale_records();
        self.socket
            .send(&encode_request(command, sample_count))
            .await
            .map_err(|e| BridgeError::Sensor(format!("Failed to send RDT request: {}", e)))?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Measurement, BridgeError> {
        let mut buf = [0u8; RECORD_LEN];
        let len = match timeout(self.receive_timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => {
                return Err(BridgeError::Sensor(format!(
                    "Failed to receive RDT record: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(BridgeError::Sensor(format!(
                    "No RDT record within {:?}",
                    self.receive_timeout
                )))
            }
        };
        if len < RECORD_LEN {
            warn!("Truncated RDT record: {} of {} bytes", len, RECORD_LEN);
        }
        let mut measurement = decode_record(&buf[..len]);
        measurement.subtract_bias(&self.bias);
        Ok(measurement)
    }
}

#[async_trait]
impl ForceSensor for NetFtSensor {
    async fn read_measurement(&mut self) -> Result<Measurement, BridgeError> {
        self.send_request(CMD_START_STREAMING, 1).await?;
        self.receive().await
    }

    async fn read_measurements(&mut self, count: u32) -> Result<Vec<Measurement>, BridgeError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.send_request(CMD_START_STREAMING, count).await?;
        let mut measurements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            measurements.push(self.receive().await?);
        }
        Ok(measurements)
    }

    fn bias(&self) -> &[f64] {
        &self.bias
    }

    fn set_bias(&mut self, bias: Vec<f64>) {
        self.bias = bias;
    }
}

/// Opens a fresh UDP association with the sensor for every caller
pub struct NetFtSensorFactory {
    address: String,
    port: u16,
    receive_timeout: Duration,
}

impl NetFtSensorFactory {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            receive_timeout: Duration::from_millis(config.receive_timeout_ms),
        }
    }
}

#[async_trait]
impl SensorFactory for NetFtSensorFactory {
    async fn open(&self) -> Result<Box<dyn ForceSensor>, BridgeError> {
        let sensor = NetFtSensor::connect(&self.address, self.port, self.receive_timeout).await?;
        Ok(Box::new(sensor))
    }
}
