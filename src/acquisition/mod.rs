// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force/torque acquisition module
//!
//! This module handles the acquisition of force and torque measurements from
//! an ATI Net F/T sensor (RDT protocol over UDP) or from a mock sensor used
//! for simulation and tests.
//!
//! Every consumer owns its own sensor handle: the streaming path opens one at
//! startup and each logging session opens another through the same
//! [`SensorFactory`], so a stalled logging session never shares a socket with
//! the streaming path.

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

pub mod mock;
pub mod netft;

pub use mock::{MockForceSensor, MockSensorFactory};
pub use netft::{NetFtSensor, NetFtSensorFactory};

use crate::config::SensorConfig;
use crate::error::BridgeError;

/// Number of force components of a valid reading (Fx, Fy, Fz)
pub const FORCE_AXES: usize = 3;

/// Number of components of a full force/torque record (Fx, Fy, Fz, Tx, Ty, Tz)
pub const MEASUREMENT_AXES: usize = 6;

/// Raw reading of the sensor, in sensor counts
///
/// A full record carries `Fx, Fy, Fz, Tx, Ty, Tz`. A truncated record carries
/// fewer components; a reading with fewer than [`FORCE_AXES`] components is
/// invalid and must not be turned into a force value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    values: Vec<f64>,
}

impl Measurement {
    /// Create a measurement from raw component values
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// All components carried by this reading
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Force components (at most 3)
    pub fn force(&self) -> &[f64] {
        &self.values[..self.values.len().min(FORCE_AXES)]
    }

    /// Torque components (at most 3, empty for a force-only reading)
    pub fn torque(&self) -> &[f64] {
        let end = self.values.len().min(MEASUREMENT_AXES);
        if end <= FORCE_AXES {
            return &[];
        }
        &self.values[FORCE_AXES..end]
    }

    /// Third force axis, present only on a valid reading
    pub fn fz(&self) -> Option<f64> {
        self.values.get(2).copied()
    }

    /// Whether the reading carries the 3 force components
    pub fn is_valid(&self) -> bool {
        self.force().len() >= FORCE_AXES
    }

    /// Subtract a per-axis bias from the components present in this reading
    pub fn subtract_bias(&mut self, bias: &[f64]) {
        for (value, offset) in self.values.iter_mut().zip(bias.iter()) {
            *value -= *offset;
        }
    }
}

/// Per-axis mean of a set of measurements
///
/// Used for taring. Only components present in every measurement are
/// averaged; an empty input yields an empty bias.
pub fn mean_bias(measurements: &[Measurement]) -> Vec<f64> {
    let axes = measurements
        .iter()
        .map(|m| m.values().len())
        .min()
        .unwrap_or(0);
    let count = measurements.len() as f64;
    (0..axes)
        .map(|axis| measurements.iter().map(|m| m.values()[axis]).sum::<f64>() / count)
        .collect()
}

/// A force/torque sensor that can be queried on demand
#[async_trait]
pub trait ForceSensor: Send {
    /// Read one measurement, with the current bias already subtracted
    async fn read_measurement(&mut self) -> Result<Measurement, BridgeError>;

    /// Read `count` consecutive measurements
    async fn read_measurements(&mut self, count: u32) -> Result<Vec<Measurement>, BridgeError> {
        let mut measurements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            measurements.push(self.read_measurement().await?);
        }
        Ok(measurements)
    }

    /// Current per-axis bias (empty when the sensor was never tared)
    fn bias(&self) -> &[f64];

    /// Replace the per-axis bias
    fn set_bias(&mut self, bias: Vec<f64>);

    /// Tare the sensor with the mean of `samples` raw measurements
    async fn tare(&mut self, samples: u32) -> Result<(), BridgeError> {
        self.set_bias(Vec::new());
        let measurements = self.read_measurements(samples.max(1)).await?;
        let bias = mean_bias(&measurements);
        debug!("Sensor tared with {} samples, bias: {:?}", samples, bias);
        self.set_bias(bias);
        Ok(())
    }
}

/// Opens independent sensor handles
#[async_trait]
pub trait SensorFactory: Send + Sync {
    /// Open a new sensor handle
    async fn open(&self) -> Result<Box<dyn ForceSensor>, BridgeError>;
}

/// Factory applying a fixed bias to every sensor it opens
///
/// After the streaming sensor has been tared, logging sessions open their
/// sensors through this wrapper so both paths share the same zero.
pub struct BiasedSensorFactory {
    inner: Arc<dyn SensorFactory>,
    bias: Vec<f64>,
}

impl BiasedSensorFactory {
    pub fn new(inner: Arc<dyn SensorFactory>, bias: Vec<f64>) -> Self {
        Self { inner, bias }
    }
}

#[async_trait]
impl SensorFactory for BiasedSensorFactory {
    async fn open(&self) -> Result<Box<dyn ForceSensor>, BridgeError> {
        let mut sensor = self.inner.open().await?;
        sensor.set_bias(self.bias.clone());
        Ok(sensor)
    }
}

/// Build the sensor factory selected by the configuration
pub fn sensor_factory_from_config(config: &SensorConfig) -> Arc<dyn SensorFactory> {
    if config.mock {
        debug!("Using mock force sensor");
        Arc::new(MockSensorFactory::new(MockForceSensor::constant(vec![
            0.0;
            MEASUREMENT_AXES
        ])))
    } else {
        debug!(
            "Using Net F/T sensor at {}:{}",
            config.address, config.port
        );
        Arc::new(NetFtSensorFactory::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_axes() {
        let m = Measurement::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.force(), &[1.0, 2.0, 3.0]);
        assert_eq!(m.torque(), &[4.0, 5.0, 6.0]);
        assert_eq!(m.fz(), Some(3.0));
        assert!(m.is_valid());
    }

    #[test]
    fn test_short_measurement_is_invalid() {
        let m = Measurement::new(vec![1.0, 2.0]);
        assert_eq!(m.force(), &[1.0, 2.0]);
        assert!(m.torque().is_empty());
        assert_eq!(m.fz(), None);
        assert!(!m.is_valid());
        assert!(!Measurement::default().is_valid());
    }

    #[test]
    fn test_mean_bias_uses_common_axes() {
        let measurements = vec![
            Measurement::new(vec![2.0, 4.0, 6.0, 8.0]),
            Measurement::new(vec![4.0, 8.0, 12.0]),
        ];
        assert_eq!(mean_bias(&measurements), vec![3.0, 6.0, 9.0]);
        assert!(mean_bias(&[]).is_empty());
    }

    #[test]
    fn test_subtract_bias() {
        let mut m = Measurement::new(vec![10.0, 20.0, 30.0]);
        m.subtract_bias(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.values(), &[9.0, 18.0, 27.0]);
    }

    #[tokio::test]
    async fn test_tare_zeroes_constant_sensor() {
        let mut sensor = MockForceSensor::constant(vec![5.0, -5.0, 1000.0]);
        sensor.tare(10).await.unwrap();
        let m = sensor.read_measurement().await.unwrap();
        assert_eq!(m.values(), &[0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_biased_factory_applies_bias() {
        let inner: Arc<dyn SensorFactory> = Arc::new(MockSensorFactory::new(
            MockForceSensor::constant(vec![1.0, 1.0, 1.0]),
        ));
        let factory = BiasedSensorFactory::new(inner, vec![1.0, 1.0, 0.5]);
        let mut sensor = factory.open().await.unwrap();
        let m = sensor.read_measurement().await.unwrap();
        assert_eq!(m.values(), &[0.0, 0.0, 0.5]);
    }
}
