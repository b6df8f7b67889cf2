// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock force sensor
//!
//! Replays a scripted sequence of readings, then repeats a fallback reading
//! forever. Used by the `sensor.mock` configuration switch and by tests.

use super::{ForceSensor, Measurement, SensorFactory};
use crate::error::BridgeError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

/// Mock sensor returning scripted readings
#[derive(Debug, Clone)]
pub struct MockForceSensor {
    script: VecDeque<Measurement>,
    fallback: Measurement,
    bias: Vec<f64>,
    reads: Arc<AtomicUsize>,
}

impl MockForceSensor {
    /// Sensor that always returns the same raw values
    pub fn constant(values: Vec<f64>) -> Self {
        Self::scripted(Vec::new(), values)
    }

    /// Sensor that returns `script` in order, then `fallback` forever
    pub fn scripted(script: Vec<Vec<f64>>, fallback: Vec<f64>) -> Self {
        Self {
            script: script.into_iter().map(Measurement::new).collect(),
            fallback: Measurement::new(fallback),
            bias: Vec::new(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of reads served, shared between clones
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForceSensor for MockForceSensor {
    async fn read_measurement(&mut self) -> Result<Measurement, BridgeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut measurement = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        measurement.subtract_bias(&self.bias);
        Ok(measurement)
    }

    fn bias(&self) -> &[f64] {
        &self.bias
    }

    fn set_bias(&mut self, bias: Vec<f64>) {
        self.bias = bias;
    }
}

/// Factory handing out clones of a template mock sensor
pub struct MockSensorFactory {
    template: MockForceSensor,
    opened: AtomicUsize,
    fail_open: AtomicBool,
}

impl MockSensorFactory {
    pub fn new(template: MockForceSensor) -> Self {
        Self {
            template,
            opened: AtomicUsize::new(0),
            fail_open: AtomicBool::new(false),
        }
    }

    /// Make subsequent `open` calls fail, simulating an unreachable sensor
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Number of sensors opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorFactory for MockSensorFactory {
    async fn open(&self) -> Result<Box<dyn ForceSensor>, BridgeError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BridgeError::Sensor("mock sensor unavailable".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.template.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let mut sensor =
            MockForceSensor::scripted(vec![vec![0.0, 0.0, 1.0], vec![0.0]], vec![0.0, 0.0, 9.0]);
        assert_eq!(sensor.read_measurement().await.unwrap().fz(), Some(1.0));
        assert!(!sensor.read_measurement().await.unwrap().is_valid());
        assert_eq!(sensor.read_measurement().await.unwrap().fz(), Some(9.0));
        assert_eq!(sensor.read_measurement().await.unwrap().fz(), Some(9.0));
        assert_eq!(sensor.read_count(), 4);
    }

    #[tokio::test]
    async fn test_factory_failure() {
        let factory = MockSensorFactory::new(MockForceSensor::constant(vec![0.0; 3]));
        assert!(factory.open().await.is_ok());
        factory.set_fail_open(true);
        assert!(matches!(factory.open().await, Err(BridgeError::Sensor(_))));
        assert_eq!(factory.opened(), 1);
    }
}
