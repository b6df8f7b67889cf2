// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Zero calibration
//!
//! The bridge reports force relative to the raw Fz reading captured once at
//! startup. The offset is immutable after capture and is shared by value
//! between the streaming path and every logging session.

use crate::acquisition::Measurement;
use crate::error::BridgeError;

/// Sensor counts per Newton
pub const COUNTS_PER_NEWTON: f64 = 1_000_000.0;

/// Raw Fz reading used as the reference zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOffset(f64);

impl CalibrationOffset {
    /// Capture the offset from one raw reading
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidReading`] when the reading carries fewer
    /// than 3 force components. Startup must abort in that case.
    pub fn capture(measurement: &Measurement) -> Result<Self, BridgeError> {
        match measurement.fz() {
            Some(fz) => Ok(Self(fz)),
            None => Err(BridgeError::InvalidReading {
                components: measurement.force().len(),
            }),
        }
    }

    /// Offset from a known raw value
    pub fn from_raw(raw: f64) -> Self {
        Self(raw)
    }

    /// Raw value of the offset, in sensor counts
    pub fn raw(&self) -> f64 {
        self.0
    }

    /// Force in Newtons for a raw Fz reading
    pub fn force_newtons(&self, raw_z: f64) -> f64 {
        scalar_force(raw_z, *self)
    }
}

/// `(offset - raw_z) / 1_000_000`: raw sensor counts to Newtons
pub fn scalar_force(raw_z: f64, offset: CalibrationOffset) -> f64 {
    (offset.0 - raw_z) / COUNTS_PER_NEWTON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_force_reference_value() {
        let offset = CalibrationOffset::from_raw(500_000.0);
        assert_eq!(scalar_force(1_000_000.0, offset), -0.5);
        assert_eq!(offset.force_newtons(0.0), 0.5);
        assert_eq!(offset.force_newtons(500_000.0), 0.0);
    }

    #[test]
    fn test_scalar_force_matches_formula() {
        let cases = [
            (0.0, 0.0),
            (-3.5e9, 2.25e8),
            (1.0e12, -1.0e12),
            (123_456.0, 654_321.0),
            (f64::MAX / 4.0, -f64::MAX / 4.0),
        ];
        for (raw, zero) in cases {
            let offset = CalibrationOffset::from_raw(zero);
            assert_eq!(scalar_force(raw, offset), (zero - raw) / 1_000_000.0);
        }
    }

    #[test]
    fn test_capture_uses_third_axis() {
        let offset =
            CalibrationOffset::capture(&Measurement::new(vec![1.0, 2.0, 500_000.0, 4.0])).unwrap();
        assert_eq!(offset.raw(), 500_000.0);
    }

    #[test]
    fn test_capture_rejects_short_reading() {
        let result = CalibrationOffset::capture(&Measurement::new(vec![1.0, 2.0]));
        assert!(matches!(
            result,
            Err(BridgeError::InvalidReading { components: 2 })
        ));
    }
}
