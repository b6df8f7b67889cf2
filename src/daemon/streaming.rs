// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force streaming loop
//!
//! Reads the sensor once per cycle and sends the calibrated Fz force to the
//! PLC. Invalid readings skip the cycle. A failed send is fatal: the loop
//! requests shutdown and ends. The loop never closes the link.

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::RunState;
use crate::acquisition::ForceSensor;
use crate::calibration::CalibrationOffset;
use crate::error::BridgeError;
use crate::plc::ForceSender;

/// Counters of a finished streaming loop
#[derive(Debug, Default)]
pub struct StreamingReport {
    pub frames_sent: u64,
    pub invalid_readings: u64,
    /// Error that ended the loop, if it did not end on shutdown
    pub failure: Option<BridgeError>,
}

/// Run the streaming loop until shutdown or a send failure
pub async fn run_streaming(
    mut sensor: Box<dyn ForceSensor>,
    sender: ForceSender,
    offset: CalibrationOffset,
    interval: Duration,
    run_state: RunState,
) -> StreamingReport {
    info!("Force streaming started, period {:?}", interval);
    let mut report = StreamingReport::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while run_state.is_running() {
        tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            _ = ticker.tick() => {}
        }

        let reading = tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            reading = sensor.read_measurement() => reading,
        };
        let raw_z = match reading {
            Ok(measurement) => match measurement.fz() {
                Some(fz) => fz,
                None => {
                    report.invalid_readings += 1;
                    warn!(
                        "Invalid reading with {} components, cycle skipped",
                        measurement.values().len()
                    );
                    continue;
                }
            },
            Err(e) => {
                report.invalid_readings += 1;
                warn!("Sensor read failed, cycle skipped: {}", e);
                continue;
            }
        };

        let force = offset.force_newtons(raw_z) as f32;
        let sent = tokio::select! {
            biased;
            _ = run_state.stopped() => break,
            sent = sender.send_force(force) => sent,
        };
        match sent {
            Ok(()) => {
                report.frames_sent += 1;
                debug!("Force sent: {:.6} N", force);
            }
            Err(e) => {
                error!("Force stream to PLC failed: {}", e);
                run_state.request_shutdown("force stream failed");
                report.failure = Some(e);
                break;
            }
        }
    }

    info!(
        "Force streaming stopped after {} frames ({} invalid readings)",
        report.frames_sent, report.invalid_readings
    );
    report
}
