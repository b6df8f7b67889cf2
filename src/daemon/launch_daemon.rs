// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use super::status_monitor::{run_status_monitor, MonitorReport};
use super::streaming::{run_streaming, StreamingReport};
use super::supervisor::LoggingSupervisor;
use super::RunState;
use crate::acquisition::{BiasedSensorFactory, ForceSensor, SensorFactory};
use crate::calibration::CalibrationOffset;
use crate::config::Config;
use crate::plc::ControlLink;
use crate::recording::{CsvRecorder, LoggingSink, SessionReport};

/// Capacity of the status channel between the monitor and the supervisor
const STATUS_CHANNEL_CAPACITY: usize = 16;

/// Outcome of a bridge run
#[derive(Debug, Default)]
pub struct BridgeSummary {
    pub offset: Option<CalibrationOffset>,
    pub frames_sent: u64,
    pub invalid_readings: u64,
    pub signals_received: u64,
    pub sessions_started: u64,
    pub sessions: Vec<SessionReport>,
    /// Fatal link error that ended the run, if any
    pub failure: Option<String>,
}

/// Sensor to PLC bridge daemon
///
/// Owns the startup sequence, the two link tasks and the logging
/// supervisor. Shutdown is requested through the [`RunState`] returned by
/// [`BridgeDaemon::run_state`] or by a fatal link error.
pub struct BridgeDaemon {
    config: Config,
    sensors: Arc<dyn SensorFactory>,
    sink: Option<Arc<dyn LoggingSink>>,
    tare_samples: Option<u32>,
    run_state: RunState,
}

impl BridgeDaemon {
    /// Create a daemon reading its sensors from `sensors`
    pub fn new(config: Config, sensors: Arc<dyn SensorFactory>) -> Self {
        Self {
            config,
            sensors,
            sink: None,
            tare_samples: None,
            run_state: RunState::new(),
        }
    }

    /// Replace the CSV logging sink
    pub fn with_sink(mut self, sink: Arc<dyn LoggingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Tare the sensor with `samples` readings before calibration
    pub fn with_tare(mut self, samples: u32) -> Self {
        self.tare_samples = Some(samples);
        self
    }

    /// Token stopping the daemon when switched off
    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    /// Run the bridge until shutdown
    ///
    /// Startup order: open and optionally tare the sensor, connect to the
    /// PLC, capture the calibration offset. A startup failure is returned as
    /// an error and leaves no task or connection behind. A fatal link error
    /// during the run is reported in [`BridgeSummary::failure`].
    pub async fn run(self) -> Result<BridgeSummary> {
        let BridgeDaemon {
            config,
            sensors,
            sink,
            tare_samples,
            run_state,
        } = self;

        let mut sensor = sensors.open().await.context("Failed to open force sensor")?;
        let mut session_sensors = sensors.clone();
        if let Some(samples) = tare_samples {
            info!("Taring sensor with {} samples", samples);
            sensor.tare(samples).await.context("Failed to tare force sensor")?;
            session_sensors = Arc::new(BiasedSensorFactory::new(
                sensors.clone(),
                sensor.bias().to_vec(),
            ));
        }
        let sink = match sink {
            Some(sink) => sink,
            None => Arc::new(CsvRecorder::new(
                config.recording.clone(),
                session_sensors,
            )) as Arc<dyn LoggingSink>,
        };

        let link = ControlLink::connect(
            &config.plc.socket_address(),
            config.plc.connect_timeout(),
            config.plc.write_timeout(),
        )
        .await
        .context("Failed to connect to PLC")?;

        let offset = match capture_offset(sensor.as_mut()).await {
            Ok(offset) => offset,
            Err(e) => {
                link.close().await;
                return Err(e);
            }
        };
        info!("Calibration offset captured: {} counts", offset.raw());

        let (signal_tx, signal_rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);

        debug!("Starting force streaming task");
        let streaming: JoinHandle<StreamingReport> = tokio::spawn(run_streaming(
            sensor,
            link.force_sender(),
            offset,
            config.plc.stream_interval(),
            run_state.clone(),
        ));

        debug!("Starting status monitor task");
        let monitor: JoinHandle<MonitorReport> = tokio::spawn(run_status_monitor(
            link.status_receiver(),
            signal_tx,
            config.plc.status_poll_interval(),
            run_state.clone(),
        ));

        info!("Bridge running");
        let mut supervisor = LoggingSupervisor::new(sink, offset);
        supervisor.run(signal_rx, &run_state).await;

        // The supervisor loop only ends early when the monitor is gone
        run_state.request_shutdown("bridge stopping");

        let join_timeout = config.daemon.join_timeout();
        let streaming = join_task("force streaming", streaming, join_timeout).await;
        let monitor = join_task("status monitor", monitor, join_timeout).await;

        supervisor.shutdown().await;
        link.close().await;

        let mut summary = BridgeSummary {
            offset: Some(offset),
            sessions_started: supervisor.sessions_started(),
            sessions: supervisor.reports().to_vec(),
            ..Default::default()
        };
        if let Some(report) = streaming {
            summary.frames_sent = report.frames_sent;
            summary.invalid_readings = report.invalid_readings;
            summary.failure = report.failure.map(|e| e.to_string());
        }
        if let Some(report) = monitor {
            summary.signals_received = report.signals_forwarded;
            if summary.failure.is_none() {
                summary.failure = report.failure.map(|e| e.to_string());
            }
        }

        info!(
            "Bridge stopped: {} frames sent, {} logging sessions",
            summary.frames_sent, summary.sessions_started
        );
        Ok(summary)
    }
}

async fn capture_offset(sensor: &mut dyn ForceSensor) -> Result<CalibrationOffset> {
    let reading = sensor
        .read_measurement()
        .await
        .context("Failed to read calibration sample")?;
    CalibrationOffset::capture(&reading).context("Failed to capture calibration offset")
}

/// Wait for a task for at most `limit`, aborting it past that
async fn join_task<T>(name: &str, mut handle: JoinHandle<T>, limit: Duration) -> Option<T> {
    match time::timeout(limit, &mut handle).await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            error!("Task {} panicked: {}", name, e);
            None
        }
        Err(_) => {
            warn!("Task {} did not stop within {:?}, aborting", name, limit);
            handle.abort();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{MockForceSensor, MockSensorFactory};
    use tokio::net::TcpListener;

    fn config_for(addr: std::net::SocketAddr, output_dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.plc.address = addr.ip().to_string();
        config.plc.port = addr.port();
        config.plc.connect_timeout_ms = 1000;
        config.plc.stream_interval_ms = 5;
        config.plc.status_poll_interval_ms = 1;
        config.recording.output_dir = output_dir.to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_invalid_calibration_aborts_startup() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(listener.local_addr().unwrap(), dir.path());
        let sensors = Arc::new(MockSensorFactory::new(MockForceSensor::constant(vec![
            0.0, 0.0,
        ])));

        let daemon = BridgeDaemon::new(config, sensors);
        let (result, accepted) = tokio::join!(daemon.run(), listener.accept());
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid sensor reading"));

        // The link was closed before returning
        let (mut plc, _) = accepted.unwrap();
        let mut buf = [0u8; 4];
        let read = tokio::io::AsyncReadExt::read(&mut plc, &mut buf).await.unwrap();
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn test_unreachable_plc_aborts_startup() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let sensors = Arc::new(MockSensorFactory::new(MockForceSensor::constant(vec![
            0.0;
            6
        ])));

        let result = BridgeDaemon::new(config_for(addr, dir.path()), sensors)
            .run()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sensor_unavailable_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let sensors = Arc::new(MockSensorFactory::new(MockForceSensor::constant(vec![
            0.0;
            6
        ])));
        sensors.set_fail_open(true);
        let addr = "127.0.0.1:9".parse().unwrap();

        let result = BridgeDaemon::new(config_for(addr, dir.path()), sensors)
            .run()
            .await;
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open force sensor"));
    }
}
