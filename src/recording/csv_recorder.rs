// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CSV logging sink
//!
//! Each session opens its own sensor handle and its own file
//! (`{prefix}_{YYYYmmdd_HHMMSS}.csv`, `_N` appended when the name is taken),
//! then samples the sensor on a fixed period from a dedicated tokio task.
//! Every row is flushed as soon as it is written; the file is synced to disk
//! before the session confirms its termination.

use async_trait::async_trait;
use chrono::Local;
use log::{debug, error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{ForceSample, LoggingSink, SessionReport, SinkSession, CSV_HEADER};
use crate::acquisition::{ForceSensor, SensorFactory};
use crate::calibration::CalibrationOffset;
use crate::config::RecordingConfig;
use crate::error::BridgeError;

/// Logging sink writing one CSV file per session
pub struct CsvRecorder {
    config: RecordingConfig,
    sensors: Arc<dyn SensorFactory>,
    next_id: AtomicU64,
}

impl CsvRecorder {
    pub fn new(config: RecordingConfig, sensors: Arc<dyn SensorFactory>) -> Self {
        Self {
            config,
            sensors,
            next_id: AtomicU64::new(1),
        }
    }

    /// Directory receiving the session files
    pub fn output_dir(&self) -> &Path {
        Path::new(&self.config.output_dir)
    }
}

/// Create a file that did not exist, appending `_N` to `stem` until the name is free
async fn create_unique_file(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            format!("{}.csv", stem)
        } else {
            format!("{}_{}.csv", stem, suffix)
        };
        let path = dir.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl LoggingSink for CsvRecorder {
    async fn start(&self, offset: CalibrationOffset) -> Result<Box<dyn SinkSession>, BridgeError> {
        let sensor = self
            .sensors
            .open()
            .await
            .map_err(|e| BridgeError::SinkStart(format!("cannot open sensor: {}", e)))?;

        let dir = self.output_dir().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            BridgeError::SinkStart(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let stem = format!(
            "{}_{}",
            self.config.file_prefix,
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let (path, file) = create_unique_file(&dir, &stem).await.map_err(|e| {
            BridgeError::SinkStart(format!("cannot create session file in {}: {}", dir.display(), e))
        })?;

        let mut writer = BufWriter::new(file);
        let header = format!("{}\n", CSV_HEADER);
        if let Err(e) = write_line(&mut writer, &header).await {
            return Err(BridgeError::SinkStart(format!(
                "cannot write header to {}: {}",
                path.display(),
                e
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        info!("Logging session {} started, writing {}", id, path.display());

        let (stop_tx, stop_rx) = watch::channel(false);
        let recording = Recording {
            id,
            path: path.clone(),
            sensor,
            writer,
            offset,
            interval: self.config.interval(),
        };
        let handle = tokio::spawn(recording.run(stop_rx));

        Ok(Box::new(CsvSession {
            id,
            path,
            stop_tx,
            handle,
        }))
    }
}

async fn write_line(writer: &mut BufWriter<File>, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

/// State owned by the session task
struct Recording {
    id: u64,
    path: PathBuf,
    sensor: Box<dyn ForceSensor>,
    writer: BufWriter<File>,
    offset: CalibrationOffset,
    interval: Duration,
}

impl Recording {
    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) -> Result<SessionReport, BridgeError> {
        let mut report = SessionReport {
            id: self.id,
            path: Some(self.path.clone()),
            ..Default::default()
        };
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A dropped sender ends the session like an explicit stop
        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let reading = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                reading = self.sensor.read_measurement() => reading,
            };

            let raw_z = match reading {
                Ok(measurement) => match measurement.fz() {
                    Some(fz) => fz,
                    None => {
                        report.invalid_readings += 1;
                        debug!(
                            "Session {}: invalid reading with {} components",
                            self.id,
                            measurement.values().len()
                        );
                        continue;
                    }
                },
                Err(e) => {
                    report.invalid_readings += 1;
                    warn!("Session {}: sensor read failed: {}", self.id, e);
                    continue;
                }
            };

            let sample = ForceSample {
                elapsed: started.elapsed().as_secs_f64(),
                force_newtons: self.offset.force_newtons(raw_z),
            };
            let line = format!("{}\n", sample.csv_row());
            if let Err(e) = write_line(&mut self.writer, &line).await {
                error!("Session {}: write to {} failed: {}", self.id, self.path.display(), e);
                return Err(BridgeError::SinkStop(format!(
                    "write to {} failed: {}",
                    self.path.display(),
                    e
                )));
            }
            report.rows_written += 1;
        }

        self.finish().await?;
        Ok(report)
    }

    async fn finish(&mut self) -> Result<(), BridgeError> {
        self.writer
            .flush()
            .await
            .map_err(|e| BridgeError::SinkStop(format!("final flush failed: {}", e)))?;
        self.writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| BridgeError::SinkStop(format!("sync of {} failed: {}", self.path.display(), e)))
    }
}

/// Running CSV session
struct CsvSession {
    id: u64,
    path: PathBuf,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<SessionReport, BridgeError>>,
}

#[async_trait]
impl SinkSession for CsvSession {
    fn id(&self) -> u64 {
        self.id
    }

    async fn stop(self: Box<Self>) -> Result<SessionReport, BridgeError> {
        let CsvSession {
            id,
            path,
            stop_tx,
            handle,
        } = *self;
        debug!("Stopping logging session {}", id);
        // The task may already have ended on a write error
        let _ = stop_tx.send(true);

        let report = handle
            .await
            .map_err(|e| BridgeError::SinkStop(format!("session {} task failed: {}", id, e)))??;
        info!(
            "Logging session {} stopped: {} rows in {}",
            id,
            report.rows_written,
            path.display()
        );
        Ok(report)
    }
}
