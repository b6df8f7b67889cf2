// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logging supervisor
//!
//! Two-state machine driven by the PLC status signals:
//!
//! | State     | Signal     | Action                        | Next      |
//! |-----------|------------|-------------------------------|-----------|
//! | `Idle`    | `Active`   | start a session               | `Logging` |
//! | `Idle`    | `Active`   | start fails (logged)          | `Idle`    |
//! | `Logging` | `Active`   | none                          | `Logging` |
//! | `Logging` | `Inactive` | stop the session and wait     | `Idle`    |
//! | `Idle`    | `Inactive` | none                          | `Idle`    |
//! | any       | `Unknown`  | none                          | unchanged |
//!
//! At most one session exists at any time.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::RunState;
use crate::calibration::CalibrationOffset;
use crate::plc::StatusSignal;
use crate::recording::{LoggingSink, SessionReport, SinkSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Logging,
}

/// Owner of the logging session lifecycle
pub struct LoggingSupervisor {
    sink: Arc<dyn LoggingSink>,
    offset: CalibrationOffset,
    session: Option<Box<dyn SinkSession>>,
    sessions_started: u64,
    reports: Vec<SessionReport>,
}

impl LoggingSupervisor {
    pub fn new(sink: Arc<dyn LoggingSink>, offset: CalibrationOffset) -> Self {
        Self {
            sink,
            offset,
            session: None,
            sessions_started: 0,
            reports: Vec::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        if self.session.is_some() {
            SupervisorState::Logging
        } else {
            SupervisorState::Idle
        }
    }

    pub fn is_logging(&self) -> bool {
        self.session.is_some()
    }

    /// Number of sessions successfully started
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Reports of the sessions stopped so far
    pub fn reports(&self) -> &[SessionReport] {
        &self.reports
    }

    /// Apply one status signal
    pub async fn on_signal(&mut self, signal: StatusSignal) {
        match (self.state(), signal) {
            (SupervisorState::Idle, StatusSignal::Active) => self.start_session().await,
            (SupervisorState::Logging, StatusSignal::Inactive) => self.stop_session().await,
            (_, StatusSignal::Unknown) => {}
            (state, signal) => debug!("{:?} ignored while {:?}", signal, state),
        }
    }

    /// Stop the active session, if any, and wait for it
    pub async fn shutdown(&mut self) {
        if self.is_logging() {
            info!("Stopping active logging session on shutdown");
            self.stop_session().await;
        }
    }

    /// Consume signals until the channel closes or shutdown is requested
    pub async fn run(&mut self, mut signals: mpsc::Receiver<StatusSignal>, run_state: &RunState) {
        while run_state.is_running() {
            let signal = tokio::select! {
                biased;
                _ = run_state.stopped() => break,
                signal = signals.recv() => signal,
            };
            match signal {
                Some(signal) => self.on_signal(signal).await,
                None => {
                    debug!("Status channel closed");
                    break;
                }
            }
        }
    }

    async fn start_session(&mut self) {
        match self.sink.start(self.offset).await {
            Ok(session) => {
                self.sessions_started += 1;
                info!("Logging started (session {})", session.id());
                self.session = Some(session);
            }
            Err(e) => {
                // Stay idle, the next Active retries
                error!("Failed to start logging: {}", e);
            }
        }
    }

    async fn stop_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let id = session.id();
        match session.stop().await {
            Ok(report) => {
                info!(
                    "Logging stopped (session {}, {} rows)",
                    id, report.rows_written
                );
                self.reports.push(report);
            }
            Err(e) => warn!("Logging session {} did not stop cleanly: {}", id, e),
        }
    }
}
