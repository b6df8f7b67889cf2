// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon module runs the bridge between the force sensor and the PLC.
//!
//! ## Components
//!
//! * **Launch Daemon**: [`BridgeDaemon`], startup sequence and graceful shutdown
//! * **Streaming**: force frames sent to the PLC every 40 ms
//! * **Status Monitor**: status words read from the PLC every 10 ms
//! * **Supervisor**: logging sessions started and stopped on PLC request
//! * **Run State**: cancellation token shared by all of the above
//!
//! ## Usage
//!
//! ```no_run
//! use rust_force_bridge::acquisition::sensor_factory_from_config;
//! use rust_force_bridge::{config::Config, daemon::BridgeDaemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!     let sensors = sensor_factory_from_config(&config.sensor);
//!
//!     let daemon = BridgeDaemon::new(config, sensors);
//!     let run_state = daemon.run_state();
//!     tokio::spawn(async move {
//!         if tokio::signal::ctrl_c().await.is_ok() {
//!             run_state.request_shutdown("Ctrl+C");
//!         }
//!     });
//!
//!     let summary = daemon.run().await?;
//!     println!("{} frames sent", summary.frames_sent);
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;
pub mod run_state;
pub mod status_monitor;
pub mod streaming;
pub mod supervisor;

pub use launch_daemon::{BridgeDaemon, BridgeSummary};
pub use run_state::RunState;
pub use status_monitor::{run_status_monitor, MonitorReport};
pub use streaming::{run_streaming, StreamingReport};
pub use supervisor::{LoggingSupervisor, SupervisorState};
