// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force bridge library
//!
//! Streams the calibrated vertical force of an ATI Net F/T sensor to a PLC
//! over TCP and records CSV logging sessions whenever the PLC asks for them.

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod daemon;
pub mod error;
pub mod plc;
pub mod recording;

pub use error::BridgeError;
