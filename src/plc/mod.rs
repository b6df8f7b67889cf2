// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC communication module
//!
//! The bridge is the TCP client, the PLC is the server. One full-duplex
//! connection carries two independent fixed-length streams:
//!
//! ## Outbound (bridge → PLC)
//!
//! - 4 bytes per frame: calibrated force in Newtons, big-endian IEEE-754 `f32`
//! - one frame per streaming cycle (~25 Hz), no delimiter
//!
//! ## Inbound (PLC → bridge)
//!
//! - 2 bytes per frame: status word
//! - `0x0100` enables logging, `0x0000` disables it, anything else is ignored
//!
//! ## Key Components
//!
//! - [`ControlLink`]: owns the connection and its `Connected`/`Closed` state
//! - [`ForceSender`]: write direction, used by the streaming task only
//! - [`StatusReceiver`]: read direction, used by the status monitor only

pub mod control_link;
pub mod protocol;

pub use control_link::{ControlLink, ForceSender, LinkState, StatusReceiver};
pub use protocol::{encode_force, StatusSignal, FORCE_FRAME_LEN, STATUS_FRAME_LEN};
