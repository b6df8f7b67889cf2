// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! TCP control link to the PLC
//!
//! The link is split into its two directions at connection time. Each
//! direction is parked in the shared link state between operations and taken
//! out for the duration of one I/O call, so [`ControlLink::close`] never
//! waits on a task blocked in a read or a write: it marks the link closed,
//! reclaims whatever halves are parked, and a half that is in flight is
//! dropped by its task instead of being parked again.

use crate::error::BridgeError;
use crate::plc::protocol::{encode_force, StatusSignal, STATUS_FRAME_LEN};
use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Lifecycle state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Closed,
}

struct LinkShared {
    peer: SocketAddr,
    closed: AtomicBool,
    peer_eof: AtomicBool,
    write_timeout: Option<Duration>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<StatusReader>>,
}

/// Read half plus the first byte of a status word split across reads
struct StatusReader {
    half: OwnedReadHalf,
    pending: Option<u8>,
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LinkShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_writer(&self) -> Result<OwnedWriteHalf, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::LinkClosed);
        }
        lock(&self.writer).take().ok_or(BridgeError::LinkClosed)
    }

    fn park_writer(&self, writer: OwnedWriteHalf) {
        let mut slot = lock(&self.writer);
        if !self.is_closed() {
            *slot = Some(writer);
        }
    }

    fn take_reader(&self) -> Result<StatusReader, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::LinkClosed);
        }
        lock(&self.reader).take().ok_or(BridgeError::LinkClosed)
    }

    fn park_reader(&self, reader: StatusReader) {
        let mut slot = lock(&self.reader);
        if !self.is_closed() {
            *slot = Some(reader);
        }
    }
}

/// Owner of the TCP connection to the PLC
pub struct ControlLink {
    shared: Arc<LinkShared>,
}

impl ControlLink {
    /// Open the outbound connection to `addr` (`host:port`)
    ///
    /// # Errors
    ///
    /// [`BridgeError::Connect`] when the connection is refused or does not
    /// complete within `connect_timeout`.
    pub async fn connect(
        addr: &str,
        connect_timeout: Duration,
        write_timeout: Option<Duration>,
    ) -> Result<Self, BridgeError> {
        info!("Connecting to PLC at {}", addr);
        let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(BridgeError::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(BridgeError::Connect {
                    addr: addr.to_string(),
                    source: io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no answer within {:?}", connect_timeout),
                    ),
                })
            }
        };
        let link = Self::from_stream(stream, write_timeout)?;
        info!("Connected to PLC {}", link.peer_addr());
        Ok(link)
    }

    /// Wrap an already connected stream
    pub fn from_stream(
        stream: TcpStream,
        write_timeout: Option<Duration>,
    ) -> Result<Self, BridgeError> {
        let peer = stream.peer_addr().map_err(|source| BridgeError::Connect {
            addr: "unknown peer".to_string(),
            source,
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle on PLC link: {}", e);
        }
        let (reader, writer) = stream.into_split();
        Ok(Self {
            shared: Arc::new(LinkShared {
                peer,
                closed: AtomicBool::new(false),
                peer_eof: AtomicBool::new(false),
                write_timeout,
                writer: Mutex::new(Some(writer)),
                reader: Mutex::new(Some(StatusReader {
                    half: reader,
                    pending: None,
                })),
            }),
        })
    }

    /// Address of the PLC
    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer
    }

    pub fn state(&self) -> LinkState {
        if self.shared.is_closed() {
            LinkState::Closed
        } else {
            LinkState::Connected
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Handle on the write direction
    pub fn force_sender(&self) -> ForceSender {
        ForceSender {
            shared: self.shared.clone(),
        }
    }

    /// Handle on the read direction
    pub fn status_receiver(&self) -> StatusReceiver {
        StatusReceiver {
            shared: self.shared.clone(),
        }
    }

    /// Close the link
    ///
    /// Idempotent. Once this returns, every send and receive fails with
    /// [`BridgeError::LinkClosed`].
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            debug!("PLC link already closed");
            return;
        }
        info!("Closing PLC link to {}", self.shared.peer);

        let writer = lock(&self.shared.writer).take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!("PLC link write shutdown: {}", e);
            }
        }
        drop(lock(&self.shared.reader).take());
    }
}

/// Write direction of the link
#[derive(Clone)]
pub struct ForceSender {
    shared: Arc<LinkShared>,
}

impl ForceSender {
    /// Send one force frame
    ///
    /// # Errors
    ///
    /// [`BridgeError::LinkWrite`] on any I/O failure or write timeout,
    /// [`BridgeError::LinkClosed`] once the link is closed.
    pub async fn send_force(&self, value: f32) -> Result<(), BridgeError> {
        let frame = encode_force(value);
        let mut writer = self.shared.take_writer()?;
        let result = match self.shared.write_timeout {
            Some(limit) => match timeout(limit, writer.write_all(&frame)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("force frame not accepted within {:?}", limit),
                )),
            },
            None => writer.write_all(&frame).await,
        };
        self.shared.park_writer(writer);
        result.map_err(BridgeError::LinkWrite)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// Read direction of the link
#[derive(Clone)]
pub struct StatusReceiver {
    shared: Arc<LinkShared>,
}

impl StatusReceiver {
    /// Read one status word
    ///
    /// A complete 2-byte word is decoded. A short read yields
    /// [`StatusSignal::Unknown`] and its byte is kept as the start of the
    /// next word, so the stream stays aligned on the PLC's frames. A
    /// zero-length read and any unrecognized word also yield
    /// [`StatusSignal::Unknown`]. Only a hard disconnect is reported as
    /// [`BridgeError::LinkRead`].
    pub async fn recv_status(&self) -> Result<StatusSignal, BridgeError> {
        let mut reader = self.shared.take_reader()?;
        let mut buf = [0u8; STATUS_FRAME_LEN];
        let start = match reader.pending {
            Some(byte) => {
                buf[0] = byte;
                1
            }
            None => 0,
        };
        let result = reader.half.read(&mut buf[start..]).await;
        match result {
            Ok(0) => reader.pending = None,
            Ok(len) if start + len < STATUS_FRAME_LEN => reader.pending = Some(buf[0]),
            Ok(_) => reader.pending = None,
            Err(_) => {}
        }
        self.shared.park_reader(reader);

        match result {
            Ok(0) => {
                if !self.shared.peer_eof.swap(true, Ordering::SeqCst) {
                    warn!("PLC closed its side of the status stream");
                }
                Ok(StatusSignal::Unknown)
            }
            Ok(len) if start + len < STATUS_FRAME_LEN => {
                debug!("Partial status word {:02X?}, waiting for the rest", &buf[..start + len]);
                Ok(StatusSignal::Unknown)
            }
            Ok(_) => {
                let signal = StatusSignal::decode(&buf);
                if signal == StatusSignal::Unknown {
                    debug!("Ignoring status bytes {:02X?}", buf);
                }
                Ok(signal)
            }
            Err(e) if is_hard_disconnect(&e) => Err(BridgeError::LinkRead(e)),
            Err(e) => {
                warn!("Transient status read error: {}", e);
                Ok(StatusSignal::Unknown)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

fn is_hard_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}
