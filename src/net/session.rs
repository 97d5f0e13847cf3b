//! Network session for one utterance
//!
//! One TCP connection per utterance: raw little-endian PCM frames, a 4-byte
//! end marker, then a single acknowledgment byte back from the backend. No
//! length prefixes; the audio format is a fixed out-of-band agreement.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::audio::{AudioFrame, FRAME_BYTES};
use crate::{Error, Result};

/// End-of-audio marker expected by the backend
pub const END_MARKER: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Acknowledgment byte the backend writes on success
pub const ACK_OK: u8 = 0x01;

/// Outcome of one bounded acknowledgment poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPoll {
    /// Nothing arrived within the wait
    Pending,
    /// The backend wrote one byte
    Byte(u8),
    /// The peer closed without writing anything
    Closed,
}

/// A byte-stream connection to the backend
pub trait Connection {
    /// Send bytes, blocking until fully written
    ///
    /// # Errors
    ///
    /// Returns error if the peer is gone or the write fails
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Wait up to `wait` for a single byte from the peer
    ///
    /// # Errors
    ///
    /// Returns error on read failures other than the wait elapsing
    fn poll_byte(&mut self, wait: Duration) -> Result<AckPoll>;
}

/// Opens connections to the backend
pub trait Connector {
    /// The connection type produced
    type Conn: Connection;

    /// Open a new connection
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable
    fn connect(&mut self) -> Result<Self::Conn>;
}

/// TCP connector bound to the resolved backend address
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    /// Create a connector for `addr`
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The address this connector dials
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(&mut self) -> Result<TcpStream> {
        let stream = TcpStream::connect(self.addr)
            .map_err(|e| Error::Transport(format!("connect to {} failed: {e}", self.addr)))?;
        stream.set_nodelay(true)?;
        tracing::info!(addr = %self.addr, "connected to backend");
        Ok(stream)
    }
}

impl Connection for TcpStream {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }

    fn poll_byte(&mut self, wait: Duration) -> Result<AckPoll> {
        self.set_read_timeout(Some(wait))?;
        let mut byte = [0_u8; 1];
        match self.read(&mut byte) {
            Ok(0) => Ok(AckPoll::Closed),
            Ok(_) => Ok(AckPoll::Byte(byte[0])),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(AckPoll::Pending)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The single active connection bound to one utterance
///
/// Owned exclusively by the machine; dropped exactly once on completion,
/// error, or timeout. The end marker goes out exactly once, after the last
/// frame.
pub struct Session<C: Connection> {
    conn: C,
    opened_at: Instant,
    marker_sent_at: Option<Instant>,
    frames_sent: u64,
    scratch: [u8; FRAME_BYTES],
}

impl<C: Connection> Session<C> {
    /// Bind a freshly opened connection to a new utterance
    pub const fn new(conn: C, now: Instant) -> Self {
        Self {
            conn,
            opened_at: now,
            marker_sent_at: None,
            frames_sent: 0,
            scratch: [0; FRAME_BYTES],
        }
    }

    /// Send one audio frame, serialized into the reused wire buffer
    ///
    /// # Errors
    ///
    /// Returns error on send failure, or if the end marker already went out
    pub fn send_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.marker_sent_at.is_some() {
            return Err(Error::Transport(
                "frame after end marker".to_string(),
            ));
        }
        frame.write_le(&mut self.scratch);
        self.conn.send(&self.scratch)?;
        self.frames_sent += 1;
        Ok(())
    }

    /// Send the end marker, exactly once
    ///
    /// # Errors
    ///
    /// Returns error on send failure (the marker is not retried) or if it
    /// was already sent
    pub fn finish(&mut self, now: Instant) -> Result<()> {
        if self.marker_sent_at.is_some() {
            return Err(Error::Transport("end marker already sent".to_string()));
        }
        self.conn.send(&END_MARKER)?;
        self.marker_sent_at = Some(now);
        tracing::debug!(frames = self.frames_sent, "end marker sent");
        Ok(())
    }

    /// Bounded wait for the acknowledgment byte
    ///
    /// # Errors
    ///
    /// Returns error on read failure
    pub fn poll_ack(&mut self, wait: Duration) -> Result<AckPoll> {
        self.conn.poll_byte(wait)
    }

    /// When the connection was opened
    #[must_use]
    pub const fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// When the end marker went out, if it has
    #[must_use]
    pub const fn marker_sent_at(&self) -> Option<Instant> {
        self.marker_sent_at
    }

    /// Frames sent so far
    #[must_use]
    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}
