//! Shared test utilities
//!
//! Mock collaborators so the machine can be driven without audio hardware
//! or a network: a deterministic sample source, a scripted wire, and a
//! signal-recording indicator.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use talkwire::audio::{FrameReader, SampleSource};
use talkwire::indicator::{Indicator, Signal};
use talkwire::machine::{PushToTalk, Timing};
use talkwire::net::{AckPoll, Connection, Connector};
use talkwire::{Error, Result};

/// Endless ramp of left-justified samples, delivered without blocking
pub struct RampSource {
    next: i32,
}

impl RampSource {
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl SampleSource for RampSource {
    fn read(&mut self, buf: &mut [i32]) -> Result<usize> {
        for slot in buf.iter_mut() {
            *slot = self.next << 16;
            self.next = self.next.wrapping_add(1);
        }
        Ok(buf.len())
    }
}

/// Everything the machine does on the wire, observable from the test
#[derive(Default)]
pub struct Wire {
    /// All bytes sent across every connection, in order
    pub bytes: Vec<u8>,
    /// Connection attempts, successful or not
    pub attempts: usize,
    /// Successful connections
    pub connects: usize,
    /// Dropped connections
    pub closes: usize,
    /// Fail this many initial connection attempts
    pub fail_connects: usize,
    /// Fail any send after this many successful sends
    pub fail_after_sends: Option<usize>,
    /// Fail the end-marker send (4-byte writes) specifically
    pub fail_on_marker: bool,
    /// Successful sends so far
    pub sends: usize,
    /// Scripted acknowledgment polls; `Pending` once exhausted
    pub acks: VecDeque<Result<AckPoll>>,
}

pub type SharedWire = Arc<Mutex<Wire>>;

pub fn wire() -> SharedWire {
    Arc::new(Mutex::new(Wire::default()))
}

/// Connection spying on a [`SharedWire`]
pub struct MockConn {
    wire: SharedWire,
}

impl Connection for MockConn {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut wire = self.wire.lock().unwrap();
        if wire.fail_on_marker && bytes.len() == 4 {
            return Err(Error::Transport("scripted marker failure".to_string()));
        }
        if let Some(limit) = wire.fail_after_sends {
            if wire.sends >= limit {
                return Err(Error::Transport("scripted send failure".to_string()));
            }
        }
        wire.bytes.extend_from_slice(bytes);
        wire.sends += 1;
        Ok(())
    }

    fn poll_byte(&mut self, _wait: Duration) -> Result<AckPoll> {
        let mut wire = self.wire.lock().unwrap();
        wire.acks.pop_front().unwrap_or(Ok(AckPoll::Pending))
    }
}

impl Drop for MockConn {
    fn drop(&mut self) {
        self.wire.lock().unwrap().closes += 1;
    }
}

/// Connector spying on a [`SharedWire`]
pub struct MockConnector {
    wire: SharedWire,
}

impl MockConnector {
    pub fn new(wire: &SharedWire) -> Self {
        Self {
            wire: Arc::clone(wire),
        }
    }
}

impl Connector for MockConnector {
    type Conn = MockConn;

    fn connect(&mut self) -> Result<MockConn> {
        let mut wire = self.wire.lock().unwrap();
        wire.attempts += 1;
        if wire.attempts <= wire.fail_connects {
            return Err(Error::Transport("scripted connect failure".to_string()));
        }
        wire.connects += 1;
        Ok(MockConn {
            wire: Arc::clone(&self.wire),
        })
    }
}

/// Indicator recording every signal it is shown
pub struct RecordingIndicator {
    signals: Arc<Mutex<Vec<Signal>>>,
}

pub type SharedSignals = Arc<Mutex<Vec<Signal>>>;

pub fn signals() -> SharedSignals {
    Arc::new(Mutex::new(Vec::new()))
}

impl RecordingIndicator {
    pub fn new(signals: &SharedSignals) -> Self {
        Self {
            signals: Arc::clone(signals),
        }
    }
}

impl Indicator for RecordingIndicator {
    fn set(&mut self, signal: Signal) {
        self.signals.lock().unwrap().push(signal);
    }
}

/// A machine wired to the mocks with the given timers
pub fn machine(
    wire: &SharedWire,
    signals: &SharedSignals,
    timing: Timing,
) -> PushToTalk<RampSource, MockConnector, RecordingIndicator> {
    PushToTalk::new(
        FrameReader::new(RampSource::new()),
        MockConnector::new(wire),
        RecordingIndicator::new(signals),
        timing,
    )
}

/// Step helper: `base + ms`
pub fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}
