//! Push-to-talk state machine
//!
//! Drives one utterance from press to backend acknowledgment. Transitions
//! are driven only by debounced edges, frame/send outcomes, and monotonic
//! timers injected per tick; raw input never reaches the machine.
//!
//! ```text
//!            press/connect ok          release
//!   Idle ──────────────────▶ Recording ───────▶ Wait
//!    ▲                           ▲                │ ▲
//!    │                           └── press ───────┘ │ grace elapsed,
//!    │                               (resume)       │ marker sent
//!    │                                              ▼
//!    └────── ack / anomaly / deadline ───────── Processing
//! ```
//!
//! Every error path returns to Idle; the device stays usable for the next
//! press.

use std::time::{Duration, Instant};

use crate::audio::{FrameReader, SampleSource};
use crate::button::Edge;
use crate::indicator::{Indicator, Signal};
use crate::Error;
use crate::net::{ACK_OK, AckPoll, Connector, Session};

/// Machine states; exactly one holds at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No utterance in flight
    Idle,
    /// Press accepted, streaming audio
    Recording,
    /// Released; grace period capturing trailing speech, resume possible
    Wait,
    /// End marker sent; waiting for the acknowledgment byte
    Processing,
}

/// Timer tunables
///
/// The grace period and the processing deadline bound different failure
/// modes (trailing speech vs. an unresponsive backend) and stay separate.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Post-release window during which capture continues and a re-press
    /// resumes the same session
    pub grace_period: Duration,
    /// Bounded per-tick wait for the acknowledgment byte
    pub ack_poll: Duration,
    /// Overall deadline measured from Processing entry
    pub processing_deadline: Duration,
    /// Indicator blink toggle interval while waiting
    pub blink_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(3000),
            ack_poll: Duration::from_millis(100),
            processing_deadline: Duration::from_secs(120),
            blink_interval: Duration::from_millis(250),
        }
    }
}

/// The push-to-talk machine: the sole mutable state of the core
///
/// Owns the optional [`Session`] (at most one at a time), the state timers,
/// and the indicator blink phase. Owned by the control loop; never aliased.
pub struct PushToTalk<S: SampleSource, C: Connector, I: Indicator> {
    state: State,
    session: Option<Session<C::Conn>>,
    wait_entered: Option<Instant>,
    processing_entered: Option<Instant>,
    blink_lit: bool,
    blink_toggled_at: Option<Instant>,
    frames: FrameReader<S>,
    connector: C,
    indicator: I,
    timing: Timing,
}

impl<S: SampleSource, C: Connector, I: Indicator> PushToTalk<S, C, I> {
    /// Create a machine in Idle
    pub const fn new(frames: FrameReader<S>, connector: C, indicator: I, timing: Timing) -> Self {
        Self {
            state: State::Idle,
            session: None,
            wait_entered: None,
            processing_entered: None,
            blink_lit: false,
            blink_toggled_at: None,
            frames,
            connector,
            indicator,
            timing,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Whether a session is currently open
    #[must_use]
    pub const fn session_open(&self) -> bool {
        self.session.is_some()
    }

    /// Advance the machine by one tick
    ///
    /// The edge (if any) is applied first; the resulting state then performs
    /// its single unit of work. Opening a connection consumes the whole
    /// tick, so a press tick sends no frame. No error is fatal: every
    /// failure path lands back in Idle.
    pub fn tick(&mut self, now: Instant, edge: Option<Edge>) {
        match (self.state, edge) {
            (State::Idle, Some(Edge::Press)) => {
                self.open_session(now);
                return;
            }
            (State::Recording, Some(Edge::Release)) => self.enter_wait(now),
            (State::Wait, Some(Edge::Press)) => self.resume_recording(),
            // Edges are meaningless elsewhere: a held button emits nothing
            // new, and Processing finishes on its own terms
            _ => {}
        }

        match self.state {
            State::Idle => {}
            State::Recording => self.pump_frame(),
            State::Wait => self.tick_wait(now),
            State::Processing => self.tick_processing(now),
        }
    }

    /// Idle + press: open the session for a new utterance
    fn open_session(&mut self, now: Instant) {
        match self.connector.connect() {
            Ok(conn) => {
                self.session = Some(Session::new(conn, now));
                self.indicator.set(Signal::Recording);
                self.state = State::Recording;
                tracing::info!("recording");
            }
            Err(e) => {
                // Not retried from here: edges are debounced, so a held
                // button produces no further press edges and there is no
                // retry storm; a fresh press is required
                tracing::warn!(error = %e, "connect failed; press again to retry");
                self.indicator.set(Signal::Error);
            }
        }
    }

    /// Recording + release: start the grace period
    fn enter_wait(&mut self, now: Instant) {
        self.state = State::Wait;
        self.wait_entered = Some(now);
        self.blink_lit = true;
        self.blink_toggled_at = Some(now);
        self.indicator.set(Signal::Waiting { lit: true });
        tracing::debug!("released; grace period started");
    }

    /// Wait + press: back to Recording on the same session
    fn resume_recording(&mut self) {
        self.state = State::Recording;
        self.wait_entered = None;
        self.blink_toggled_at = None;
        self.indicator.set(Signal::Recording);
        tracing::debug!("re-pressed within grace period; resuming");
    }

    /// Acquire one frame and send it on the open session
    ///
    /// Frame read errors are non-fatal: log and retry next tick. Send
    /// failures abort the utterance.
    fn pump_frame(&mut self) {
        let frame = match self.frames.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "frame read failed; retrying next tick");
                return;
            }
        };

        let sent = match self.session.as_mut() {
            Some(session) => session.send_frame(&frame),
            None => return,
        };
        if let Err(e) = sent {
            self.fail_utterance("frame send failed", &e);
        }
    }

    /// One Wait tick: finish on grace expiry, otherwise keep capturing
    fn tick_wait(&mut self, now: Instant) {
        let entered = self.wait_entered.unwrap_or(now);
        if now.duration_since(entered) >= self.timing.grace_period {
            self.finish_utterance(now);
            return;
        }

        self.blink(now);
        self.pump_frame();
    }

    /// Grace elapsed: send the end marker and move to Processing
    fn finish_utterance(&mut self, now: Instant) {
        let finished = match self.session.as_mut() {
            Some(session) => session.finish(now),
            None => return,
        };
        match finished {
            Ok(()) => {
                let frames = self.session.as_ref().map_or(0, Session::frames_sent);
                self.state = State::Processing;
                self.wait_entered = None;
                self.processing_entered = Some(now);
                self.indicator.set(Signal::Processing);
                tracing::info!(frames, "utterance sent; waiting for backend");
            }
            // The marker is not retried
            Err(e) => self.fail_utterance("end marker send failed", &e),
        }
    }

    /// One Processing tick: deadline first, then a bounded ack poll
    fn tick_processing(&mut self, now: Instant) {
        let entered = self.processing_entered.unwrap_or(now);
        if now.duration_since(entered) >= self.timing.processing_deadline {
            tracing::warn!("backend deadline elapsed; giving up on utterance");
            self.close_session(Signal::Error);
            return;
        }

        let polled = match self.session.as_mut() {
            Some(session) => session.poll_ack(self.timing.ack_poll),
            None => return,
        };
        match polled {
            Ok(AckPoll::Pending) => {}
            Ok(AckPoll::Byte(ACK_OK)) => {
                tracing::info!("utterance acknowledged");
                self.close_session(Signal::Off);
            }
            Ok(AckPoll::Byte(other)) => {
                tracing::warn!(byte = other, "anomalous acknowledgment");
                self.close_session(Signal::Error);
            }
            Ok(AckPoll::Closed) => {
                tracing::warn!("backend closed without acknowledgment");
                self.close_session(Signal::Error);
            }
            Err(e) => {
                tracing::warn!(error = %e, "acknowledgment read failed");
                self.close_session(Signal::Error);
            }
        }
    }

    /// Abort the current utterance after a send failure
    fn fail_utterance(&mut self, context: &str, error: &Error) {
        tracing::warn!(error = %error, "{context}; aborting utterance");
        self.close_session(Signal::Error);
    }

    /// Close the session (exactly once) and return to Idle
    fn close_session(&mut self, signal: Signal) {
        self.session = None;
        self.wait_entered = None;
        self.processing_entered = None;
        self.blink_toggled_at = None;
        self.blink_lit = false;
        self.indicator.set(signal);
        self.state = State::Idle;
    }

    /// Toggle the blink phase while waiting
    fn blink(&mut self, now: Instant) {
        let due = self
            .blink_toggled_at
            .is_none_or(|t| now.duration_since(t) >= self.timing.blink_interval);
        if due {
            self.blink_lit = !self.blink_lit;
            self.blink_toggled_at = Some(now);
            self.indicator.set(Signal::Waiting {
                lit: self.blink_lit,
            });
        }
    }
}
