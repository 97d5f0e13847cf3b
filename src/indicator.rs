//! Visual progress indicator
//!
//! Best-effort: indicator failures never affect the utterance.

/// What the indicator should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Nothing in flight
    Off,
    /// Actively streaming audio
    Recording,
    /// Grace period after release; `lit` is the blink phase
    Waiting {
        /// Current blink phase
        lit: bool,
    },
    /// Utterance sent, waiting on the backend
    Processing,
    /// Something went wrong; cleared by the next press
    Error,
}

/// Maps machine state to a visual signal
pub trait Indicator {
    /// Show a signal; implementations are best-effort and must not fail
    fn set(&mut self, signal: Signal);
}

/// Indicator that reports state changes on the log
///
/// Stands in for a status LED on hosts without one.
#[derive(Debug, Default)]
pub struct LogIndicator {
    last: Option<Signal>,
}

impl LogIndicator {
    /// Create a new log-backed indicator
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }
}

impl Indicator for LogIndicator {
    fn set(&mut self, signal: Signal) {
        if self.last == Some(signal) {
            return;
        }
        // Blink phases would spam the log; only announce entering the phase
        let suppress = matches!(
            (self.last, signal),
            (Some(Signal::Waiting { .. }), Signal::Waiting { .. })
        );
        if !suppress {
            tracing::debug!(?signal, "indicator");
        }
        self.last = Some(signal);
    }
}
