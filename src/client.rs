//! Client control loop
//!
//! Wires configuration to concrete collaborators and drives the machine.
//! Single cooperative thread of control: one tick performs one debounce
//! poll plus at most one unit of state work. In Recording/Wait the blocking
//! frame read paces the cadence; in Processing the bounded ack poll does;
//! while Idle the loop sleeps a short poll interval.

use std::time::Instant;

use crate::audio::{FrameReader, MicSource};
use crate::button::{ButtonSource, Debouncer, HotkeyButton, Level};
use crate::config::Config;
use crate::discovery::AddressResolver;
use crate::indicator::LogIndicator;
use crate::machine::{PushToTalk, State};
use crate::net::TcpConnector;
use crate::Result;

/// Run the push-to-talk client until the process is terminated
///
/// Discovery runs exactly once; the resolved address is used for every
/// utterance of the process lifetime.
///
/// # Errors
///
/// Returns error only on startup failures (no audio device, no hotkey
/// system). Once the loop is running, no error path is fatal.
pub fn run(config: Config) -> Result<()> {
    let addr = AddressResolver::new(config.resolver()).resolve();

    let source = MicSource::new()?;
    let mut button = HotkeyButton::new(&config.ptt_key)?;
    let mut debouncer = Debouncer::new(config.debounce_interval);
    let mut machine = PushToTalk::new(
        FrameReader::new(source),
        TcpConnector::new(addr),
        LogIndicator::new(),
        config.timing.clone(),
    );

    tracing::info!(%addr, key = %config.ptt_key, "ready; hold the talk key to speak");

    loop {
        let now = Instant::now();
        let raw = if button.is_pressed() {
            Level::Pressed
        } else {
            Level::Released
        };
        let edge = debouncer.poll(raw, now);

        machine.tick(now, edge);

        // Only Idle needs explicit pacing; the other states block on the
        // frame read or the ack poll
        if machine.state() == State::Idle {
            std::thread::sleep(config.idle_poll);
        }
    }
}
