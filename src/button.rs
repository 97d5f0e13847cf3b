//! Push-to-talk input and debouncing
//!
//! The raw line is noisy; `Debouncer` is a temporal hysteresis filter, not
//! an edge counter. A raw change is promoted to the stable level only after
//! persisting for the full debounce interval; any reversion inside the
//! window cancels the pending change without emitting a transition.

use std::time::{Duration, Instant};

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use crate::{Error, Result};

/// Logical level of the talk line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line inactive
    Released,
    /// Line active
    Pressed,
}

/// A stable transition of the talk line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Released -> Pressed
    Press,
    /// Pressed -> Released
    Release,
}

/// Raw (undebounced) state of the talk input
pub trait ButtonSource {
    /// Sample the raw line level
    fn is_pressed(&mut self) -> bool;
}

/// Temporal hysteresis filter over a raw input level
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    stable: Level,
    /// When the currently pending level was first observed; `None` while the
    /// raw level agrees with the stable level
    pending_since: Option<Instant>,
}

impl Debouncer {
    /// Create a filter with the given debounce interval, initially released
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            stable: Level::Released,
            pending_since: None,
        }
    }

    /// Feed one raw sample, returning a stable edge if one is promoted
    pub fn poll(&mut self, raw: Level, now: Instant) -> Option<Edge> {
        if raw == self.stable {
            // Reversion before the interval elapsed cancels the pending change
            self.pending_since = None;
            return None;
        }

        match self.pending_since {
            None => {
                self.pending_since = Some(now);
                None
            }
            Some(since) if now.duration_since(since) >= self.interval => {
                self.stable = raw;
                self.pending_since = None;
                Some(match raw {
                    Level::Pressed => Edge::Press,
                    Level::Released => Edge::Release,
                })
            }
            Some(_) => None,
        }
    }

    /// Last accepted stable level
    #[must_use]
    pub const fn stable(&self) -> Level {
        self.stable
    }
}

/// Talk input backed by a global hotkey
///
/// Tracks the held level of one registered key by draining the hotkey event
/// receiver without blocking. Auto-repeat press events are harmless: they
/// re-assert the already-pressed level.
pub struct HotkeyButton {
    _manager: GlobalHotKeyManager,
    hotkey: HotKey,
    pressed: bool,
}

impl HotkeyButton {
    /// Register `key` (e.g. "space", "f9") as the talk key
    ///
    /// # Errors
    ///
    /// Returns error if the hotkey system is unavailable or the key name is
    /// not recognized
    pub fn new(key: &str) -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| Error::Button(format!("hotkey manager init failed: {e}")))?;

        let code = parse_key_code(key)?;
        let hotkey = HotKey::new(Some(Modifiers::empty()), code);
        manager
            .register(hotkey)
            .map_err(|e| Error::Button(format!("failed to register {key}: {e}")))?;

        tracing::debug!(key, "talk key registered");

        Ok(Self {
            _manager: manager,
            hotkey,
            pressed: false,
        })
    }
}

impl ButtonSource for HotkeyButton {
    fn is_pressed(&mut self) -> bool {
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.id() != self.hotkey.id() {
                continue;
            }
            self.pressed = match event.state() {
                HotKeyState::Pressed => true,
                HotKeyState::Released => false,
            };
        }
        self.pressed
    }
}

/// Parse a key name into a key code
///
/// # Errors
///
/// Returns error for unrecognized key names
pub fn parse_key_code(key: &str) -> Result<Code> {
    let code = match key.to_lowercase().as_str() {
        "space" => Code::Space,
        "`" | "backquote" | "grave" => Code::Backquote,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "numpad0" => Code::Numpad0,
        other => return Err(Error::Button(format!("unknown talk key: {other}"))),
    };
    Ok(code)
}
