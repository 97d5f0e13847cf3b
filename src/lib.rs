//! Talkwire - push-to-talk voice client for the Talkwire assistant backend
//!
//! Hold the talk key and audio streams to the backend over a single TCP
//! connection; release, and after a short grace period the client sends an
//! end marker and waits for the backend's one-byte acknowledgment.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ frames  ┌────────────────┐ frames+marker ┌─────────┐
//! │ SampleSource ├────────▶│                ├──────────────▶│ Backend │
//! └──────────────┘         │  PushToTalk    │   one ack     └─────────┘
//! ┌──────────────┐  edges  │  state machine │◀──────────────────┘
//! │  Debouncer   ├────────▶│                ├──▶ Indicator
//! └──────────────┘         └────────────────┘
//! ```
//!
//! One cooperative control loop drives everything; at most one network
//! session exists at any instant, bound to the current utterance.

pub mod audio;
pub mod button;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod indicator;
pub mod machine;
pub mod net;

pub use config::Config;
pub use error::{Error, Result};
pub use machine::{PushToTalk, State, Timing};
