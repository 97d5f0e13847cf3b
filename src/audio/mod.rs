//! Audio capture and frame handling
//!
//! The microphone path produces fixed 256-sample frames of 16 kHz mono
//! audio; conversion from the hardware's 32-bit containers happens here.

mod capture;
mod frame;

pub use capture::{FrameReader, MicSource, SampleSource, WARMUP_FRAMES};
pub use frame::{AudioFrame, FRAME_BYTES, FRAME_PERIOD, FRAME_SAMPLES, RawFrame, SAMPLE_RATE};
