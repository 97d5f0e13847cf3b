//! Audio capture from microphone
//!
//! `SampleSource` abstracts the capture path; `FrameReader` assembles whole
//! frames from partial reads and discards the hardware warm-up output.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::audio::frame::{AudioFrame, FRAME_SAMPLES, RawFrame, SAMPLE_RATE};
use crate::{Error, Result};

/// Frames discarded after startup; the microphone outputs zeros for a fixed
/// number of clock cycles before data is valid (datasheet requirement)
pub const WARMUP_FRAMES: usize = 8;

/// Longest backlog kept in the capture buffer before old samples are dropped
const MAX_BACKLOG_SAMPLES: usize = SAMPLE_RATE as usize / 2;

/// Sleep while waiting for the capture callback to produce samples
const READ_POLL: Duration = Duration::from_millis(4);

/// Source of hardware-native 32-bit samples
///
/// `read` blocks until at least one sample is available and may fill less
/// than the whole buffer; it never returns `Ok(0)`.
pub trait SampleSource {
    /// Read up to `buf.len()` samples, returning how many were written
    ///
    /// # Errors
    ///
    /// Returns error if the capture device fails
    fn read(&mut self, buf: &mut [i32]) -> Result<usize>;
}

/// Assembles fixed-length frames from a `SampleSource`
///
/// Owns one `RawFrame` reused for every read; the first [`WARMUP_FRAMES`]
/// frames are discarded unconditionally before any frame is delivered.
pub struct FrameReader<S> {
    source: S,
    raw: RawFrame,
    warmed_up: bool,
}

impl<S: SampleSource> FrameReader<S> {
    /// Wrap a sample source
    pub const fn new(source: S) -> Self {
        Self {
            source,
            raw: RawFrame::new(),
            warmed_up: false,
        }
    }

    /// Read exactly one frame, converting to 16-bit PCM
    ///
    /// # Errors
    ///
    /// Returns error if the underlying source fails; no frame is delivered
    /// on error and the caller retries on its next tick
    pub fn read_frame(&mut self) -> Result<AudioFrame> {
        if !self.warmed_up {
            for _ in 0..WARMUP_FRAMES {
                self.fill_raw()?;
            }
            self.warmed_up = true;
            tracing::debug!(frames = WARMUP_FRAMES, "discarded warm-up frames");
        }

        self.fill_raw()?;
        Ok(AudioFrame::from_raw(&self.raw))
    }

    /// Fill the reused raw frame, issuing as many reads as needed
    fn fill_raw(&mut self) -> Result<()> {
        let mut filled = 0;
        while filled < FRAME_SAMPLES {
            let n = self.source.read(&mut self.raw.samples_mut()[filled..])?;
            if n == 0 {
                return Err(Error::Audio("capture source returned no samples".into()));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Captures audio from the default input device
pub struct MicSource {
    // Held to keep the capture callback alive; cpal streams aren't Send,
    // so the source lives on the control-loop thread
    _stream: Stream,
    buffer: Arc<Mutex<Vec<i32>>>,
}

impl MicSource {
    /// Open the default input device at 16 kHz mono and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no suitable audio device or config is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let config = input_config(&device)?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let cb_buffer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = cb_buffer.lock() {
                        buf.extend(data.iter().map(|&s| to_native(s)));
                        // Bound the backlog so stale audio never leaks into
                        // the next utterance
                        let len = buf.len();
                        if len > MAX_BACKLOG_SAMPLES {
                            buf.drain(..len - MAX_BACKLOG_SAMPLES);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        tracing::debug!("audio capture started");

        Ok(Self {
            _stream: stream,
            buffer,
        })
    }
}

impl SampleSource for MicSource {
    fn read(&mut self, buf: &mut [i32]) -> Result<usize> {
        loop {
            {
                let mut shared = self
                    .buffer
                    .lock()
                    .map_err(|_| Error::Audio("capture buffer poisoned".to_string()))?;
                if !shared.is_empty() {
                    let n = shared.len().min(buf.len());
                    buf[..n].copy_from_slice(&shared[..n]);
                    shared.drain(..n);
                    return Ok(n);
                }
            }
            thread::sleep(READ_POLL);
        }
    }
}

/// Pick a mono 16 kHz input configuration
fn input_config(device: &Device) -> Result<StreamConfig> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

    Ok(supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config())
}

/// Scale a float sample into the left-justified 32-bit container layout
#[allow(clippy::cast_possible_truncation)]
fn to_native(sample: f32) -> i32 {
    (f64::from(sample.clamp(-1.0, 1.0)) * f64::from(i32::MAX)) as i32
}
