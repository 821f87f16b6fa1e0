use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use zeroize::Zeroize;

/// Recording session state machine.
///
/// State transitions:
/// - Idle -> Recording (capture starts)
/// - Recording -> Stopped (manual stop or the bounded-window auto-stop)
/// - Stopped -> Idle (buffer finalized, device released)
///
/// At most one session may be in `Recording` system-wide; starting a new one
/// while another is active is rejected, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordingState {
    /// Ready to record, no active capture.
    Idle = 0,
    /// Actively capturing audio.
    Recording = 1,
    /// Capture ended, buffer being finalized.
    Stopped = 2,
}

impl RecordingState {
    /// Check if a capture can be started from this state.
    #[must_use]
    pub fn can_start(&self) -> bool {
        matches!(self, RecordingState::Idle)
    }

    /// Check if a manual stop has any effect in this state.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording)
    }
}

impl From<u8> for RecordingState {
    fn from(value: u8) -> Self {
        match value {
            0 => RecordingState::Idle,
            1 => RecordingState::Recording,
            _ => RecordingState::Stopped,
        }
    }
}

impl From<RecordingState> for u8 {
    fn from(state: RecordingState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for RecordingState for lock-free reads.
#[derive(Debug)]
pub struct AtomicRecordingState(AtomicU8);

impl AtomicRecordingState {
    pub fn new(state: RecordingState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> RecordingState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: RecordingState) {
        self.0.store(state.into(), Ordering::Release);
    }

    /// Compare and swap, returns true if successful.
    pub fn compare_exchange(&self, current: RecordingState, new: RecordingState) -> bool {
        self.0
            .compare_exchange(current.into(), new.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicRecordingState {
    fn default() -> Self {
        Self::new(RecordingState::Idle)
    }
}

/// Recording capture policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Bounded recording window in seconds: auto-stop fires at this mark.
    pub max_duration_secs: u32,
    /// Target sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 3,
            sample_rate: 16_000,
        }
    }
}

impl RecordingConfig {
    /// Capacity in samples for the capture ring buffer, with one second of
    /// headroom over the auto-stop mark.
    pub fn buffer_capacity(&self) -> usize {
        (self.max_duration_secs as usize + 1) * self.sample_rate as usize
    }
}

/// Finalized voice sample buffer, securely zeroed on drop.
///
/// Voice data never touches disk on the client; it leaves memory only as a
/// classification or onboarding upload.
#[derive(Debug, Zeroize)]
#[zeroize(drop)]
pub struct AudioBuffer {
    /// PCM audio samples (16-bit mono).
    samples: Vec<i16>,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new empty audio buffer.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    /// Create an audio buffer with pre-allocated capacity.
    pub fn with_capacity(sample_rate: u32, capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            sample_rate,
        }
    }

    /// Append samples to the buffer.
    pub fn push_samples(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    /// Get the samples as a slice.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
