use async_trait::async_trait;

use crate::domain::{AudioBuffer, DomainError};

/// Port for the raw platform microphone primitive.
///
/// Implementations own the device handle for the duration of one capture:
/// `open` claims the device and begins buffering, `close` stops the stream,
/// drains everything captured so far into one finalized buffer, and releases
/// the device. The bounded-window and single-active-recording policies live
/// above this port, in [`crate::app::Recorder`].
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Claim the input device and start buffering samples.
    ///
    /// Fails with `DeviceUnavailable` if the platform denies access.
    /// Calling `open` while a capture is active is an error.
    async fn open(&self) -> Result<(), DomainError>;

    /// Stop capturing, return the finalized buffer, and release the device.
    ///
    /// The buffer contains PCM samples at 16kHz mono. The device is released
    /// even when draining fails.
    async fn close(&self) -> Result<AudioBuffer, DomainError>;
}
