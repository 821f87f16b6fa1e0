use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{
    AtomicRecordingState, AudioBuffer, DomainError, RecordingConfig, RecordingState,
};
use crate::ports::AudioInput;

/// One-at-a-time bounded audio capture sessions.
///
/// `capture` owns the whole recording lifecycle: claim the device, run the
/// 1 Hz elapsed counter for UI feedback, race the manual stop against the
/// auto-stop window, then finalize the buffer and release the device. The
/// single-active-recording invariant is enforced here with a compare-exchange
/// on the shared state, so a second `capture` is rejected, not queued.
pub struct Recorder {
    input: Arc<dyn AudioInput>,
    config: RecordingConfig,
    state: Arc<AtomicRecordingState>,
    elapsed_secs: Arc<AtomicU32>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Recorder {
    pub fn new(input: Arc<dyn AudioInput>, config: RecordingConfig) -> Self {
        Self {
            input,
            config,
            state: Arc::new(AtomicRecordingState::default()),
            elapsed_secs: Arc::new(AtomicU32::new(0)),
            stop_tx: Mutex::new(None),
        }
    }

    /// Current capture state.
    pub fn state(&self) -> RecordingState {
        self.state.load()
    }

    /// Seconds elapsed in the active capture, 0 when idle.
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs.load(Ordering::Relaxed)
    }

    /// Run one capture session to completion and return the finalized buffer.
    ///
    /// The session ends on manual [`Recorder::stop`] or, unconditionally, at
    /// `max_duration_secs`; both ends funnel through the same finalization
    /// path, so the buffer is emitted exactly once and the device is released
    /// on every exit, including when the caller later fails.
    pub async fn capture(&self) -> Result<AudioBuffer, DomainError> {
        if !self
            .state
            .compare_exchange(RecordingState::Idle, RecordingState::Recording)
        {
            return Err(DomainError::RecordingInProgress);
        }
        self.elapsed_secs.store(0, Ordering::Relaxed);

        if let Err(e) = self.input.open().await {
            self.state.store(RecordingState::Idle);
            return Err(e);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.stop_tx.lock() = Some(stop_tx);

        let ticker = self.spawn_ticker();
        info!(window_secs = self.config.max_duration_secs, "Recording started");

        // Manual stop races the bounded window; the window always wins ties.
        let window = Duration::from_secs(u64::from(self.config.max_duration_secs));
        let stopped_early = tokio::time::timeout(window, stop_rx).await.is_ok();

        ticker.abort();
        self.stop_tx.lock().take();
        self.state.store(RecordingState::Stopped);
        debug!(stopped_early, elapsed = self.elapsed_secs(), "Recording stopping");

        let result = self.input.close().await;
        self.state.store(RecordingState::Idle);

        let buffer = result?;
        info!(
            samples = buffer.len(),
            duration_secs = buffer.duration_secs(),
            "Recording finalized"
        );
        Ok(buffer)
    }

    /// Manually stop the active capture.
    ///
    /// Idempotent: calling this when nothing is recording is a no-op.
    pub fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
        }
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let elapsed = Arc::clone(&self.elapsed_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                elapsed.fetch_add(1, Ordering::Relaxed);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::time::Instant;

    struct StubInput {
        fail_open: bool,
        open: AtomicBool,
    }

    impl StubInput {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail_open: false,
                open: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_open: true,
                open: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AudioInput for StubInput {
        async fn open(&self) -> Result<(), DomainError> {
            if self.fail_open {
                return Err(DomainError::DeviceUnavailable("denied".to_string()));
            }
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> Result<AudioBuffer, DomainError> {
            self.open.store(false, Ordering::SeqCst);
            let mut buffer = AudioBuffer::new(16_000);
            buffer.push_samples(&[1, 2, 3]);
            Ok(buffer)
        }
    }

    fn recorder(input: Arc<StubInput>) -> Arc<Recorder> {
        Arc::new(Recorder::new(input, RecordingConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_at_bounded_window() {
        let input = StubInput::new();
        let rec = recorder(Arc::clone(&input));

        let start = Instant::now();
        let buffer = rec.capture().await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(buffer.samples(), &[1, 2, 3]);
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(!input.open.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_ends_session_early() {
        let rec = recorder(StubInput::new());

        let task = {
            let rec = Arc::clone(&rec);
            tokio::spawn(async move { rec.capture().await })
        };
        // Let the capture reach its suspension point.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(rec.state(), RecordingState::Recording);

        let start = Instant::now();
        rec.stop();
        let buffer = task.await.unwrap().unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(buffer.len(), 3);
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_capture_rejected_while_recording() {
        let rec = recorder(StubInput::new());

        let task = {
            let rec = Arc::clone(&rec);
            tokio::spawn(async move { rec.capture().await })
        };
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let second = rec.capture().await;
        assert!(matches!(second, Err(DomainError::RecordingInProgress)));

        rec.stop();
        assert!(task.await.unwrap().is_ok());

        // Once idle again, a new capture is accepted.
        assert!(rec.capture().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let rec = recorder(StubInput::new());
        rec.stop();
        rec.stop();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.elapsed_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_restores_idle() {
        let rec = recorder(StubInput::failing());

        let result = rec.capture().await;
        assert!(matches!(result, Err(DomainError::DeviceUnavailable(_))));
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_counter_ticks_during_capture() {
        let rec = recorder(StubInput::new());

        let task = {
            let rec = Arc::clone(&rec);
            tokio::spawn(async move { rec.capture().await })
        };
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(rec.elapsed_secs(), 2);

        assert!(task.await.unwrap().is_ok());
    }
}
