use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{AudioBuffer, DomainError, RecordingConfig};
use crate::ports::AudioInput;

type RingProducer = ringbuf::HeapProd<i16>;
type RingConsumer = ringbuf::HeapCons<i16>;

/// Commands sent to the dedicated capture thread.
enum CaptureCommand {
    Open {
        reply: oneshot::Sender<Result<(), DomainError>>,
    },
    Close {
        reply: oneshot::Sender<Result<Vec<i16>, DomainError>>,
    },
    Shutdown,
}

/// cpal-backed microphone input.
///
/// The cpal `Stream` is not `Send`, so it lives on a dedicated thread driven
/// by a command channel. `close` drops the stream, which releases the device,
/// before draining whatever the ring buffer holds; the release happens even
/// when the drain yields nothing.
pub struct CpalAudioInput {
    config: RecordingConfig,
    cmd_tx: mpsc::Sender<CaptureCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalAudioInput {
    pub fn new(config: RecordingConfig) -> Result<Self, DomainError> {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let thread_config = config.clone();
        let thread_handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread_main(thread_config, cmd_rx))
            .map_err(|e| {
                DomainError::DeviceUnavailable(format!("Failed to spawn capture thread: {}", e))
            })?;

        info!(
            max_duration = config.max_duration_secs,
            sample_rate = config.sample_rate,
            "Microphone input initialized"
        );

        Ok(Self {
            config,
            cmd_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }
}

impl Drop for CpalAudioInput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(CaptureCommand::Shutdown);
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl AudioInput for CpalAudioInput {
    async fn open(&self) -> Result<(), DomainError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(CaptureCommand::Open { reply: reply_tx })
            .await
            .map_err(|_| DomainError::DeviceUnavailable("Capture thread not running".to_string()))?;

        reply_rx
            .await
            .map_err(|_| DomainError::DeviceUnavailable("Capture thread did not respond".to_string()))?
    }

    async fn close(&self) -> Result<AudioBuffer, DomainError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(CaptureCommand::Close { reply: reply_tx })
            .await
            .map_err(|_| DomainError::DeviceUnavailable("Capture thread not running".to_string()))?;

        let samples = reply_rx
            .await
            .map_err(|_| DomainError::DeviceUnavailable("Capture thread did not respond".to_string()))??;

        let mut buffer = AudioBuffer::with_capacity(self.config.sample_rate, samples.len());
        buffer.push_samples(&samples);

        debug!(samples = buffer.len(), "Capture finalized");
        Ok(buffer)
    }
}

/// Body of the dedicated capture thread: holds the non-Send stream.
fn capture_thread_main(config: RecordingConfig, mut cmd_rx: mpsc::Receiver<CaptureCommand>) {
    let mut stream: Option<Stream> = None;
    let mut consumer: Option<RingConsumer> = None;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            CaptureCommand::Open { reply } => {
                let result = (|| -> Result<(), DomainError> {
                    if stream.is_some() {
                        return Err(DomainError::RecordingInProgress);
                    }

                    let ring = HeapRb::<i16>::new(config.buffer_capacity());
                    let (producer, new_consumer) = ring.split();

                    let new_stream = open_default_stream(config.sample_rate, producer)?;
                    new_stream.play().map_err(|e| {
                        DomainError::DeviceUnavailable(format!("Failed to start stream: {}", e))
                    })?;

                    stream = Some(new_stream);
                    consumer = Some(new_consumer);
                    info!("Microphone capture started");
                    Ok(())
                })();
                let _ = reply.send(result);
            }
            CaptureCommand::Close { reply } => {
                // Dropping the stream releases the device unconditionally.
                stream.take();

                let result = match consumer.take() {
                    Some(mut cons) => {
                        let available = cons.occupied_len();
                        let mut samples = vec![0i16; available];
                        let read = cons.pop_slice(&mut samples);
                        samples.truncate(read);
                        info!(samples = samples.len(), "Microphone capture stopped");
                        Ok(samples)
                    }
                    None => Err(DomainError::NotRecording),
                };
                let _ = reply.send(result);
            }
            CaptureCommand::Shutdown => break,
        }
    }
    debug!("Capture thread shutting down");
}

/// Open an input stream on the default device, feeding mono 16kHz samples
/// into the ring buffer.
fn open_default_stream(
    target_sample_rate: u32,
    mut producer: RingProducer,
) -> Result<Stream, DomainError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        DomainError::DeviceUnavailable("No default input device available".to_string())
    })?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = device.default_input_config().map_err(|e| {
        DomainError::DeviceUnavailable(format!("Failed to get device config: {}", e))
    })?;
    let sample_format = supported.sample_format();
    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let channels = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0;

    debug!(
        device = %device_name,
        rate = device_rate,
        channels,
        format = ?sample_format,
        "Opening input stream"
    );

    let err_fn = |err| warn!(?err, "Audio stream error");

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples = condition_samples(data, channels, device_rate, target_sample_rate);
                let _ = producer.push_slice(&samples);
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let as_i16: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                let samples = condition_samples(&as_i16, channels, device_rate, target_sample_rate);
                let _ = producer.push_slice(&samples);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(DomainError::DeviceUnavailable(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    }
    .map_err(|e| DomainError::DeviceUnavailable(format!("Failed to build stream: {}", e)))?;

    Ok(stream)
}

/// Fold multi-channel frames to mono and resample to the target rate.
fn condition_samples(data: &[i16], channels: usize, from_rate: u32, to_rate: u32) -> Vec<i16> {
    let mono: Vec<i16> = if channels > 1 {
        data.chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    } else {
        data.to_vec()
    };

    if from_rate == to_rate || mono.is_empty() {
        return mono;
    }

    // Linear interpolation is enough for short command utterances.
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (mono.len() as f64 / ratio).ceil() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            match (mono.get(idx), mono.get(idx + 1)) {
                (Some(&a), Some(&b)) => (a as f64 + (b as f64 - a as f64) * pos.fract()) as i16,
                (Some(&a), None) => a,
                _ => 0,
            }
        })
        .collect()
}
