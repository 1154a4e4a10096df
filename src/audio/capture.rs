// Microphone capture via cpal
//
// cpal streams are not Send, so the stream lives on a dedicated capture
// thread for the duration of a recording. The stream callback converts
// device samples to i16 and hands frames to the session over a tokio
// channel; dropping the stream closes the channel once the last buffered
// frame is out.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// Microphone backend using the default cpal input device
pub struct CpalBackend {
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CpalBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        // Enough backlog for a slow receiver without dropping frames
        let capacity = (60_000 / self.config.buffer_duration_ms.max(1)).max(16) as usize;
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<String>>();

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);
        let target_rate = self.config.target_sample_rate;

        let handle = std::thread::spawn(move || {
            capture_thread(frame_tx, ready_tx, capturing, target_rate);
        });

        // Device and stream setup happen on the capture thread; wait for the
        // outcome without blocking the runtime.
        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Capture readiness task failed")?;

        match ready {
            Ok(Ok(device_name)) => {
                info!("Microphone capture started on {:?}", device_name);
                self.thread = Some(handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                bail!("Capture thread exited before the stream came up")
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .context("Capture shutdown task failed")?
                .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn capture_thread(
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: std::sync::mpsc::Sender<Result<String>>,
    capturing: Arc<AtomicBool>,
    target_rate: u32,
) {
    let stream = match open_stream(frame_tx, Arc::clone(&capturing), target_rate) {
        Ok((stream, name)) => {
            let _ = ready_tx.send(Ok(name));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(20));
    }

    // Dropping the stream releases the device and the frame sender with it,
    // which closes the channel behind the last buffered frame.
    drop(stream);
}

fn open_stream(
    frame_tx: mpsc::Sender<AudioFrame>,
    capturing: Arc<AtomicBool>,
    target_rate: u32,
) -> Result<(Stream, String)> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .context("No audio input device available")?;

    let name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .context("No supported input configuration")?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    info!(
        "Input device {:?}: {} Hz, {} channels, {:?} (encoding target {} Hz)",
        name, config.sample_rate.0, config.channels, sample_format, target_rate
    );

    let stream = match sample_format {
        SampleFormat::I16 => build_input_stream::<i16>(&device, &config, frame_tx, capturing)?,
        SampleFormat::U16 => build_input_stream::<u16>(&device, &config, frame_tx, capturing)?,
        SampleFormat::F32 => build_input_stream::<f32>(&device, &config, frame_tx, capturing)?,
        other => bail!("Unsupported sample format: {:?}", other),
    };

    stream.play().context("Failed to start input stream")?;

    Ok((stream, name))
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    capturing: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample,
    i16: Sample + FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let started = Instant::now();

    let err_fn = |err| error!("Audio input stream error: {}", err);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !capturing.load(Ordering::SeqCst) {
                    return;
                }

                let samples: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };

                // The callback must not block; a full channel means the
                // receiver has fallen a minute behind.
                if frame_tx.try_send(frame).is_err() {
                    debug!("Dropping audio frame: channel full");
                }
            },
            err_fn,
            None,
        )
        .context("Failed to build input stream")?;

    Ok(stream)
}
