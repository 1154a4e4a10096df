use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::RecorderConfig;
use super::stats::{RecorderStatus, SessionStats, StatusCell};
use crate::audio::{AudioBackend, AudioClip, AudioFrame};
use crate::translate::{Translate, Translation};

/// A recorder session that buffers microphone audio in memory and submits
/// the finalized clip for translation.
///
/// Lifecycle: `Idle --start()--> Recording --stop()--> Processing --> Idle`.
/// Only start/stop drive transitions, and the status always settles back to
/// `Idle` once an upload finishes, successfully or not.
pub struct RecorderSession {
    /// Session configuration
    config: RecorderConfig,

    /// Upload seam (direct or relay mode)
    translator: Arc<dyn Translate>,

    /// Capture device, held for the lifetime of the session
    backend: Mutex<Box<dyn AudioBackend>>,

    /// Current lifecycle state, shared with the capture task
    status: Arc<StatusCell>,

    /// When the session was created
    started_at: chrono::DateTime<Utc>,

    /// Frames buffered by the current/last recording, in arrival order
    frames: Arc<Mutex<Vec<AudioFrame>>>,

    /// Number of frames buffered during the current/last recording
    frames_captured: Arc<AtomicUsize>,

    /// Handle for the frame accumulation task
    capture_task: Mutex<Option<JoinHandle<()>>>,
}

impl RecorderSession {
    pub fn new(
        config: RecorderConfig,
        backend: Box<dyn AudioBackend>,
        translator: Arc<dyn Translate>,
    ) -> Self {
        info!("Creating recorder session: {}", config.session_id);

        Self {
            config,
            translator,
            backend: Mutex::new(backend),
            status: Arc::new(StatusCell::new(RecorderStatus::Idle)),
            started_at: Utc::now(),
            frames: Arc::new(Mutex::new(Vec::new())),
            frames_captured: Arc::new(AtomicUsize::new(0)),
            capture_task: Mutex::new(None),
        }
    }

    /// Start recording
    ///
    /// No-op when a recording is already in progress. If the capture device
    /// cannot be opened the error propagates and the session stays `Idle`.
    pub async fn start(&self) -> Result<()> {
        if self.status.load() != RecorderStatus::Idle {
            warn!("Recording already in progress");
            return Ok(());
        }

        info!("Starting recorder session: {}", self.config.session_id);

        let mut rx = {
            let mut backend = self.backend.lock().await;
            backend.start().await.context("Failed to start audio capture")?
        };

        // The device is live; only now leave Idle.
        self.status.store(RecorderStatus::Recording);
        self.frames.lock().await.clear();
        self.frames_captured.store(0, Ordering::SeqCst);

        let frames = Arc::clone(&self.frames);
        let frames_captured = Arc::clone(&self.frames_captured);
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        let task = tokio::spawn(async move {
            info!("Capture task started");

            // Drain until the backend closes the channel behind its final
            // frame, so stop() never loses the tail of a recording.
            while let Some(frame) = rx.recv().await {
                let processed = Self::process_frame(frame, sample_rate, channels);
                frames_captured.fetch_add(1, Ordering::SeqCst);
                frames.lock().await.push(processed);
            }

            info!("Capture task stopped");
        });

        *self.capture_task.lock().await = Some(task);

        Ok(())
    }

    /// Stop recording, finalize the clip, and submit it for translation.
    ///
    /// Returns `Ok(None)` when no recording was in progress. The capture
    /// device is released before the upload starts, and the session is back
    /// in `Idle` by the time this returns, whatever the upload outcome.
    pub async fn stop(&self) -> Result<Option<Translation>> {
        if !self
            .status
            .transition(RecorderStatus::Recording, RecorderStatus::Processing)
        {
            warn!("Recording not active");
            return Ok(None);
        }

        info!("Stopping recorder session: {}", self.config.session_id);

        // Release the device first; its frame channel closes once the last
        // buffered chunk has been delivered.
        {
            let mut backend = self.backend.lock().await;
            if let Err(e) = backend.stop().await {
                error!("Failed to stop audio backend: {}", e);
            }
        }

        // Wait for the capture task to drain the channel.
        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Capture task panicked: {}", e);
                }
            }
        }

        let frames = {
            let mut buffered = self.frames.lock().await;
            std::mem::take(&mut *buffered)
        };

        let result = self.finalize_and_translate(frames).await;

        // The status settles back to Idle, success or not.
        self.status.store(RecorderStatus::Idle);

        result.map(Some)
    }

    /// Current lifecycle state
    pub fn status(&self) -> RecorderStatus {
        self.status.load()
    }

    /// Get current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            status: self.status.load(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_captured: self.frames_captured.load(Ordering::SeqCst),
        }
    }

    async fn finalize_and_translate(&self, frames: Vec<AudioFrame>) -> Result<Translation> {
        let clip = AudioClip::from_frames(&frames, self.config.sample_rate, self.config.channels)?;

        if let Some(secs) = clip.duration_secs() {
            info!(
                "Finalized {:.1}s clip from {} frames ({} bytes)",
                secs,
                frames.len(),
                clip.len()
            );
        }

        let translation = self.translator.translate(clip).await?;
        Ok(translation)
    }

    /// Process audio frame: downsample and convert to target format
    fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
        let mut processed = frame;

        if processed.channels != target_channels && target_channels == 1 {
            processed = Self::downmix_to_mono(processed);
        }

        if processed.sample_rate != target_sample_rate {
            processed = Self::downsample_frame(processed, target_sample_rate);
        }

        processed
    }

    /// Downsample audio frame by decimation
    fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
        let ratio = frame.sample_rate / target_rate;
        if ratio <= 1 {
            // Can't upsample
            return frame;
        }

        let step = ratio as usize * frame.channels as usize;
        let mut samples = Vec::with_capacity(frame.samples.len() / ratio as usize + 1);
        for group in frame.samples.chunks(step) {
            samples.extend_from_slice(&group[..(frame.channels as usize).min(group.len())]);
        }

        AudioFrame {
            samples,
            sample_rate: target_rate,
            channels: frame.channels,
            timestamp_ms: frame.timestamp_ms,
        }
    }

    /// Average interleaved channels down to mono
    fn downmix_to_mono(frame: AudioFrame) -> AudioFrame {
        if frame.channels <= 1 {
            return frame;
        }

        let channels = frame.channels as usize;
        let samples: Vec<i16> = frame
            .samples
            .chunks_exact(channels)
            .map(|group| {
                let sum: i32 = group.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect();

        AudioFrame {
            samples,
            sample_rate: frame.sample_rate,
            channels: 1,
            timestamp_ms: frame.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn stereo_downmix_averages_channels() {
        let mixed = RecorderSession::downmix_to_mono(frame(vec![100, 300, -200, 200], 16000, 2));

        assert_eq!(mixed.channels, 1);
        assert_eq!(mixed.samples, vec![200, 0]);
    }

    #[test]
    fn downsample_decimates_48k_to_16k() {
        let samples: Vec<i16> = (0..12).collect();
        let down = RecorderSession::downsample_frame(frame(samples, 48000, 1), 16000);

        assert_eq!(down.sample_rate, 16000);
        assert_eq!(down.samples, vec![0, 3, 6, 9]);
    }

    #[test]
    fn downsample_never_upsamples() {
        let down = RecorderSession::downsample_frame(frame(vec![1, 2, 3], 8000, 1), 16000);
        assert_eq!(down.sample_rate, 8000);
        assert_eq!(down.samples, vec![1, 2, 3]);
    }

    #[test]
    fn process_frame_passes_matching_format_through() {
        let processed = RecorderSession::process_frame(frame(vec![5, 6], 16000, 1), 16000, 1);
        assert_eq!(processed.samples, vec![5, 6]);
        assert_eq!(processed.sample_rate, 16000);
        assert_eq!(processed.channels, 1);
    }
}
