use anyhow::{Context, Result};
use std::io::Cursor;
use std::path::Path;

use super::backend::AudioFrame;

/// One finalized recording: an immutable in-memory audio payload ready for
/// upload, with the filename and MIME type the multipart form needs.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    file_name: String,
    mime_type: String,
    duration_secs: Option<f64>,
}

impl AudioClip {
    /// Encode an ordered frame sequence as a single WAV blob.
    pub fn from_frames(frames: &[AudioFrame], sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("Failed to create WAV writer")?;

            for frame in frames {
                for &sample in &frame.samples {
                    writer
                        .write_sample(sample)
                        .context("Failed to write sample to WAV data")?;
                }
            }

            writer.finalize().context("Failed to finalize WAV data")?;
        }

        let sample_count: usize = frames.iter().map(|f| f.samples.len()).sum();
        let duration_secs = sample_count as f64 / (sample_rate as f64 * channels as f64);

        Ok(Self {
            bytes: cursor.into_inner(),
            file_name: "recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            duration_secs: Some(duration_secs),
        })
    }

    /// Wrap an existing audio file without re-encoding; the speech service
    /// accepts the common containers as-is.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file {}", path.display()))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        let mime_type = mime_for(&file_name).to_string();

        Ok(Self::from_bytes(bytes, file_name, mime_type))
    }

    /// Wrap already-encoded audio bytes (relay uploads arrive this way).
    pub fn from_bytes(bytes: Vec<u8>, file_name: String, mime_type: String) -> Self {
        Self {
            bytes,
            file_name,
            mime_type,
            duration_secs: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Known only for clips encoded from captured frames.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a" | "mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg" | "opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/wav",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_capture_encodes_as_valid_wav() {
        let clip = AudioClip::from_frames(&[], 16000, 1).unwrap();

        let reader = hound::WavReader::new(Cursor::new(clip.bytes().to_vec())).unwrap();
        assert_eq!(reader.len(), 0);
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(clip.duration_secs(), Some(0.0));
    }

    #[test]
    fn clip_metadata_for_upload() {
        let clip = AudioClip::from_frames(&[], 16000, 1).unwrap();
        assert_eq!(clip.file_name(), "recording.wav");
        assert_eq!(clip.mime_type(), "audio/wav");
        assert!(!clip.is_empty(), "WAV header must be present");
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("clip.webm"), "audio/webm");
        assert_eq!(mime_for("Clip.MP3"), "audio/mpeg");
        assert_eq!(mime_for("voice.m4a"), "audio/mp4");
        assert_eq!(mime_for("no_extension"), "audio/wav");
    }
}
