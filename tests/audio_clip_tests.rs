// Tests for clip finalization from files on disk (the `translate <file>`
// path submits bytes as-is, so what we read must be what we upload).

use std::io::Write;

use tempfile::TempDir;
use vaani::AudioClip;

#[test]
fn file_clip_keeps_bytes_name_and_mime() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voice-note.webm");

    let payload = b"\x1a\x45\xdf\xa3 not really webm but close enough";
    std::fs::File::create(&path)
        .unwrap()
        .write_all(payload)
        .unwrap();

    let clip = AudioClip::from_file(&path).unwrap();

    assert_eq!(clip.bytes(), payload);
    assert_eq!(clip.file_name(), "voice-note.webm");
    assert_eq!(clip.mime_type(), "audio/webm");
    assert_eq!(clip.duration_secs(), None);
}

#[test]
fn wav_written_by_hound_round_trips_through_a_file_clip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for sample in [100i16, -100, 200] {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let clip = AudioClip::from_file(&path).unwrap();

    assert_eq!(clip.mime_type(), "audio/wav");
    let reader = hound::WavReader::new(std::io::Cursor::new(clip.bytes().to_vec())).unwrap();
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![100, -100, 200]);
}

#[test]
fn missing_file_is_reported_with_its_path() {
    let err = AudioClip::from_file("/nonexistent/clip.wav").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/clip.wav"));
}
