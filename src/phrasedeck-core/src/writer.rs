//! Output encoding and file persistence.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use mp3lame_encoder::{Birtate, Builder, FlushNoGap, MonoPcm, Quality};

use crate::audio::{AudioClip, AudioFormat};
use crate::error::BatchError;

/// Writes assembled tracks to deterministically named files.
///
/// Filenames are `{prefix}_{rowIndex+1}.{ext}` in 1-based input order;
/// existing files are overwritten silently.
pub struct OutputWriter {
    dir: PathBuf,
    prefix: String,
    format: AudioFormat,
    mp3_bitrate_kbps: u32,
}

impl OutputWriter {
    /// Create the writer, creating `dir` (and parents) if absent.
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        format: AudioFormat,
        mp3_bitrate_kbps: u32,
    ) -> Result<Self, BatchError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            BatchError::Write(format!(
                "Failed to create output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            format,
            mp3_bitrate_kbps,
        })
    }

    /// Deterministic output path for a 0-based row index.
    pub fn path_for(&self, row_index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{}",
            self.prefix,
            row_index + 1,
            self.format.extension()
        ))
    }

    /// Encode and persist one track.
    ///
    /// The encoded bytes go to a temporary sibling first and are
    /// renamed over the final path, so a failure mid-write never leaves
    /// a partial output file behind.
    pub fn write(&self, row_index: usize, track: &AudioClip) -> Result<PathBuf, BatchError> {
        let encoded = match self.format {
            AudioFormat::Wav => encode_wav(track)?,
            AudioFormat::Mp3 => encode_mp3(track, self.mp3_bitrate_kbps)?,
        };

        let path = self.path_for(row_index);
        let tmp = path.with_extension(format!("{}.tmp", self.format.extension()));
        persist(&tmp, &path, &encoded)
    }
}

fn persist(tmp: &Path, path: &Path, encoded: &[u8]) -> Result<PathBuf, BatchError> {
    fs::write(tmp, encoded)
        .map_err(|e| BatchError::Write(format!("Failed to write '{}': {}", tmp.display(), e)))?;
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(BatchError::Write(format!(
            "Failed to move '{}' into place: {}",
            path.display(),
            e
        )));
    }
    Ok(path.to_path_buf())
}

fn encode_wav(track: &AudioClip) -> Result<Vec<u8>, BatchError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: track.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| BatchError::Encode(format!("Failed to start WAV stream: {}", e)))?;
    for &sample in track.samples() {
        writer
            .write_sample(sample)
            .map_err(|e| BatchError::Encode(format!("Failed to encode WAV sample: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| BatchError::Encode(format!("Failed to finalize WAV stream: {}", e)))?;

    Ok(cursor.into_inner())
}

fn encode_mp3(track: &AudioClip, bitrate_kbps: u32) -> Result<Vec<u8>, BatchError> {
    let mut builder = Builder::new()
        .ok_or_else(|| BatchError::Encode("Failed to initialize MP3 encoder".to_string()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| BatchError::Encode(format!("MP3 encoder rejected channel count: {}", e)))?;
    builder
        .set_sample_rate(track.sample_rate())
        .map_err(|e| BatchError::Encode(format!("MP3 encoder rejected sample rate: {}", e)))?;
    builder
        .set_brate(nearest_bitrate(bitrate_kbps))
        .map_err(|e| BatchError::Encode(format!("MP3 encoder rejected bitrate: {}", e)))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| BatchError::Encode(format!("MP3 encoder rejected quality: {}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| BatchError::Encode(format!("Failed to build MP3 encoder: {}", e)))?;

    let samples = track.samples();
    let mut encoded = Vec::new();
    encoded.reserve(mp3lame_encoder::max_required_buffer_size(samples.len()));

    let written = encoder
        .encode(MonoPcm(samples), encoded.spare_capacity_mut())
        .map_err(|e| BatchError::Encode(format!("MP3 encoding failed: {}", e)))?;
    // SAFETY: `encode` initialized `written` bytes of the spare capacity.
    unsafe { encoded.set_len(encoded.len() + written) };

    let written = encoder
        .flush::<FlushNoGap>(encoded.spare_capacity_mut())
        .map_err(|e| BatchError::Encode(format!("MP3 encoder flush failed: {}", e)))?;
    // SAFETY: `flush` initialized `written` bytes of the spare capacity.
    unsafe { encoded.set_len(encoded.len() + written) };

    Ok(encoded)
}

/// Snap a requested bitrate down to the nearest rate LAME supports.
fn nearest_bitrate(kbps: u32) -> Birtate {
    match kbps {
        320.. => Birtate::Kbps320,
        256.. => Birtate::Kbps256,
        224.. => Birtate::Kbps224,
        192.. => Birtate::Kbps192,
        160.. => Birtate::Kbps160,
        128.. => Birtate::Kbps128,
        112.. => Birtate::Kbps112,
        96.. => Birtate::Kbps96,
        80.. => Birtate::Kbps80,
        64.. => Birtate::Kbps64,
        48.. => Birtate::Kbps48,
        40.. => Birtate::Kbps40,
        32.. => Birtate::Kbps32,
        24.. => Birtate::Kbps24,
        16.. => Birtate::Kbps16,
        _ => Birtate::Kbps8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(duration_ms: u64, sample_rate: u32) -> AudioClip {
        let count = (duration_ms * u64::from(sample_rate) / 1000) as usize;
        AudioClip::new(vec![2000; count], sample_rate)
    }

    #[test]
    fn test_path_naming_is_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "Joanna", AudioFormat::Mp3, 128).unwrap();

        assert_eq!(
            writer.path_for(0),
            dir.path().join("Joanna_1.mp3")
        );
        assert_eq!(
            writer.path_for(41),
            dir.path().join("Joanna_42.mp3")
        );
    }

    #[test]
    fn test_write_wav_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "voice", AudioFormat::Wav, 128).unwrap();
        let track = tone(500, 8000);

        let path = writer.write(0, &track).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, track.samples());
    }

    #[test]
    fn test_write_creates_nested_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = OutputWriter::new(&nested, "voice", AudioFormat::Wav, 128).unwrap();

        let first = writer.write(0, &tone(100, 8000)).unwrap();
        let second = writer.write(0, &tone(300, 8000)).unwrap();
        assert_eq!(first, second);

        let reader = hound::WavReader::open(&second).unwrap();
        let seconds = reader.duration() as f64 / f64::from(reader.spec().sample_rate);
        assert!((seconds - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "voice", AudioFormat::Wav, 128).unwrap();

        writer.write(0, &tone(100, 8000)).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["voice_1.wav"]);
    }

    #[test]
    fn test_write_empty_track() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "voice", AudioFormat::Wav, 128).unwrap();

        let path = writer.write(0, &AudioClip::silence(0, 22050)).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 0);
    }

    #[test]
    fn test_encode_mp3_produces_bytes() {
        let encoded = encode_mp3(&tone(250, 22050), 128).unwrap();
        assert!(!encoded.is_empty());
    }
}
