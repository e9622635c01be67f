//! Decoded audio clips: silence generation, decoding, resampling.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::BatchError;

/// Encoded audio containers understood by the pipeline, on both the
/// vendor side (response decoding) and the output side (file encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            _ => Err(BatchError::Config(format!(
                "Unknown audio format: '{}'. Valid values: mp3, wav",
                s
            ))),
        }
    }
}

/// A decoded mono audio clip.
///
/// Multi-channel sources are downmixed to mono at decode time, so a
/// clip is always a flat run of samples at one rate and concatenation
/// is plain sample appending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A clip of the given duration with no acoustic content.
    pub fn silence(duration_ms: u64, sample_rate: u32) -> Self {
        let count = duration_ms * u64::from(sample_rate) / 1000;
        Self {
            samples: vec![0; count as usize],
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Append another clip in time, resampling it first if its rate
    /// differs from this clip's.
    pub fn push_clip(&mut self, other: &AudioClip) {
        if other.sample_rate == self.sample_rate {
            self.samples.extend_from_slice(&other.samples);
        } else {
            self.samples
                .extend(resample(&other.samples, other.sample_rate, self.sample_rate));
        }
    }

    /// Decode encoded audio bytes into a mono clip.
    pub fn decode(bytes: &[u8], format: AudioFormat) -> Result<Self, BatchError> {
        match format {
            AudioFormat::Mp3 => decode_mp3(bytes),
            AudioFormat::Wav => decode_wav(bytes),
        }
    }
}

fn decode_wav(bytes: &[u8]) -> Result<AudioClip, BatchError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| BatchError::Decode(format!("Invalid WAV data: {}", e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits) if bits <= 16 => reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| BatchError::Decode(format!("Corrupt WAV samples: {}", e)))?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
            .collect::<Result<_, _>>()
            .map_err(|e| BatchError::Decode(format!("Corrupt WAV samples: {}", e)))?,
        (_, bits) => {
            return Err(BatchError::Decode(format!(
                "Unsupported WAV bit depth: {}",
                bits
            )));
        }
    };

    Ok(AudioClip::new(
        downmix(&interleaved, channels),
        spec.sample_rate,
    ))
}

fn decode_mp3(bytes: &[u8]) -> Result<AudioClip, BatchError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BatchError::Decode(format!("Unrecognized audio data: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| BatchError::Decode("No decodable audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BatchError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<i16> = Vec::new();
    let mut channels = 1usize;
    let mut sample_rate = 0u32;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(BatchError::Decode(format!(
                    "Failed to read audio packet: {}",
                    e
                )));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt frame is skippable; anything else is fatal.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(BatchError::Decode(format!(
                    "Failed to decode audio frame: {}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        channels = spec.channels.count().max(1);
        sample_rate = spec.rate;

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buffer.samples());
    }

    if interleaved.is_empty() || sample_rate == 0 {
        return Err(BatchError::Decode(
            "Audio stream contained no samples".to_string(),
        ));
    }

    Ok(AudioClip::new(downmix(&interleaved, channels), sample_rate))
}

/// Average interleaved channels down to mono.
fn downmix(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Convert samples between rates using linear interpolation.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f32 / to_rate as f32;
    let new_len = (samples.len() as f32 / ratio) as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f32 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f32;

        if src_idx + 1 < samples.len() {
            // Linear interpolation between adjacent samples
            let sample =
                f32::from(samples[src_idx]) * (1.0 - frac) + f32::from(samples[src_idx + 1]) * frac;
            result.push(sample as i16);
        } else if src_idx < samples.len() {
            result.push(samples[src_idx]);
        }
    }

    result
}
