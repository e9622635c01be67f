//! Track assembly: synthesized segments joined with deterministic
//! silence.

use crate::audio::AudioClip;
use crate::error::BatchError;
use crate::input::Row;
use crate::tts::SpeechSynthesizer;

/// Silence durations applied to every assembled track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceSpec {
    /// Leading and trailing silence, applied once each per row.
    pub padding_ms: u64,
    /// Silence between two consecutive spoken segments.
    pub gap_ms: u64,
}

/// Assemble one row into a single track: padding, then each non-blank
/// cell's synthesized audio with gap silence between consecutive
/// segments, then padding again.
///
/// Blank cells contribute nothing, not even a gap. A row with no
/// non-blank cells still produces a track of exactly twice the padding
/// duration, at `fallback_sample_rate` since no segment dictates one.
pub async fn assemble_row(
    synthesizer: &dyn SpeechSynthesizer,
    silence: &SilenceSpec,
    row: &Row,
    voice_id: &str,
    fallback_sample_rate: u32,
) -> Result<AudioClip, BatchError> {
    let mut segments = Vec::new();
    for (cell_index, text) in row.spoken_cells() {
        let bytes = synthesizer
            .synthesize(text, voice_id)
            .await
            .map_err(|e| annotate(e, row.index, cell_index))?;
        let segment = AudioClip::decode(&bytes, synthesizer.audio_format())
            .map_err(|e| annotate(e, row.index, cell_index))?;
        segments.push(segment);
    }

    let track_rate = segments
        .first()
        .map(AudioClip::sample_rate)
        .unwrap_or(fallback_sample_rate);

    let mut track = AudioClip::silence(silence.padding_ms, track_rate);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            track.push_clip(&AudioClip::silence(silence.gap_ms, track_rate));
        }
        track.push_clip(segment);
    }
    track.push_clip(&AudioClip::silence(silence.padding_ms, track_rate));

    Ok(track)
}

/// Stamp the failing row and cell (1-based) into an error message.
fn annotate(error: BatchError, row_index: usize, cell_index: usize) -> BatchError {
    let context = format!("row {}, cell {}", row_index + 1, cell_index + 1);
    match error {
        BatchError::Synthesis(msg) => BatchError::Synthesis(format!("{}: {}", context, msg)),
        BatchError::Decode(msg) => BatchError::Decode(format!("{}: {}", context, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixture vendor: every request yields the same WAV segment. At a
    /// 1 kHz sample rate one sample is one millisecond, which keeps the
    /// duration arithmetic in the assertions exact.
    struct FixtureSynthesizer {
        segment_ms: u64,
        sample_rate: u32,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FixtureSynthesizer {
        fn new(segment_ms: u64) -> Self {
            Self {
                segment_ms,
                sample_rate: 1000,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(100)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FixtureSynthesizer {
        async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>, BatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BatchError::Synthesis("vendor rejected request".to_string()));
            }

            let count = (self.segment_ms * u64::from(self.sample_rate) / 1000) as usize;
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: self.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
                for _ in 0..count {
                    writer.write_sample(1000i16).unwrap();
                }
                writer.finalize().unwrap();
            }
            Ok(cursor.into_inner())
        }

        fn audio_format(&self) -> AudioFormat {
            AudioFormat::Wav
        }

        fn name(&self) -> &str {
            "fixture"
        }
    }

    const SILENCE: SilenceSpec = SilenceSpec {
        padding_ms: 100,
        gap_ms: 50,
    };

    #[tokio::test]
    async fn test_all_blank_row_is_padding_only() {
        let synth = FixtureSynthesizer::new(200);
        let row = Row::new(0, vec!["".to_string(), "   ".to_string()]);

        let track = assemble_row(&synth, &SILENCE, &row, "v", 1000).await.unwrap();

        assert_eq!(track.duration_ms(), 200);
        assert_eq!(synth.calls(), 0);
        assert!(track.samples().iter().all(|&s| s == 0));
    }

    #[tokio::test]
    async fn test_empty_middle_cell_gets_single_gap() {
        let synth = FixtureSynthesizer::new(200);
        let row = Row::new(
            0,
            vec!["a".to_string(), "".to_string(), "b".to_string()],
        );

        let track = assemble_row(&synth, &SILENCE, &row, "v", 1000).await.unwrap();

        // padding + a + gap + b + padding
        assert_eq!(track.duration_ms(), 100 + 200 + 50 + 200 + 100);
        assert_eq!(synth.calls(), 2);

        // The gap sits between the two segments, not around them.
        let samples = track.samples();
        assert!(samples[..100].iter().all(|&s| s == 0));
        assert!(samples[100..300].iter().all(|&s| s != 0));
        assert!(samples[300..350].iter().all(|&s| s == 0));
        assert!(samples[350..550].iter().all(|&s| s != 0));
        assert!(samples[550..].iter().all(|&s| s == 0));
    }

    #[tokio::test]
    async fn test_single_segment_has_no_gap() {
        let synth = FixtureSynthesizer::new(300);
        let row = Row::new(0, vec!["only".to_string()]);

        let track = assemble_row(&synth, &SILENCE, &row, "v", 1000).await.unwrap();

        assert_eq!(track.duration_ms(), 100 + 300 + 100);
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn test_many_segments_gap_count() {
        let synth = FixtureSynthesizer::new(100);
        let row = Row::new(
            0,
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
        );

        let track = assemble_row(&synth, &SILENCE, &row, "v", 1000).await.unwrap();

        // 2 paddings, 4 segments, 3 gaps.
        assert_eq!(track.duration_ms(), 2 * 100 + 4 * 100 + 3 * 50);
    }

    #[tokio::test]
    async fn test_zero_silence_config() {
        let synth = FixtureSynthesizer::new(150);
        let spec = SilenceSpec {
            padding_ms: 0,
            gap_ms: 0,
        };
        let row = Row::new(0, vec!["a".to_string(), "b".to_string()]);

        let track = assemble_row(&synth, &spec, &row, "v", 1000).await.unwrap();

        assert_eq!(track.duration_ms(), 300);
    }

    #[tokio::test]
    async fn test_error_names_row_and_cell() {
        let synth = FixtureSynthesizer::failing();
        let row = Row::new(2, vec!["".to_string(), "boom".to_string()]);

        let err = assemble_row(&synth, &SILENCE, &row, "v", 1000)
            .await
            .unwrap_err();

        match err {
            BatchError::Synthesis(msg) => {
                assert!(msg.contains("row 3, cell 2"), "message was: {}", msg);
            }
            other => panic!("expected synthesis error, got {:?}", other),
        }
    }
}
