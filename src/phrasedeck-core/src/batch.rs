//! Batch pipeline: read rows, assemble tracks, write files.

use std::path::PathBuf;

use crate::assemble::{SilenceSpec, assemble_row};
use crate::audio::AudioFormat;
use crate::config::SynthesisConfig;
use crate::error::BatchError;
use crate::input::read_rows;
use crate::tts::SpeechSynthesizer;
use crate::writer::OutputWriter;

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    /// Voice id passed to the vendor on every synthesis call.
    pub voice_id: String,
    /// Filename stem; the voice id is used when absent.
    pub output_prefix: Option<String>,
    pub output_format: AudioFormat,
    pub silence: SilenceSpec,
    pub synthesis: SynthesisConfig,
}

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A row is about to be assembled.
    RowStart {
        index: usize,
        cells: usize,
        spoken: usize,
    },
    /// A row's track was encoded and persisted.
    RowWritten {
        index: usize,
        path: PathBuf,
        duration_ms: u64,
    },
    /// The whole input file was processed.
    BatchEnd {
        rows_written: usize,
        total_duration_ms: u64,
    },
}

/// Callback for batch events.
pub type BatchCallback = Box<dyn Fn(BatchEvent) + Send + Sync>;

/// Totals reported after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows_written: usize,
    pub total_duration_ms: u64,
}

/// Drives the whole pipeline over one input file.
///
/// Rows are processed strictly in file order, one at a time. The first
/// failure aborts the run with the offending row identified in the
/// error; rows already written stay on disk.
pub struct BatchRunner {
    config: BatchConfig,
    synthesizer: Box<dyn SpeechSynthesizer>,
    callback: Option<BatchCallback>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            config,
            synthesizer,
            callback: None,
        }
    }

    /// Set a callback for batch events.
    pub fn with_callback(mut self, callback: BatchCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run the full batch.
    pub async fn run(&self) -> Result<BatchSummary, BatchError> {
        let rows = read_rows(&self.config.input_file)?;

        let prefix = self
            .config
            .output_prefix
            .clone()
            .unwrap_or_else(|| self.config.voice_id.clone());
        let writer = OutputWriter::new(
            self.config.output_dir.clone(),
            prefix,
            self.config.output_format,
            self.config.synthesis.mp3_bitrate_kbps,
        )?;

        let mut summary = BatchSummary {
            rows_written: 0,
            total_duration_ms: 0,
        };

        for row in &rows {
            self.emit(BatchEvent::RowStart {
                index: row.index,
                cells: row.cells.len(),
                spoken: row.spoken_cells().count(),
            });

            let track = assemble_row(
                self.synthesizer.as_ref(),
                &self.config.silence,
                row,
                &self.config.voice_id,
                self.config.synthesis.sample_rate,
            )
            .await?;

            let duration_ms = track.duration_ms();
            let path = writer.write(row.index, &track)?;

            summary.rows_written += 1;
            summary.total_duration_ms += duration_ms;
            self.emit(BatchEvent::RowWritten {
                index: row.index,
                path,
                duration_ms,
            });
        }

        self.emit(BatchEvent::BatchEnd {
            rows_written: summary.rows_written,
            total_duration_ms: summary.total_duration_ms,
        });
        Ok(summary)
    }

    /// Emit an event if a callback is registered.
    fn emit(&self, event: BatchEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}
