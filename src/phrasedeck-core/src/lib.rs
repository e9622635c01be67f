//! Phrasedeck Core Library
//!
//! Converts rows of a comma-separated text file into narrated audio
//! files through a network text-to-speech vendor, with configurable
//! silence before, after, and between spoken segments.

pub mod assemble;
pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod input;
pub mod tts;
pub mod writer;

pub use assemble::{SilenceSpec, assemble_row};
pub use audio::{AudioClip, AudioFormat};
pub use batch::{BatchCallback, BatchConfig, BatchEvent, BatchRunner, BatchSummary};
pub use config::{Config, SynthesisConfig, VoiceSettings};
pub use error::BatchError;
pub use input::{Row, read_rows};
pub use tts::{Provider, SpeechSynthesizer, build_synthesizer};
pub use writer::OutputWriter;
