//! Error types for the batch narration pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
