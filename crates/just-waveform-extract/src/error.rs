//! Waveform extraction error types

use just_waveform::WaveformError;
use thiserror::Error;

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File not found
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    /// Invalid audio format
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    /// Extraction failed
    #[error("Waveform extraction failed: {0}")]
    GenerationFailed(String),

    /// Cache error
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Envelope error
    #[error(transparent)]
    Waveform(#[from] WaveformError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
