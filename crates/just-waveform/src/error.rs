//! Waveform error types

use thiserror::Error;

/// Envelope construction, codec and resampling errors
#[derive(Error, Debug)]
pub enum WaveformError {
    /// Caller-supplied parameters violate a precondition
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fewer bytes than the header declares
    #[error("Truncated input: expected {expected} bytes, got {actual}")]
    TruncatedInput { expected: usize, actual: usize },

    /// Magic identifier mismatch
    #[error("Bad magic: {0:?}")]
    BadMagic([u8; 4]),

    /// Format version the codec does not implement
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(i32),

    /// Structurally valid input carrying impossible values
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless classification of [`WaveformError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    TruncatedInput,
    BadMagic,
    UnsupportedVersion,
    CorruptData,
    Json,
}

impl WaveformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaveformError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            WaveformError::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            WaveformError::BadMagic(_) => ErrorKind::BadMagic,
            WaveformError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            WaveformError::CorruptData(_) => ErrorKind::CorruptData,
            WaveformError::Json(_) => ErrorKind::Json,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        WaveformError::InvalidConfiguration(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        WaveformError::CorruptData(msg.into())
    }
}
