//! Waveform extraction for just-waveform
//!
//! Decodes audio files into PCM, streams them through the envelope reducer
//! and caches the encoded result.

pub mod error;
pub mod extractor;
pub mod options;
pub mod source;

pub use error::ExtractError;
pub use extractor::WaveformExtractor;
pub use options::{ExtractOptions, Zoom};
