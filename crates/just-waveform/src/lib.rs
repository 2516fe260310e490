//! just-waveform - min/max amplitude envelopes for audio visualization
//!
//! Reduces interleaved PCM into a fixed-resolution envelope, persists it in a
//! versioned little-endian binary layout and derives coarser envelopes from
//! finer ones without going back to the audio.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod json;
pub mod reduce;
pub mod resample;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use codec::{decode, decode_view, encode, encode_version, EnvelopeView, WaveformHeader, MAGIC};
pub use envelope::{BitDepth, Envelope, Point};
pub use error::{ErrorKind, WaveformError};
pub use json::{from_json, to_json};
pub use reduce::{
    reduce, reduce_interleaved, Downmix, EmptyInput, InterleavedSamples, ReduceConfig, Reducer,
    SampleSource,
};
pub use resample::{resample, resample_to};
