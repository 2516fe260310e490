//! JSON interchange form
//!
//! ```json
//! {"version": 2, "channels": 1, "sample_rate": 44100, "samples_per_pixel": 256,
//!  "bits": 16, "length": 2, "data": [-12, 40, -3, 8]}
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::codec::{CURRENT_VERSION, VERSION_1, VERSION_2};
use crate::envelope::{BitDepth, Envelope};
use crate::error::WaveformError;

#[derive(Debug, Serialize, Deserialize)]
struct JsonEnvelope<'a> {
    version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channels: Option<u16>,
    sample_rate: u32,
    samples_per_pixel: u32,
    bits: u8,
    length: usize,
    data: Cow<'a, [i16]>,
}

pub fn to_json(envelope: &Envelope) -> Result<String, WaveformError> {
    let repr = JsonEnvelope {
        version: CURRENT_VERSION,
        channels: Some(envelope.channels()),
        sample_rate: envelope.sample_rate(),
        samples_per_pixel: envelope.samples_per_point(),
        bits: envelope.bits().bits(),
        length: envelope.len(),
        data: Cow::Borrowed(envelope.data()),
    };
    Ok(serde_json::to_string(&repr)?)
}

pub fn from_json(input: &str) -> Result<Envelope, WaveformError> {
    let repr: JsonEnvelope<'_> = serde_json::from_str(input)?;

    let channels = match repr.version {
        VERSION_1 => 1,
        VERSION_2 => repr
            .channels
            .ok_or_else(|| WaveformError::corrupt("missing channel count"))?,
        other => return Err(WaveformError::UnsupportedVersion(other)),
    };
    let bits = BitDepth::try_from(repr.bits)
        .map_err(|_| WaveformError::corrupt(format!("unsupported bit depth {}", repr.bits)))?;

    let expected = repr.length.checked_mul(usize::from(channels) * 2);
    if expected != Some(repr.data.len()) {
        return Err(WaveformError::corrupt(format!(
            "length {} does not match {} data values",
            repr.length,
            repr.data.len()
        )));
    }

    Envelope::new(
        repr.sample_rate,
        repr.samples_per_pixel,
        channels,
        bits,
        repr.data.into_owned(),
    )
    .map_err(|err| match err {
        WaveformError::InvalidConfiguration(msg) => WaveformError::CorruptData(msg),
        other => other,
    })
}
