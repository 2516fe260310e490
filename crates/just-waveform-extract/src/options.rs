//! Extraction options

use just_waveform::{BitDepth, Downmix, ReduceConfig, WaveformError};
use serde::{Deserialize, Serialize};

/// Horizontal resolution of the extracted envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zoom {
    /// Fixed number of source frames per point
    SamplesPerPixel(u32),
    /// Points per second of audio; resolved against the source sample rate
    PixelsPerSecond(u32),
}

impl Zoom {
    /// Frames per point for audio at `sample_rate`.
    pub fn samples_per_point(&self, sample_rate: u32) -> Result<u32, WaveformError> {
        match *self {
            Zoom::SamplesPerPixel(0) => Err(WaveformError::InvalidConfiguration(
                "samples per pixel must be at least 1".to_string(),
            )),
            Zoom::SamplesPerPixel(spp) => Ok(spp),
            Zoom::PixelsPerSecond(0) => Err(WaveformError::InvalidConfiguration(
                "pixels per second must be at least 1".to_string(),
            )),
            Zoom::PixelsPerSecond(pps) => Ok((sample_rate / pps).max(1)),
        }
    }

    fn tag(&self) -> String {
        match self {
            Zoom::SamplesPerPixel(spp) => format!("spp{}", spp),
            Zoom::PixelsPerSecond(pps) => format!("pps{}", pps),
        }
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Zoom::SamplesPerPixel(256)
    }
}

/// Options for [`crate::WaveformExtractor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub zoom: Zoom,
    /// Output channels (1 or 2)
    pub channels: u16,
    pub bits: BitDepth,
    pub downmix: Downmix,
    pub use_cache: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            zoom: Zoom::default(),
            channels: 1,
            bits: BitDepth::Sixteen,
            downmix: Downmix::Average,
            use_cache: true,
        }
    }
}

impl ExtractOptions {
    /// Reducer configuration for audio at `sample_rate`.
    pub fn reduce_config(&self, sample_rate: u32) -> Result<ReduceConfig, WaveformError> {
        let config = ReduceConfig::new(self.zoom.samples_per_point(sample_rate)?, sample_rate)
            .with_channels(self.channels)
            .with_bits(self.bits)
            .with_downmix(self.downmix);
        config.validate()?;
        Ok(config)
    }

    /// Cache file suffix identifying everything that shapes the output
    pub(crate) fn cache_tag(&self) -> String {
        let downmix = match self.downmix {
            Downmix::Average => "avg",
            Downmix::Drop => "drop",
        };
        format!(
            "{}_{}b_{}ch_{}",
            self.zoom.tag(),
            self.bits.bits(),
            self.channels,
            downmix
        )
    }
}
