//! Downsampling engine
//!
//! Reduces interleaved PCM frames into an [`Envelope`] by tracking a running
//! (min, max) per output channel over buckets of `samples_per_point` frames.
//! A trailing bucket with fewer frames is flushed as a final, shorter point.

use serde::{Deserialize, Serialize};

use crate::envelope::{validate_shape, BitDepth, Envelope};
use crate::error::WaveformError;

/// How source channels beyond the output channel count are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Downmix {
    /// Integer mean of the folded channels, truncated toward zero.
    ///
    /// Mono output averages every source channel. Stereo output folds
    /// even-indexed source channels into the left channel and odd-indexed
    /// ones into the right.
    #[default]
    Average,
    /// Keep the first one (mono) or two (stereo) source channels.
    Drop,
}

/// What reducing a stream without a single frame produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyInput {
    /// A valid envelope with zero points
    #[default]
    Allow,
    /// An `InvalidConfiguration` error
    Reject,
}

/// Reduction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Source frames per envelope point
    pub samples_per_point: u32,
    /// Output channels (1 or 2)
    pub channels: u16,
    /// Output value width
    pub bits: BitDepth,
    /// Source sample rate, carried for the time axis only
    pub sample_rate: u32,
    pub downmix: Downmix,
    pub empty_input: EmptyInput,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            samples_per_point: 256,
            channels: 1,
            bits: BitDepth::Sixteen,
            sample_rate: 44100,
            downmix: Downmix::default(),
            empty_input: EmptyInput::default(),
        }
    }
}

impl ReduceConfig {
    pub fn new(samples_per_point: u32, sample_rate: u32) -> Self {
        Self {
            samples_per_point,
            sample_rate,
            ..Default::default()
        }
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_bits(mut self, bits: BitDepth) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_downmix(mut self, downmix: Downmix) -> Self {
        self.downmix = downmix;
        self
    }

    pub fn with_empty_input(mut self, empty_input: EmptyInput) -> Self {
        self.empty_input = empty_input;
        self
    }

    pub fn validate(&self) -> Result<(), WaveformError> {
        validate_shape(self.sample_rate, self.samples_per_point, self.channels)
    }
}

/// Caller-supplied stream of interleaved PCM blocks
pub trait SampleSource {
    /// Channels per interleaved frame
    fn channels(&self) -> u16;

    /// Next block of interleaved samples, `None` at end of stream.
    ///
    /// Blocks need not end on a frame boundary.
    fn next_block(&mut self) -> Option<&[i32]>;
}

/// [`SampleSource`] over an in-memory slice
#[derive(Debug, Clone)]
pub struct InterleavedSamples<'a> {
    samples: &'a [i32],
    channels: u16,
    block_frames: usize,
    position: usize,
}

impl<'a> InterleavedSamples<'a> {
    pub fn new(samples: &'a [i32], channels: u16) -> Self {
        Self {
            samples,
            channels,
            block_frames: 4096,
            position: 0,
        }
    }

    /// Hand the samples out `frames` frames at a time.
    pub fn with_block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames.max(1);
        self
    }
}

impl SampleSource for InterleavedSamples<'_> {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn next_block(&mut self) -> Option<&[i32]> {
        if self.position >= self.samples.len() {
            return None;
        }
        let step = self
            .block_frames
            .saturating_mul(usize::from(self.channels.max(1)));
        let end = self.samples.len().min(self.position.saturating_add(step));
        let block = &self.samples[self.position..end];
        self.position = end;
        Some(block)
    }
}

/// Streaming reducer.
///
/// Feed interleaved samples with [`Reducer::push`] in arrival order and call
/// [`Reducer::finish`] at end of stream. Samples are not retained.
#[derive(Debug)]
pub struct Reducer {
    config: ReduceConfig,
    source_channels: usize,
    // Samples of a frame split across two pushes
    partial: Vec<i32>,
    mins: [i32; 2],
    maxs: [i32; 2],
    filled: u32,
    frames: u64,
    data: Vec<i16>,
}

impl Reducer {
    pub fn new(config: ReduceConfig, source_channels: u16) -> Result<Self, WaveformError> {
        config.validate()?;
        if source_channels == 0 {
            return Err(WaveformError::invalid("source must have at least one channel"));
        }
        Ok(Self {
            config,
            source_channels: usize::from(source_channels),
            partial: Vec::new(),
            mins: [i32::MAX; 2],
            maxs: [i32::MIN; 2],
            filled: 0,
            frames: 0,
            data: Vec::new(),
        })
    }

    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    pub fn push(&mut self, samples: &[i32]) {
        let mut rest = samples;

        if !self.partial.is_empty() {
            let take = (self.source_channels - self.partial.len()).min(rest.len());
            self.partial.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.partial.len() < self.source_channels {
                return;
            }
            let frame = std::mem::take(&mut self.partial);
            self.push_frame(&frame);
            self.partial = frame;
            self.partial.clear();
        }

        let mut frames = rest.chunks_exact(self.source_channels);
        for frame in &mut frames {
            self.push_frame(frame);
        }
        self.partial.extend_from_slice(frames.remainder());
    }

    /// Complete points produced so far
    pub fn points_emitted(&self) -> usize {
        self.data.len() / (usize::from(self.config.channels) * 2)
    }

    /// Frames consumed so far
    pub fn frames_consumed(&self) -> u64 {
        self.frames
    }

    /// Flush the trailing partial bucket and build the envelope.
    ///
    /// Samples of an incomplete trailing frame are discarded.
    pub fn finish(mut self) -> Result<Envelope, WaveformError> {
        if self.frames == 0 && self.config.empty_input == EmptyInput::Reject {
            return Err(WaveformError::invalid("input contains no samples"));
        }
        if self.filled > 0 {
            self.flush();
        }
        let ReduceConfig {
            sample_rate,
            samples_per_point,
            channels,
            bits,
            ..
        } = self.config;
        Ok(Envelope::from_parts(
            sample_rate,
            samples_per_point,
            channels,
            bits,
            self.data,
        ))
    }

    fn push_frame(&mut self, frame: &[i32]) {
        for ch in 0..usize::from(self.config.channels) {
            let value = i32::from(self.config.bits.clamp(self.mix(frame, ch)));
            self.mins[ch] = self.mins[ch].min(value);
            self.maxs[ch] = self.maxs[ch].max(value);
        }
        self.filled += 1;
        self.frames += 1;
        if self.filled == self.config.samples_per_point {
            self.flush();
        }
    }

    fn mix(&self, frame: &[i32], ch: usize) -> i32 {
        if frame.len() == 1 {
            return frame[0];
        }
        match (self.config.downmix, self.config.channels) {
            (Downmix::Drop, _) => frame[ch],
            (Downmix::Average, 1) => mean(frame.iter()),
            (Downmix::Average, _) => mean(frame.iter().skip(ch).step_by(2)),
        }
    }

    fn flush(&mut self) {
        for ch in 0..usize::from(self.config.channels) {
            // Values were clamped on the way in.
            self.data.push(self.mins[ch] as i16);
            self.data.push(self.maxs[ch] as i16);
        }
        self.mins = [i32::MAX; 2];
        self.maxs = [i32::MIN; 2];
        self.filled = 0;
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a i32>) -> i32 {
    let (sum, count) = values.fold((0i64, 0i64), |(sum, count), &v| (sum + i64::from(v), count + 1));
    // count > 0: callers pass at least one channel
    (sum / count.max(1)) as i32
}

/// Reduce a whole sample source into an envelope.
pub fn reduce<S: SampleSource + ?Sized>(
    source: &mut S,
    config: &ReduceConfig,
) -> Result<Envelope, WaveformError> {
    let mut reducer = Reducer::new(config.clone(), source.channels())?;
    while let Some(block) = source.next_block() {
        reducer.push(block);
    }
    reducer.finish()
}

/// Reduce an interleaved slice with `source_channels` samples per frame.
pub fn reduce_interleaved(
    samples: &[i32],
    source_channels: u16,
    config: &ReduceConfig,
) -> Result<Envelope, WaveformError> {
    reduce(&mut InterleavedSamples::new(samples, source_channels), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(spp: u32) -> ReduceConfig {
        ReduceConfig::new(spp, 8000)
    }

    #[test]
    fn test_partial_final_bucket() {
        // Buckets are consecutive runs of 3 frames; the 10th frame is a bucket of its own.
        let samples = [0, 10, -5, 3, 7, -20, 15, 2, -1, 8];
        let env = reduce_interleaved(&samples, 1, &mono(3)).unwrap();

        assert_eq!(env.len(), 4);
        assert_eq!(env.data(), &[-5, 10, -20, 7, -1, 15, 8, 8]);
        assert_eq!(env.samples_per_point(), 3);
        assert_eq!(env.sample_rate(), 8000);
    }

    #[test]
    fn test_exact_buckets() {
        let samples = [1, -1, 2, -2, 3, -3];
        let env = reduce_interleaved(&samples, 1, &mono(2)).unwrap();
        assert_eq!(env.data(), &[-1, 1, -2, 2, -3, 3]);
    }

    #[test]
    fn test_clamping() {
        let config = mono(1).with_bits(BitDepth::Eight);
        let env = reduce_interleaved(&[32000, -32000, 5], 1, &config).unwrap();
        assert_eq!(env.data(), &[127, 127, -128, -128, 5, 5]);

        let env = reduce_interleaved(&[70000, -70000], 1, &mono(2)).unwrap();
        assert_eq!(env.data(), &[i16::MIN, i16::MAX]);
    }

    #[test]
    fn test_deterministic() {
        let samples: Vec<i32> = (0..1000).map(|i| (i * 7919 % 2001) - 1000).collect();
        let config = mono(37).with_channels(2);
        let a = reduce_interleaved(&samples, 2, &config).unwrap();
        let b = reduce_interleaved(&samples, 2, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stereo_layout() {
        // frames: (1, -1), (4, -4), (2, -2)
        let samples = [1, -1, 4, -4, 2, -2];
        let config = mono(2).with_channels(2);
        let env = reduce_interleaved(&samples, 2, &config).unwrap();
        assert_eq!(env.channels(), 2);
        assert_eq!(env.len(), 2);
        assert_eq!(env.data(), &[1, 4, -4, -1, 2, 2, -2, -2]);
    }

    #[test]
    fn test_downmix_average_to_mono() {
        let samples = [10, 20, -7, 0, 3, 4];
        let env = reduce_interleaved(&samples, 2, &mono(1)).unwrap();
        // (-7 + 0) / 2 truncates toward zero
        assert_eq!(env.data(), &[15, 15, -3, -3, 3, 3]);
    }

    #[test]
    fn test_downmix_drop_to_mono() {
        let samples = [10, 20, -7, 0];
        let config = mono(1).with_downmix(Downmix::Drop);
        let env = reduce_interleaved(&samples, 2, &config).unwrap();
        assert_eq!(env.data(), &[10, 10, -7, -7]);
    }

    #[test]
    fn test_downmix_four_channels_to_stereo() {
        let samples = [10, 1, 20, 3];
        let average = reduce_interleaved(&samples, 4, &mono(1).with_channels(2)).unwrap();
        assert_eq!(average.data(), &[15, 15, 2, 2]);

        let config = mono(1).with_channels(2).with_downmix(Downmix::Drop);
        let dropped = reduce_interleaved(&samples, 4, &config).unwrap();
        assert_eq!(dropped.data(), &[10, 10, 1, 1]);
    }

    #[test]
    fn test_mono_source_to_stereo_duplicates() {
        let env = reduce_interleaved(&[5, -5], 1, &mono(2).with_channels(2)).unwrap();
        assert_eq!(env.data(), &[-5, 5, -5, 5]);
    }

    #[test]
    fn test_frames_split_across_pushes() {
        let samples: Vec<i32> = (0..60).map(|i| if i % 2 == 0 { i } else { -i }).collect();
        let config = mono(4).with_channels(2);
        let whole = reduce_interleaved(&samples, 2, &config).unwrap();

        let mut reducer = Reducer::new(config, 2).unwrap();
        for chunk in samples.chunks(7) {
            reducer.push(chunk);
        }
        assert_eq!(reducer.frames_consumed(), 30);
        assert_eq!(reducer.points_emitted(), 7);
        assert_eq!(reducer.finish().unwrap(), whole);
    }

    #[test]
    fn test_source_block_sizes_agree() {
        let samples: Vec<i32> = (0..99).map(|i| (i * 31) % 17 - 8).collect();
        let config = mono(5);
        let a = reduce(&mut InterleavedSamples::new(&samples, 1).with_block_frames(1), &config).unwrap();
        let b = reduce(&mut InterleavedSamples::new(&samples, 1).with_block_frames(64), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_huge_block_size() {
        let samples = [1, 2, 3, 4];
        let mut source = InterleavedSamples::new(&samples, 2).with_block_frames(usize::MAX);
        let env = reduce(&mut source, &mono(1)).unwrap();
        assert_eq!(env.data(), &[1, 1, 3, 3]);
    }

    #[test]
    fn test_incomplete_trailing_frame_discarded() {
        let env = reduce_interleaved(&[1, 2, 3], 2, &mono(1).with_channels(2)).unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env.data(), &[1, 1, 2, 2]);
    }

    #[test]
    fn test_empty_input_allowed() {
        let env = reduce_interleaved(&[], 1, &mono(3)).unwrap();
        assert!(env.is_empty());
        assert_eq!(env.samples_per_point(), 3);
    }

    #[test]
    fn test_empty_input_rejected() {
        let config = mono(3).with_empty_input(EmptyInput::Reject);
        let err = reduce_interleaved(&[], 1, &config).unwrap_err();
        assert!(matches!(err, WaveformError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_invalid_configuration() {
        let cases = [
            mono(0),
            mono(1).with_channels(0),
            mono(1).with_channels(3),
            ReduceConfig::new(1, 0),
            ReduceConfig::new(3_000_000_000, 8000),
            ReduceConfig::new(1, u32::MAX),
        ];
        for config in cases {
            let err = reduce_interleaved(&[1, 2, 3], 1, &config).unwrap_err();
            assert!(matches!(err, WaveformError::InvalidConfiguration(_)), "{:?}", config);
        }

        let err = Reducer::new(mono(1), 0).unwrap_err();
        assert!(matches!(err, WaveformError::InvalidConfiguration(_)));
        assert!(matches!(
            BitDepth::try_from(12),
            Err(WaveformError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_config_serde() {
        let config: ReduceConfig =
            serde_json::from_str(r#"{"samples_per_point": 512, "bits": 8, "downmix": "drop"}"#)
                .unwrap();
        assert_eq!(config.samples_per_point, 512);
        assert_eq!(config.bits, BitDepth::Eight);
        assert_eq!(config.downmix, Downmix::Drop);
        assert_eq!(config.channels, 1);
        assert_eq!(config.empty_input, EmptyInput::Allow);
    }
}
