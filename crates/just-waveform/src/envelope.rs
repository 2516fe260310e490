//! Envelope model

use serde::{Deserialize, Serialize};

use crate::error::WaveformError;

/// Width of each stored min/max value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    /// Values in [-128, 127]
    Eight,
    /// Values in [-32768, 32767]
    Sixteen,
}

impl BitDepth {
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Serialized width of one value in bytes
    pub const fn bytes(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
        }
    }

    pub const fn min_value(self) -> i32 {
        match self {
            BitDepth::Eight => i8::MIN as i32,
            BitDepth::Sixteen => i16::MIN as i32,
        }
    }

    pub const fn max_value(self) -> i32 {
        match self {
            BitDepth::Eight => i8::MAX as i32,
            BitDepth::Sixteen => i16::MAX as i32,
        }
    }

    /// Saturate a sample into the representable range.
    pub fn clamp(self, value: i32) -> i16 {
        // Both ranges fit in i16 after clamping.
        value.clamp(self.min_value(), self.max_value()) as i16
    }

    pub fn contains(self, value: i16) -> bool {
        (self.min_value()..=self.max_value()).contains(&i32::from(value))
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = WaveformError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            other => Err(WaveformError::invalid(format!(
                "bits per sample must be 8 or 16, got {}",
                other
            ))),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Reduced (min, max) per point representation of audio amplitude.
///
/// `data` holds `len() * channels() * 2` values laid out point-major as
/// `[p0c0min, p0c0max, p0c1min, p0c1max, p1c0min, ...]`. An envelope never
/// changes after construction; every producer hands out an owned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sample_rate: u32,
    samples_per_point: u32,
    channels: u16,
    bits: BitDepth,
    data: Vec<i16>,
}

impl Envelope {
    /// Build an envelope from raw parts, checking every invariant.
    pub fn new(
        sample_rate: u32,
        samples_per_point: u32,
        channels: u16,
        bits: BitDepth,
        data: Vec<i16>,
    ) -> Result<Self, WaveformError> {
        validate_shape(sample_rate, samples_per_point, channels)?;

        let stride = usize::from(channels) * 2;
        if data.len() % stride != 0 {
            return Err(WaveformError::invalid(format!(
                "data length {} is not a multiple of {}",
                data.len(),
                stride
            )));
        }

        for (index, pair) in data.chunks_exact(2).enumerate() {
            let (min, max) = (pair[0], pair[1]);
            let point = index / usize::from(channels);
            let channel = index % usize::from(channels);
            if !bits.contains(min) || !bits.contains(max) {
                return Err(WaveformError::corrupt(format!(
                    "point {} channel {} out of {} range: ({}, {})",
                    point, channel, bits, min, max
                )));
            }
            if min > max {
                return Err(WaveformError::corrupt(format!(
                    "point {} channel {} has min {} > max {}",
                    point, channel, min, max
                )));
            }
        }

        Ok(Self::from_parts(sample_rate, samples_per_point, channels, bits, data))
    }

    /// Producers that already honor the invariants skip the scan.
    pub(crate) fn from_parts(
        sample_rate: u32,
        samples_per_point: u32,
        channels: u16,
        bits: BitDepth,
        data: Vec<i16>,
    ) -> Self {
        debug_assert!(data.len() % (usize::from(channels) * 2) == 0);
        debug_assert!(data.chunks_exact(2).all(|p| p[0] <= p[1]));
        Self {
            sample_rate,
            samples_per_point,
            channels,
            bits,
            data,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_per_point(&self) -> u32 {
        self.samples_per_point
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits(&self) -> BitDepth {
        self.bits
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.data.len() / (usize::from(self.channels) * 2)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw interleaved (min, max) values
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    pub fn into_data(self) -> Vec<i16> {
        self.data
    }

    pub fn min_max(&self, point: usize, channel: u16) -> Option<(i16, i16)> {
        self.point(point)?.min_max(channel)
    }

    pub fn point(&self, index: usize) -> Option<Point<'_>> {
        let stride = usize::from(self.channels) * 2;
        let start = index.checked_mul(stride)?;
        let end = start.checked_add(stride)?;
        self.data.get(start..end).map(|pairs| Point { pairs })
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = Point<'_>> + '_ {
        self.data
            .chunks_exact(usize::from(self.channels) * 2)
            .map(|pairs| Point { pairs })
    }

    /// Length of the source audio covered by the envelope, in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 * f64::from(self.samples_per_point) / f64::from(self.sample_rate)
    }

    pub fn pixels_per_second(&self) -> f64 {
        f64::from(self.sample_rate) / f64::from(self.samples_per_point)
    }

    /// Index of the point covering `secs`, if any.
    pub fn point_at_time(&self, secs: f64) -> Option<usize> {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        let index = (secs * self.pixels_per_second()).floor() as usize;
        (index < self.len()).then_some(index)
    }
}

/// One envelope point across all channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point<'a> {
    pairs: &'a [i16],
}

impl<'a> Point<'a> {
    pub fn channels(&self) -> u16 {
        (self.pairs.len() / 2) as u16
    }

    pub fn min_max(&self, channel: u16) -> Option<(i16, i16)> {
        let i = usize::from(channel) * 2;
        match self.pairs.get(i..i + 2) {
            Some(&[min, max]) => Some((min, max)),
            _ => None,
        }
    }

    pub fn min(&self, channel: u16) -> Option<i16> {
        self.min_max(channel).map(|(min, _)| min)
    }

    pub fn max(&self, channel: u16) -> Option<i16> {
        self.min_max(channel).map(|(_, max)| max)
    }

    pub fn values(&self) -> &'a [i16] {
        self.pairs
    }
}

/// Largest sample rate or resolution the binary header can carry
pub(crate) const MAX_HEADER_VALUE: u32 = i32::MAX as u32;

pub(crate) fn validate_shape(
    sample_rate: u32,
    samples_per_point: u32,
    channels: u16,
) -> Result<(), WaveformError> {
    if sample_rate == 0 {
        return Err(WaveformError::invalid("sample rate must be positive"));
    }
    if samples_per_point == 0 {
        return Err(WaveformError::invalid("samples per point must be at least 1"));
    }
    // Header fields are int32.
    if sample_rate > MAX_HEADER_VALUE {
        return Err(WaveformError::invalid(format!(
            "sample rate {} exceeds {}",
            sample_rate, MAX_HEADER_VALUE
        )));
    }
    if samples_per_point > MAX_HEADER_VALUE {
        return Err(WaveformError::invalid(format!(
            "samples per point {} exceeds {}",
            samples_per_point, MAX_HEADER_VALUE
        )));
    }
    if !(1..=2).contains(&channels) {
        return Err(WaveformError::invalid(format!(
            "channels must be 1 or 2, got {}",
            channels
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> Envelope {
        Envelope::new(
            44100,
            441,
            2,
            BitDepth::Sixteen,
            vec![-5, 5, -3, 2, -100, 90, 0, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_length_and_layout() {
        let env = stereo();
        assert_eq!(env.len(), 2);
        assert_eq!(env.data().len(), env.len() * usize::from(env.channels()) * 2);
        assert_eq!(env.min_max(0, 1), Some((-3, 2)));
        assert_eq!(env.min_max(1, 0), Some((-100, 90)));
        assert_eq!(env.min_max(2, 0), None);
        assert_eq!(env.min_max(0, 2), None);
    }

    #[test]
    fn test_points_iterator() {
        let env = stereo();
        let points: Vec<_> = env.points().collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].channels(), 2);
        assert_eq!(points[1].min(0), Some(-100));
        assert_eq!(points[1].max(1), Some(0));
        for point in env.points() {
            for ch in 0..point.channels() {
                let (min, max) = point.min_max(ch).unwrap();
                assert!(min <= max);
            }
        }
    }

    #[test]
    fn test_new_rejects_min_above_max() {
        let err = Envelope::new(8000, 1, 1, BitDepth::Sixteen, vec![5, 2]).unwrap_err();
        assert!(matches!(err, WaveformError::CorruptData(_)));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = Envelope::new(8000, 1, 1, BitDepth::Eight, vec![-1, 200]).unwrap_err();
        assert!(matches!(err, WaveformError::CorruptData(_)));
    }

    #[test]
    fn test_new_rejects_bad_shape() {
        for (rate, spp, ch, data) in [
            (0, 1, 1, vec![]),
            (8000, 0, 1, vec![]),
            (8000, 1, 3, vec![]),
            (8000, 1, 2, vec![0, 0]),
            (3_000_000_000, 1, 1, vec![]),
            (8000, 3_000_000_000, 1, vec![]),
        ] {
            let err = Envelope::new(rate, spp, ch, BitDepth::Sixteen, data).unwrap_err();
            assert!(matches!(err, WaveformError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_empty_envelope() {
        let env = Envelope::new(8000, 10, 1, BitDepth::Eight, vec![]).unwrap();
        assert!(env.is_empty());
        assert_eq!(env.len(), 0);
        assert_eq!(env.duration_secs(), 0.0);
        assert!(env.point(0).is_none());
    }

    #[test]
    fn test_time_axis() {
        let env = stereo();
        assert_eq!(env.pixels_per_second(), 100.0);
        assert!((env.duration_secs() - 0.02).abs() < 1e-12);
        assert_eq!(env.point_at_time(0.0), Some(0));
        assert_eq!(env.point_at_time(0.015), Some(1));
        assert_eq!(env.point_at_time(0.02), None);
        assert_eq!(env.point_at_time(-1.0), None);
    }

    #[test]
    fn test_bit_depth() {
        assert_eq!(BitDepth::Eight.clamp(32000), 127);
        assert_eq!(BitDepth::Eight.clamp(-32000), -128);
        assert_eq!(BitDepth::Sixteen.clamp(100_000), i16::MAX);
        assert_eq!(BitDepth::Sixteen.clamp(-7), -7);
        assert_eq!(BitDepth::try_from(16).unwrap(), BitDepth::Sixteen);
        assert!(BitDepth::try_from(24).is_err());
        assert_eq!(u8::from(BitDepth::Eight), 8);
    }

    #[test]
    fn test_bit_depth_serde() {
        assert_eq!(serde_json::to_string(&BitDepth::Eight).unwrap(), "8");
        let depth: BitDepth = serde_json::from_str("16").unwrap();
        assert_eq!(depth, BitDepth::Sixteen);
        assert!(serde_json::from_str::<BitDepth>("12").is_err());
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Envelope>();
    }
}
