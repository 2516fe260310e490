//! Resampler
//!
//! Derives a coarser envelope from a finer one by merging `factor`
//! consecutive points per channel (min of mins, max of maxes). A trailing
//! group of fewer than `factor` points becomes a final, shorter point, the
//! same end-of-stream policy the reducer applies to samples.

use crate::envelope::{Envelope, MAX_HEADER_VALUE};
use crate::error::WaveformError;

/// Merge every `factor` points of `source` into one.
pub fn resample(source: &Envelope, factor: u32) -> Result<Envelope, WaveformError> {
    if factor == 0 {
        return Err(WaveformError::invalid("resample factor must be at least 1"));
    }
    let samples_per_point = source
        .samples_per_point()
        .checked_mul(factor)
        .filter(|&spp| spp <= MAX_HEADER_VALUE)
        .ok_or_else(|| {
            WaveformError::invalid(format!(
                "{} samples per point times factor {} exceeds the header range",
                source.samples_per_point(),
                factor
            ))
        })?;
    if factor == 1 {
        return Ok(source.clone());
    }

    let channels = usize::from(source.channels());
    let stride = channels * 2;
    let group = stride * factor as usize;
    let mut data = Vec::with_capacity(source.len().div_ceil(factor as usize) * stride);

    for points in source.data().chunks(group) {
        for ch in 0..channels {
            let (min, max) = points
                .chunks_exact(stride)
                .fold((i16::MAX, i16::MIN), |(min, max), point| {
                    (min.min(point[ch * 2]), max.max(point[ch * 2 + 1]))
                });
            data.push(min);
            data.push(max);
        }
    }

    Ok(Envelope::from_parts(
        source.sample_rate(),
        samples_per_point,
        source.channels(),
        source.bits(),
        data,
    ))
}

/// Resample to an absolute resolution.
///
/// `samples_per_point` must be a whole multiple of the source resolution;
/// finer resolutions cannot be reconstructed from an envelope.
pub fn resample_to(source: &Envelope, samples_per_point: u32) -> Result<Envelope, WaveformError> {
    let current = source.samples_per_point();
    if samples_per_point < current {
        return Err(WaveformError::invalid(format!(
            "cannot increase resolution from {} to {} samples per point",
            current, samples_per_point
        )));
    }
    if samples_per_point % current != 0 {
        return Err(WaveformError::invalid(format!(
            "{} samples per point is not a multiple of {}",
            samples_per_point, current
        )));
    }
    resample(source, samples_per_point / current)
}
