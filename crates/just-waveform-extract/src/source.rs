//! Audio file decoding into the envelope reducer
//!
//! Samples are normalized to the 16-bit range and pushed block by block, so
//! the decoded audio is never held in memory as a whole.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use just_waveform::{Envelope, Reducer};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::options::ExtractOptions;

const BLOCK_FRAMES: usize = 4096;

/// Scale an integer sample of `bits` width to the 16-bit range.
pub fn int_to_16_bit(sample: i32, bits: u16) -> i32 {
    match bits {
        0..=15 => sample << (16 - bits),
        16 => sample,
        _ => sample >> (bits.min(32) - 16),
    }
}

/// Scale a float sample in [-1.0, 1.0] to the 16-bit range.
pub fn float_to_16_bit(sample: f32) -> i32 {
    (sample * f32::from(i16::MAX))
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i32
}

/// Decode `path` and reduce it into an envelope.
///
/// `progress` receives values in [0.0, 1.0); the caller signals completion.
pub fn reduce_file<F>(
    path: &Path,
    options: &ExtractOptions,
    progress: &F,
) -> Result<Envelope, ExtractError>
where
    F: Fn(f64),
{
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("wav") => reduce_wav(path, options, progress),
        Some("mp3") | Some("m4a") | Some("aac") | Some("flac") | Some("ogg") => {
            reduce_symphonia(path, options, progress)
        }
        Some(ext) => Err(ExtractError::InvalidFormat(format!("Unsupported format: {}", ext))),
        None => Err(ExtractError::InvalidFormat("Unknown format".to_string())),
    }
}

fn report<F: Fn(f64)>(progress: &F, done: u64, total: Option<u64>) {
    if let Some(total) = total.filter(|&t| t > 0) {
        progress((done as f64 / total as f64).min(0.99));
    }
}

/// Load samples from a WAV file using hound
fn reduce_wav<F: Fn(f64)>(
    path: &Path,
    options: &ExtractOptions,
    progress: &F,
) -> Result<Envelope, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::FileNotFound(e.to_string()))?;
    let mut reader = hound::WavReader::new(BufReader::new(file))
        .map_err(|e| ExtractError::InvalidFormat(e.to_string()))?;

    let spec = reader.spec();
    debug!(
        "WAV source: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let mut reducer = Reducer::new(options.reduce_config(spec.sample_rate)?, spec.channels)?;
    let total = Some(u64::from(reader.duration()));
    let block_len = BLOCK_FRAMES * usize::from(spec.channels);
    let mut block = Vec::with_capacity(block_len);

    let samples: Box<dyn Iterator<Item = Result<i32, hound::Error>> + '_> = match spec.sample_format
    {
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            Box::new(
                reader
                    .samples::<i32>()
                    .map(move |s| s.map(|v| int_to_16_bit(v, bits))),
            )
        }
        hound::SampleFormat::Float => {
            Box::new(reader.samples::<f32>().map(|s| s.map(float_to_16_bit)))
        }
    };

    for sample in samples {
        block.push(sample.map_err(|e| ExtractError::InvalidFormat(e.to_string()))?);
        if block.len() == block_len {
            reducer.push(&block);
            block.clear();
            report(progress, reducer.frames_consumed(), total);
        }
    }
    reducer.push(&block);

    Ok(reducer.finish()?)
}

/// Load samples from a compressed audio file using symphonia
fn reduce_symphonia<F: Fn(f64)>(
    path: &Path,
    options: &ExtractOptions,
    progress: &F,
) -> Result<Envelope, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::FileNotFound(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ExtractError::InvalidFormat(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| ExtractError::InvalidFormat("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| ExtractError::InvalidFormat("No sample rate".to_string()))?;
    let config = options.reduce_config(sample_rate)?;
    let total = codec_params.n_frames;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ExtractError::InvalidFormat(format!("Decoder error: {}", e)))?;

    // Created from the first decoded packet, which knows the real channel count.
    let mut state: Option<(Reducer, usize)> = None;
    let mut block: Vec<i32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(ExtractError::InvalidFormat(format!("Read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(ExtractError::InvalidFormat(format!("Decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if state.is_none() {
            let source_channels = u16::try_from(channels)
                .map_err(|_| ExtractError::InvalidFormat(format!("{} channels", channels)))?;
            state = Some((Reducer::new(config.clone(), source_channels)?, channels));
        }

        if let Some((reducer, expected)) = state.as_mut() {
            if channels != *expected {
                return Err(ExtractError::GenerationFailed(format!(
                    "Channel count changed from {} to {}",
                    expected, channels
                )));
            }

            let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            block.clear();
            block.extend(sample_buf.samples().iter().map(|&s| i32::from(s)));
            reducer.push(&block);
            report(progress, reducer.frames_consumed(), total);
        }
    }

    let reducer = match state {
        Some((reducer, _)) => reducer,
        None => {
            let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);
            Reducer::new(config, channels)?
        }
    };
    Ok(reducer.finish()?)
}
