//! C-compatible export layer
//!
//! Functions use the `jw_` prefix and report failures through [`JwStatus`].
//! Envelopes cross the boundary as opaque [`JwEnvelope`] handles owned by the
//! caller until `jw_envelope_free`. Encoded buffers returned by `jw_encode`
//! are released with `jw_bytes_free`. The declarations live in
//! `include/just_waveform/just_waveform.h`.
//!
//! Handles are immutable, so one handle may be read from several threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::slice;

use crate::codec::{decode, encode, WaveformHeader, CURRENT_VERSION};
use crate::envelope::{BitDepth, Envelope};
use crate::error::{ErrorKind, WaveformError};
use crate::reduce::{reduce_interleaved, Downmix, EmptyInput, ReduceConfig};
use crate::resample::resample;

/// Result code of every `jw_*` call
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwStatus {
    Ok = 0,
    InvalidConfiguration = 1,
    TruncatedInput = 2,
    BadMagic = 3,
    UnsupportedVersion = 4,
    CorruptData = 5,
    NullPointer = 6,
    Panic = 7,
}

impl From<&WaveformError> for JwStatus {
    fn from(err: &WaveformError) -> Self {
        match err.kind() {
            ErrorKind::InvalidConfiguration => JwStatus::InvalidConfiguration,
            ErrorKind::TruncatedInput => JwStatus::TruncatedInput,
            ErrorKind::BadMagic => JwStatus::BadMagic,
            ErrorKind::UnsupportedVersion => JwStatus::UnsupportedVersion,
            ErrorKind::CorruptData | ErrorKind::Json => JwStatus::CorruptData,
        }
    }
}

/// Reduction parameters as seen from C
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct JwReduceConfig {
    pub samples_per_point: u32,
    pub sample_rate: u32,
    /// 1 or 2
    pub channels: u16,
    /// 8 or 16
    pub bits: u8,
    /// 0 = average, 1 = drop
    pub downmix: u8,
    /// Non-zero rejects input without samples
    pub reject_empty: u8,
}

impl TryFrom<&JwReduceConfig> for ReduceConfig {
    type Error = WaveformError;

    fn try_from(raw: &JwReduceConfig) -> Result<Self, Self::Error> {
        let downmix = match raw.downmix {
            0 => Downmix::Average,
            1 => Downmix::Drop,
            other => {
                return Err(WaveformError::invalid(format!("unknown downmix mode {}", other)))
            }
        };
        let empty_input = if raw.reject_empty != 0 {
            EmptyInput::Reject
        } else {
            EmptyInput::Allow
        };
        Ok(ReduceConfig::new(raw.samples_per_point, raw.sample_rate)
            .with_channels(raw.channels)
            .with_bits(BitDepth::try_from(raw.bits)?)
            .with_downmix(downmix)
            .with_empty_input(empty_input))
    }
}

/// Opaque envelope handle
#[derive(Debug)]
pub struct JwEnvelope(Envelope);

fn guarded<F: FnOnce() -> Result<(), JwStatus>>(f: F) -> JwStatus {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => JwStatus::Ok,
        Ok(Err(status)) => status,
        Err(_) => JwStatus::Panic,
    }
}

fn status(err: WaveformError) -> JwStatus {
    JwStatus::from(&err)
}

fn into_handle(envelope: Envelope) -> *mut JwEnvelope {
    Box::into_raw(Box::new(JwEnvelope(envelope)))
}

/// Reduce `sample_count` interleaved samples into a new envelope.
///
/// # Safety
/// `samples` must point to `sample_count` readable values (it may be null
/// when `sample_count` is 0), `config` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn jw_reduce(
    samples: *const i32,
    sample_count: usize,
    source_channels: u16,
    config: *const JwReduceConfig,
    out: *mut *mut JwEnvelope,
) -> JwStatus {
    guarded(|| {
        if config.is_null() || out.is_null() || (samples.is_null() && sample_count > 0) {
            return Err(JwStatus::NullPointer);
        }
        // SAFETY: checked non-null above, validity is the caller's contract.
        let (config, samples) = unsafe {
            let samples = if sample_count == 0 {
                &[][..]
            } else {
                slice::from_raw_parts(samples, sample_count)
            };
            (&*config, samples)
        };
        let config = ReduceConfig::try_from(config).map_err(status)?;
        let envelope = reduce_interleaved(samples, source_channels, &config).map_err(status)?;
        // SAFETY: `out` is non-null and writable per the contract.
        unsafe { *out = into_handle(envelope) };
        Ok(())
    })
}

/// Decode an encoded buffer into a new envelope.
///
/// # Safety
/// `bytes` must point to `len` readable bytes (it may be null when `len` is
/// 0) and `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn jw_decode(
    bytes: *const u8,
    len: usize,
    out: *mut *mut JwEnvelope,
) -> JwStatus {
    guarded(|| {
        if out.is_null() || (bytes.is_null() && len > 0) {
            return Err(JwStatus::NullPointer);
        }
        let bytes = if len == 0 {
            &[][..]
        } else {
            // SAFETY: checked non-null, length is the caller's contract.
            unsafe { slice::from_raw_parts(bytes, len) }
        };
        let envelope = decode(bytes).map_err(status)?;
        // SAFETY: `out` is non-null and writable per the contract.
        unsafe { *out = into_handle(envelope) };
        Ok(())
    })
}

/// Encode an envelope. The buffer must be released with `jw_bytes_free`.
///
/// # Safety
/// `envelope` must be a live handle, `out_bytes` and `out_len` writable.
#[no_mangle]
pub unsafe extern "C" fn jw_encode(
    envelope: *const JwEnvelope,
    out_bytes: *mut *mut u8,
    out_len: *mut usize,
) -> JwStatus {
    guarded(|| {
        if envelope.is_null() || out_bytes.is_null() || out_len.is_null() {
            return Err(JwStatus::NullPointer);
        }
        // SAFETY: live handle per the contract.
        let envelope = unsafe { &(*envelope).0 };
        let bytes = encode(envelope).map_err(status)?.into_boxed_slice();
        let len = bytes.len();
        // SAFETY: both outputs are non-null and writable per the contract.
        unsafe {
            *out_bytes = Box::into_raw(bytes).cast::<u8>();
            *out_len = len;
        }
        Ok(())
    })
}

/// Derive a coarser envelope merging `factor` points into one.
///
/// # Safety
/// `envelope` must be a live handle and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn jw_resample(
    envelope: *const JwEnvelope,
    factor: u32,
    out: *mut *mut JwEnvelope,
) -> JwStatus {
    guarded(|| {
        if envelope.is_null() || out.is_null() {
            return Err(JwStatus::NullPointer);
        }
        // SAFETY: live handle per the contract.
        let source = unsafe { &(*envelope).0 };
        let coarse = resample(source, factor).map_err(status)?;
        // SAFETY: `out` is non-null and writable per the contract.
        unsafe { *out = into_handle(coarse) };
        Ok(())
    })
}

/// Fill `out` with the header the envelope encodes to.
///
/// # Safety
/// `envelope` must be a live handle and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn jw_envelope_header(
    envelope: *const JwEnvelope,
    out: *mut WaveformHeader,
) -> JwStatus {
    guarded(|| {
        if envelope.is_null() || out.is_null() {
            return Err(JwStatus::NullPointer);
        }
        // SAFETY: live handle per the contract.
        let envelope = unsafe { &(*envelope).0 };
        let header = WaveformHeader::for_envelope(envelope, CURRENT_VERSION).map_err(status)?;
        // SAFETY: `out` is non-null and writable per the contract.
        unsafe { *out = header };
        Ok(())
    })
}

/// Borrow the interleaved (min, max) values. Valid until the handle is freed.
///
/// # Safety
/// `envelope` must be a live handle or null; `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn jw_envelope_data(
    envelope: *const JwEnvelope,
    out_len: *mut usize,
) -> *const i16 {
    if envelope.is_null() || out_len.is_null() {
        return ptr::null();
    }
    // SAFETY: live handle and writable length per the contract.
    unsafe {
        let data = (*envelope).0.data();
        *out_len = data.len();
        data.as_ptr()
    }
}

/// Release an envelope handle. Null is ignored.
///
/// # Safety
/// `envelope` must come from a `jw_*` constructor and not be used again.
#[no_mangle]
pub unsafe extern "C" fn jw_envelope_free(envelope: *mut JwEnvelope) {
    if !envelope.is_null() {
        // SAFETY: ownership returns to Rust exactly once per the contract.
        drop(unsafe { Box::from_raw(envelope) });
    }
}

/// Release a buffer returned by `jw_encode`. Null is ignored.
///
/// # Safety
/// `bytes` and `len` must be exactly what `jw_encode` returned.
#[no_mangle]
pub unsafe extern "C" fn jw_bytes_free(bytes: *mut u8, len: usize) {
    if !bytes.is_null() {
        // SAFETY: reconstructs the boxed slice leaked by `jw_encode`.
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(bytes, len)) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(samples_per_point: u32) -> JwReduceConfig {
        JwReduceConfig {
            samples_per_point,
            sample_rate: 8000,
            channels: 1,
            bits: 16,
            downmix: 0,
            reject_empty: 0,
        }
    }

    #[test]
    fn test_reduce_encode_decode() {
        let samples = [0, 10, -5, 3, 7, -20, 15];
        let cfg = config(3);
        let mut handle = ptr::null_mut();

        unsafe {
            let status = jw_reduce(samples.as_ptr(), samples.len(), 1, &cfg, &mut handle);
            assert_eq!(status, JwStatus::Ok);

            let mut len = 0;
            let data = jw_envelope_data(handle, &mut len);
            assert_eq!(slice::from_raw_parts(data, len), &[-5, 10, -20, 7, 15, 15]);

            let mut header = std::mem::zeroed::<WaveformHeader>();
            assert_eq!(jw_envelope_header(handle, &mut header), JwStatus::Ok);
            assert_eq!(header.length, 3);
            assert_eq!(header.samples_per_point, 3);

            let mut bytes = ptr::null_mut();
            let mut byte_len = 0;
            assert_eq!(jw_encode(handle, &mut bytes, &mut byte_len), JwStatus::Ok);
            assert_eq!(byte_len, WaveformHeader::V2_LEN + 12);

            let mut decoded = ptr::null_mut();
            assert_eq!(jw_decode(bytes, byte_len, &mut decoded), JwStatus::Ok);
            assert_eq!((*decoded).0, (*handle).0);

            let mut coarse = ptr::null_mut();
            assert_eq!(jw_resample(decoded, 2, &mut coarse), JwStatus::Ok);
            assert_eq!((*coarse).0.data(), &[-20, 10, 15, 15]);

            jw_bytes_free(bytes, byte_len);
            jw_envelope_free(handle);
            jw_envelope_free(decoded);
            jw_envelope_free(coarse);
        }
    }

    #[test]
    fn test_error_statuses() {
        let mut handle = ptr::null_mut();
        unsafe {
            let bad = config(0);
            assert_eq!(
                jw_reduce(ptr::null(), 0, 1, &bad, &mut handle),
                JwStatus::InvalidConfiguration
            );
            assert_eq!(
                jw_reduce(ptr::null(), 4, 1, &config(1), &mut handle),
                JwStatus::NullPointer
            );

            let garbage = *b"NOPE\x02\x00\x00\x00";
            assert_eq!(
                jw_decode(garbage.as_ptr(), garbage.len(), &mut handle),
                JwStatus::BadMagic
            );
            assert_eq!(
                jw_decode(garbage.as_ptr(), 3, &mut handle),
                JwStatus::TruncatedInput
            );
            assert_eq!(
                jw_decode(ptr::null(), 0, &mut handle),
                JwStatus::TruncatedInput
            );
            assert_eq!(
                jw_decode(ptr::null(), 8, &mut handle),
                JwStatus::NullPointer
            );
            assert!(handle.is_null());

            let mut len = 0;
            assert!(jw_envelope_data(ptr::null(), &mut len).is_null());
            jw_envelope_free(ptr::null_mut());
            jw_bytes_free(ptr::null_mut(), 0);
        }
    }

    #[test]
    fn test_empty_input_policy() {
        let mut handle = ptr::null_mut();
        let mut reject = config(4);
        reject.reject_empty = 1;
        unsafe {
            assert_eq!(
                jw_reduce(ptr::null(), 0, 1, &reject, &mut handle),
                JwStatus::InvalidConfiguration
            );
            assert_eq!(jw_reduce(ptr::null(), 0, 1, &config(4), &mut handle), JwStatus::Ok);
            assert_eq!((*handle).0.len(), 0);
            jw_envelope_free(handle);
        }
    }
}
