//! Binary codec
//!
//! Layout, all integers little-endian:
//!
//! | field             | width | version |
//! |-------------------|-------|---------|
//! | magic `JWAV`      | 4     | all     |
//! | version           | i32   | all     |
//! | flags             | i32   | all     |
//! | sample_rate       | i32   | all     |
//! | samples_per_point | i32   | all     |
//! | length            | i32   | all     |
//! | channels          | i32   | 2       |
//! | data              | `length * channels * 2` values of 1 or 2 bytes |
//!
//! Flag bit 0 selects 8-bit values. Version 1 has no channel field and is
//! always mono.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::envelope::{BitDepth, Envelope};
use crate::error::WaveformError;

/// Format identifier
pub const MAGIC: [u8; 4] = *b"JWAV";

/// Legacy mono layout
pub const VERSION_1: i32 = 1;

/// Layout with an explicit channel count
pub const VERSION_2: i32 = 2;

/// Version written by [`encode`]
pub const CURRENT_VERSION: i32 = VERSION_2;

const FLAG_8_BIT: i32 = 1;

/// Fixed-size file header.
///
/// The field order and widths match the on-disk layout, so native callers can
/// use this struct directly as the header view of an encoded buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformHeader {
    pub magic: [u8; 4],
    pub version: i32,
    pub flags: i32,
    pub sample_rate: i32,
    pub samples_per_point: i32,
    pub length: i32,
    pub channels: i32,
}

impl WaveformHeader {
    pub const V1_LEN: usize = 24;
    pub const V2_LEN: usize = 28;

    /// Header describing `envelope` in the given layout version.
    pub fn for_envelope(envelope: &Envelope, version: i32) -> Result<Self, WaveformError> {
        if version != VERSION_1 && version != VERSION_2 {
            return Err(WaveformError::UnsupportedVersion(version));
        }
        if version == VERSION_1 && envelope.channels() != 1 {
            return Err(WaveformError::invalid(
                "version 1 layout only stores mono envelopes",
            ));
        }

        Ok(Self {
            magic: MAGIC,
            version,
            flags: match envelope.bits() {
                BitDepth::Eight => FLAG_8_BIT,
                BitDepth::Sixteen => 0,
            },
            sample_rate: to_i32(envelope.sample_rate(), "sample rate")?,
            samples_per_point: to_i32(envelope.samples_per_point(), "samples per point")?,
            length: to_i32(envelope.len(), "length")?,
            channels: i32::from(envelope.channels()),
        })
    }

    /// Parse and validate a header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, WaveformError> {
        if bytes.len() < 8 {
            return Err(WaveformError::TruncatedInput {
                expected: 8,
                actual: bytes.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if magic != MAGIC {
            return Err(WaveformError::BadMagic(magic));
        }

        let version = LittleEndian::read_i32(&bytes[4..8]);
        let header_len = match version {
            VERSION_1 => Self::V1_LEN,
            VERSION_2 => Self::V2_LEN,
            other => return Err(WaveformError::UnsupportedVersion(other)),
        };
        if bytes.len() < header_len {
            return Err(WaveformError::TruncatedInput {
                expected: header_len,
                actual: bytes.len(),
            });
        }

        let field = |i: usize| LittleEndian::read_i32(&bytes[8 + i * 4..12 + i * 4]);
        let header = Self {
            magic,
            version,
            flags: field(0),
            sample_rate: field(1),
            samples_per_point: field(2),
            length: field(3),
            channels: if version == VERSION_1 { 1 } else { field(4) },
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<(), WaveformError> {
        if self.sample_rate <= 0 {
            return Err(WaveformError::corrupt(format!(
                "sample rate {} is not positive",
                self.sample_rate
            )));
        }
        if self.samples_per_point <= 0 {
            return Err(WaveformError::corrupt(format!(
                "samples per point {} is not positive",
                self.samples_per_point
            )));
        }
        if self.length < 0 {
            return Err(WaveformError::corrupt(format!("negative length {}", self.length)));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(WaveformError::corrupt(format!(
                "channel count {} is not 1 or 2",
                self.channels
            )));
        }
        Ok(())
    }

    pub fn header_len(&self) -> usize {
        if self.version == VERSION_1 {
            Self::V1_LEN
        } else {
            Self::V2_LEN
        }
    }

    pub fn bits(&self) -> BitDepth {
        if self.flags & FLAG_8_BIT != 0 {
            BitDepth::Eight
        } else {
            BitDepth::Sixteen
        }
    }

    /// Number of min/max values in the body
    pub fn value_count(&self) -> Option<usize> {
        usize::try_from(self.length)
            .ok()?
            .checked_mul(usize::try_from(self.channels).ok()?)?
            .checked_mul(2)
    }

    /// Body size in bytes
    pub fn body_len(&self) -> Option<usize> {
        self.value_count()?.checked_mul(self.bits().bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.header_len()];
        buf[..4].copy_from_slice(&self.magic);
        let mut fields = vec![
            self.version,
            self.flags,
            self.sample_rate,
            self.samples_per_point,
            self.length,
        ];
        if self.version != VERSION_1 {
            fields.push(self.channels);
        }
        LittleEndian::write_i32_into(&fields, &mut buf[4..]);
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

fn to_i32<T>(value: T, what: &str) -> Result<i32, WaveformError>
where
    T: Copy + std::fmt::Display + TryInto<i32>,
{
    value
        .try_into()
        .map_err(|_| WaveformError::invalid(format!("{} {} does not fit the header", what, value)))
}

/// Validated view over an encoded envelope.
///
/// Values are read straight from the borrowed body bytes.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeView<'a> {
    header: WaveformHeader,
    body: &'a [u8],
}

impl<'a> EnvelopeView<'a> {
    pub fn header(&self) -> &WaveformHeader {
        &self.header
    }

    /// Raw body bytes
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Number of points
    pub fn len(&self) -> usize {
        // Validated non-negative on parse.
        self.header.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.length == 0
    }

    /// Value at `index` in the interleaved (min, max) sequence
    pub fn get(&self, index: usize) -> Option<i16> {
        match self.header.bits() {
            BitDepth::Eight => self.body.get(index).map(|&b| i16::from(b as i8)),
            BitDepth::Sixteen => {
                let start = index.checked_mul(2)?;
                self.body
                    .get(start..start.checked_add(2)?)
                    .map(LittleEndian::read_i16)
            }
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = i16> + 'a {
        let bytes = self.header.bits().bytes();
        self.body.chunks_exact(bytes).map(move |chunk| match bytes {
            1 => i16::from(chunk[0] as i8),
            _ => LittleEndian::read_i16(chunk),
        })
    }

    /// Materialize an owned envelope.
    pub fn to_envelope(&self) -> Envelope {
        Envelope::from_parts(
            self.header.sample_rate as u32,
            self.header.samples_per_point as u32,
            self.header.channels as u16,
            self.header.bits(),
            self.iter().collect(),
        )
    }
}

/// Serialize an envelope in the current layout.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, WaveformError> {
    encode_version(envelope, CURRENT_VERSION)
}

/// Serialize an envelope in a specific layout version.
pub fn encode_version(envelope: &Envelope, version: i32) -> Result<Vec<u8>, WaveformError> {
    let header = WaveformHeader::for_envelope(envelope, version)?;
    let mut buf = header.to_bytes();
    let data = envelope.data();

    match envelope.bits() {
        BitDepth::Eight => buf.extend(data.iter().map(|&v| v as i8 as u8)),
        BitDepth::Sixteen => {
            let start = buf.len();
            buf.resize(start + data.len() * 2, 0);
            LittleEndian::write_i16_into(data, &mut buf[start..]);
        }
    }
    Ok(buf)
}

/// Validate `bytes` and borrow its body without copying.
///
/// Bytes after the declared body are ignored.
pub fn decode_view(bytes: &[u8]) -> Result<EnvelopeView<'_>, WaveformError> {
    let header = WaveformHeader::parse(bytes)?;
    let start = header.header_len();
    let end = header
        .body_len()
        .and_then(|len| len.checked_add(start))
        .ok_or_else(|| WaveformError::corrupt(format!("length {} overflows", header.length)))?;
    if bytes.len() < end {
        return Err(WaveformError::TruncatedInput {
            expected: end,
            actual: bytes.len(),
        });
    }

    let view = EnvelopeView {
        header,
        body: &bytes[start..end],
    };

    let channels = header.channels as usize;
    let mut values = view.iter();
    let mut pair = 0usize;
    while let (Some(min), Some(max)) = (values.next(), values.next()) {
        if min > max {
            return Err(WaveformError::corrupt(format!(
                "point {} channel {} has min {} > max {}",
                pair / channels,
                pair % channels,
                min,
                max
            )));
        }
        pair += 1;
    }

    Ok(view)
}

/// Deserialize an envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope, WaveformError> {
    Ok(decode_view(bytes)?.to_envelope())
}
