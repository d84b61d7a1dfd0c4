//! The `fmt ` chunk: fixed layout, typed fields and their validation.

use bytemuck::{Pod, Zeroable};

use crate::sample::SampleFormat;
use crate::{Error, Result};

/// Sample encodings accepted in the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// Linear integer PCM.
    RawPcm = 1,
    /// IEEE-754 floating point PCM.
    FloatPcm = 3,
}

impl TryFrom<u16> for Compression {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        match code {
            1 => Ok(Compression::RawPcm),
            3 => Ok(Compression::FloatPcm),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

/// The first 16 bytes of a `fmt ` payload, exactly as stored (little-endian).
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct RawFormat {
    compression: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl RawFormat {
    const LEN: usize = std::mem::size_of::<RawFormat>();

    fn read(payload: &[u8]) -> Result<Self> {
        let bytes = payload
            .get(..Self::LEN)
            .ok_or(Error::FormatChunkTooShort(payload.len()))?;
        let raw: RawFormat = bytemuck::pod_read_unaligned(bytes);
        Ok(Self {
            compression: u16::from_le(raw.compression),
            channels: u16::from_le(raw.channels),
            sample_rate: u32::from_le(raw.sample_rate),
            byte_rate: u32::from_le(raw.byte_rate),
            block_align: u16::from_le(raw.block_align),
            bits_per_sample: u16::from_le(raw.bits_per_sample),
        })
    }
}

/// Validated contents of the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub compression: Compression,
    pub channels: u16,
    pub sample_rate: u32,
    /// Average bytes per second as declared; informational only.
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatDescriptor {
    /// Parses and validates a `fmt ` payload. Bytes past the first 16 are ignored.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let raw = RawFormat::read(payload)?;

        let compression = Compression::try_from(raw.compression)?;

        if !(1..=2).contains(&raw.channels) {
            return Err(Error::UnsupportedChannelCount(raw.channels));
        }

        let bits = raw.bits_per_sample;
        if bits == 0 || bits % 8 != 0 || bits / 8 > 4 {
            return Err(Error::UnsupportedBitDepth(bits));
        }

        let expected = (bits / 8) as u32 * raw.channels as u32;
        if expected != raw.block_align as u32 {
            return Err(Error::BlockAlignMismatch {
                block_align: raw.block_align,
                expected,
            });
        }

        let format = Self {
            compression,
            channels: raw.channels,
            sample_rate: raw.sample_rate,
            byte_rate: raw.byte_rate,
            block_align: raw.block_align,
            bits_per_sample: bits,
        };
        // Rejects float PCM narrower than 32 bits.
        format.sample_format()?;
        Ok(format)
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// The conversion variant matching this compression and width.
    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::new(self.compression, self.bits_per_sample)
    }
}
