//! Raw sample encodings and their conversion to normalized `i16`.
//!
//! Each supported (compression, width) pair is a unit type implementing
//! [`ConvertSample`]; [`SampleFormat`] is the closed set of them. The scaling
//! used for 24- and 32-bit integers (`1/255` and `1/65535`) is not a linear map
//! onto the 16-bit range. It is kept as is so output stays identical to files
//! already decoded with it.

use enum_dispatch::enum_dispatch;

use crate::format::Compression;
use crate::{Error, Result};

const INV_255: f64 = 1.0 / 255.0;
const INV_65535: f64 = 1.0 / 65535.0;
const FLOAT_SCALE: f32 = 0x7FFF as f32;

/// Conversion of one raw sample encoding into normalized 16-bit PCM.
#[enum_dispatch]
pub trait ConvertSample {
    /// Number of bytes a single raw sample occupies.
    fn bytes_per_sample(&self) -> usize;

    /// Converts one raw sample; `raw` holds exactly [`bytes_per_sample`] bytes.
    ///
    /// [`bytes_per_sample`]: ConvertSample::bytes_per_sample
    fn convert(&self, raw: &[u8]) -> i16;

    /// Converts as many whole samples as fit in both `src` and `dst`.
    fn convert_into(&self, src: &[u8], dst: &mut [i16]) {
        for (out, raw) in dst.iter_mut().zip(src.chunks_exact(self.bytes_per_sample())) {
            *out = self.convert(raw);
        }
    }
}

/// Unsigned 8-bit PCM, biased around 127.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uint8Pcm;

impl ConvertSample for Uint8Pcm {
    #[inline]
    fn bytes_per_sample(&self) -> usize {
        1
    }

    /// `(v - 127) * 256`. Byte 255 would land on 32768, so it is held at the
    /// highest step that fits, `127 * 256`.
    #[inline]
    fn convert(&self, raw: &[u8]) -> i16 {
        let v = raw[0].min(254) as i16;
        (v - 127) * 256
    }
}

/// Signed 16-bit little-endian PCM, copied through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Int16Pcm;

impl ConvertSample for Int16Pcm {
    #[inline]
    fn bytes_per_sample(&self) -> usize {
        2
    }

    #[inline]
    fn convert(&self, raw: &[u8]) -> i16 {
        i16::from_le_bytes([raw[0], raw[1]])
    }

    fn convert_into(&self, src: &[u8], dst: &mut [i16]) {
        let n = dst.len().min(src.len() / 2);
        if cfg!(target_endian = "little") {
            bytemuck::cast_slice_mut::<i16, u8>(&mut dst[..n]).copy_from_slice(&src[..n * 2]);
        } else {
            for (out, raw) in dst[..n].iter_mut().zip(src.chunks_exact(2)) {
                *out = self.convert(raw);
            }
        }
    }
}

/// Signed 24-bit little-endian PCM, packed in 3 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Int24Pcm;

impl Int24Pcm {
    const SIGN_BIT: u32 = 0x80_0000;

    /// Moves bit 23 to bit 31 and leaves the low 23 bits untouched.
    ///
    /// This is not a two's complement sign extension: `0xFFFFFF` (-1) becomes
    /// `0x807F_FFFF`.
    #[inline]
    pub fn widen(raw: [u8; 3]) -> i32 {
        let mut acc = u32::from_le_bytes([raw[0], raw[1], raw[2], 0]);
        let sign = (acc & Self::SIGN_BIT) >> 16;
        debug_assert!(sign == 0 || sign == 0x80);
        acc &= !Self::SIGN_BIT;
        (acc | (sign << 24)) as i32
    }
}

impl ConvertSample for Int24Pcm {
    #[inline]
    fn bytes_per_sample(&self) -> usize {
        3
    }

    #[inline]
    fn convert(&self, raw: &[u8]) -> i16 {
        let value = Self::widen([raw[0], raw[1], raw[2]]);
        (value as f64 * INV_255) as i16
    }
}

/// Signed 32-bit little-endian PCM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Int32Pcm;

impl ConvertSample for Int32Pcm {
    #[inline]
    fn bytes_per_sample(&self) -> usize {
        4
    }

    #[inline]
    fn convert(&self, raw: &[u8]) -> i16 {
        let value = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        (value as f64 * INV_65535) as i16
    }
}

/// IEEE-754 32-bit float PCM, nominally in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Float32Pcm;

impl ConvertSample for Float32Pcm {
    #[inline]
    fn bytes_per_sample(&self) -> usize {
        4
    }

    #[inline]
    fn convert(&self, raw: &[u8]) -> i16 {
        let value = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        (value * FLOAT_SCALE) as i16
    }
}

/// The supported raw sample encodings.
#[enum_dispatch(ConvertSample)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Uint8(Uint8Pcm),
    Int16(Int16Pcm),
    Int24(Int24Pcm),
    Int32(Int32Pcm),
    Float32(Float32Pcm),
}

impl SampleFormat {
    /// Resolves the variant for a compression kind and bit depth.
    pub fn new(compression: Compression, bits_per_sample: u16) -> Result<Self> {
        Ok(match (compression, bits_per_sample) {
            (Compression::RawPcm, 8) => Uint8Pcm.into(),
            (Compression::RawPcm, 16) => Int16Pcm.into(),
            (Compression::RawPcm, 24) => Int24Pcm.into(),
            (Compression::RawPcm, 32) => Int32Pcm.into(),
            (Compression::FloatPcm, 32) => Float32Pcm.into(),
            _ => {
                return Err(Error::UnsupportedEncoding {
                    compression,
                    bits_per_sample,
                })
            }
        })
    }
}
