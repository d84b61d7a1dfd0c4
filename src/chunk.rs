//! RIFF envelope validation and chunk table traversal.

use std::fmt;
use std::ops::Range;

use tracing::{trace, warn};

use crate::{Error, Result};

/// A four character chunk identifier such as `fmt ` or `data`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const WAVE: FourCc = FourCc(*b"WAVE");
    pub const FORMAT: FourCc = FourCc(*b"fmt ");
    pub const DATA: FourCc = FourCc(*b"data");
    pub const WAVE_LIST: FourCc = FourCc(*b"wavl");
    pub const SILENCE: FourCc = FourCc(*b"slnt");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}

/// Enum for identifying chunk types based on their ID.
enum ChunkType {
    Format,
    Data,
    Streaming,
    Unknown,
}

impl ChunkType {
    fn from_id(id: FourCc) -> Self {
        match id {
            FourCc::FORMAT => ChunkType::Format,
            FourCc::DATA => ChunkType::Data,
            FourCc::WAVE_LIST | FourCc::SILENCE => ChunkType::Streaming,
            _ => ChunkType::Unknown,
        }
    }
}

/// One chunk visited while walking the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub id: FourCc,
    /// Offset of the chunk header in the buffer.
    pub offset: usize,
    /// Declared payload size, without the padding byte.
    pub size: u32,
}

impl ChunkSpan {
    /// Bytes the chunk occupies: header, payload and the pad byte for odd sizes.
    pub fn span(&self) -> usize {
        8 + self.size as usize + (self.size as usize % 2)
    }

    pub fn payload(&self) -> Range<usize> {
        let start = self.offset + 8;
        start..start + self.size as usize
    }
}

/// Result of a successful scan: where the two required chunks live.
#[derive(Debug, Clone)]
pub struct ChunkTable {
    pub format: Range<usize>,
    pub data: Range<usize>,
    /// Every chunk traversed, in file order.
    pub spans: Vec<ChunkSpan>,
}

impl ChunkTable {
    const HEADER_LEN: usize = 12;

    /// Validates the RIFF envelope of `buf` and locates its `fmt ` and `data` chunks.
    pub fn scan(buf: &[u8]) -> Result<Self> {
        let mut parser = ChunkParser::new(buf);
        parser.read_header()?;

        let mut format: Option<Range<usize>> = None;
        let mut data: Option<Range<usize>> = None;

        let spans = parser.parse_chunks(|chunk| {
            match ChunkType::from_id(chunk.id) {
                ChunkType::Format => {
                    if format.replace(chunk.payload()).is_some() {
                        return Err(Error::DuplicateChunk(chunk.id));
                    }
                }
                ChunkType::Data => {
                    if data.replace(chunk.payload()).is_some() {
                        return Err(Error::DuplicateChunk(chunk.id));
                    }
                }
                ChunkType::Streaming => return Err(Error::UnsupportedChunk(chunk.id)),
                ChunkType::Unknown => {
                    warn!(id = %chunk.id, size = chunk.size, "ignoring wav chunk");
                }
            }
            Ok(())
        })?;

        Ok(Self {
            format: format.ok_or(Error::MissingChunk(FourCc::FORMAT))?,
            data: data.ok_or(Error::MissingChunk(FourCc::DATA))?,
            spans,
        })
    }

    /// Total bytes covered by the outer header and every traversed chunk.
    pub fn covered_len(&self) -> usize {
        Self::HEADER_LEN + self.spans.iter().map(ChunkSpan::span).sum::<usize>()
    }
}

/// Walks the chunks of an in-memory RIFF buffer.
struct ChunkParser<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> ChunkParser<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Reads exactly `N` bytes at the cursor, or `None` past the end.
    fn read_exact<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.buf.get(self.cursor..self.cursor + N)?;
        self.cursor += N;
        bytes.try_into().ok()
    }

    #[inline]
    fn read_u32_le(&mut self) -> Option<u32> {
        self.read_exact::<4>().map(u32::from_le_bytes)
    }

    /// Checks `"RIFF" <len - 8> "WAVE"`.
    fn read_header(&mut self) -> Result<()> {
        let len = self.buf.len();
        let truncated = || Error::TruncatedHeader(len);

        let riff = self.read_exact::<4>().ok_or_else(truncated)?;
        if FourCc(riff) != FourCc::RIFF {
            return Err(Error::InvalidRiffMagic);
        }

        let declared = self.read_u32_le().ok_or_else(truncated)?;
        let expected = len - 8;
        if declared as usize != expected {
            return Err(Error::RiffSizeMismatch { declared, expected });
        }

        let wave = self.read_exact::<4>().ok_or_else(truncated)?;
        if FourCc(wave) != FourCc::WAVE {
            return Err(Error::InvalidWaveMagic);
        }
        Ok(())
    }

    /// Visits every chunk until the cursor lands exactly on the end of the buffer.
    fn parse_chunks<F>(&mut self, mut f: F) -> Result<Vec<ChunkSpan>>
    where
        F: FnMut(&ChunkSpan) -> Result<()>,
    {
        let len = self.buf.len();
        let mut spans = Vec::new();

        while self.cursor < len {
            let offset = self.cursor;
            let truncated = || Error::TruncatedChunkTable { offset, len };

            let id = FourCc(self.read_exact::<4>().ok_or_else(truncated)?);
            let size = self.read_u32_le().ok_or_else(truncated)?;
            let chunk = ChunkSpan { id, offset, size };
            trace!(%id, offset, size, "chunk");

            if matches!(ChunkType::from_id(id), ChunkType::Streaming) {
                return Err(Error::UnsupportedChunk(id));
            }

            let remaining = self.remaining();
            if size as usize > remaining {
                return Err(Error::ChunkOverflow {
                    id,
                    offset,
                    size,
                    remaining,
                });
            }

            let end = offset + chunk.span();
            if end > len {
                return Err(truncated());
            }

            f(&chunk)?;
            spans.push(chunk);
            self.cursor = end;
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pcm16_mono, WavBuilder};

    fn minimal() -> Vec<u8> {
        pcm16_mono(&[1, -1, i16::MIN, i16::MAX])
    }

    #[test]
    fn test_scan_minimal() {
        let buf = minimal();
        let table = ChunkTable::scan(&buf).expect("valid buffer");
        assert_eq!(table.format, 20..36);
        assert_eq!(table.data, 44..52);
        assert_eq!(table.spans.len(), 2);
        assert_eq!(table.covered_len(), buf.len());
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let buf = WavBuilder::new()
            .chunk(b"LIST", b"INFOabc") // odd size, padded
            .fmt(1, 2, 44100, 16)
            .chunk(b"fact", &4u32.to_le_bytes())
            .data(&[0; 8])
            .build();
        let table = ChunkTable::scan(&buf).expect("valid buffer");
        let ids: Vec<_> = table.spans.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            [FourCc(*b"LIST"), FourCc::FORMAT, FourCc(*b"fact"), FourCc::DATA]
        );
        assert_eq!(table.covered_len(), buf.len());
        assert_eq!(&buf[table.data.clone()], &[0; 8]);
    }

    #[test]
    fn test_odd_data_chunk_is_padded() {
        let buf = WavBuilder::new().fmt(1, 1, 8000, 8).data(&[1, 2, 3]).build();
        let table = ChunkTable::scan(&buf).expect("valid buffer");
        assert_eq!(table.data.len(), 3);
        assert_eq!(table.covered_len(), buf.len());
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            ChunkTable::scan(b"RIFF"),
            Err(Error::TruncatedHeader(4))
        ));
        assert!(matches!(
            ChunkTable::scan(&[]),
            Err(Error::TruncatedHeader(0))
        ));
    }

    #[test]
    fn test_invalid_riff_header() {
        let mut buf = minimal();
        buf[0..4].copy_from_slice(b"FAIL");
        assert!(matches!(ChunkTable::scan(&buf), Err(Error::InvalidRiffMagic)));
    }

    #[test]
    fn test_invalid_wave_header() {
        let mut buf = minimal();
        buf[8..12].copy_from_slice(b"FAIL");
        assert!(matches!(ChunkTable::scan(&buf), Err(Error::InvalidWaveMagic)));
    }

    #[test]
    fn test_riff_size_off_by_one() {
        let mut buf = minimal();
        let expected = buf.len() - 8;
        buf[4..8].copy_from_slice(&(expected as u32 + 1).to_le_bytes());
        match ChunkTable::scan(&buf) {
            Err(Error::RiffSizeMismatch { declared, expected: e }) => {
                assert_eq!(declared as usize, expected + 1);
                assert_eq!(e, expected);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }

        buf[4..8].copy_from_slice(&(expected as u32 - 1).to_le_bytes());
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::RiffSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_data_chunk() {
        let buf = WavBuilder::new()
            .fmt(1, 1, 8000, 16)
            .data(&[0; 4])
            .data(&[0; 4])
            .build();
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::DuplicateChunk(FourCc::DATA))
        ));
    }

    #[test]
    fn test_duplicate_format_chunk() {
        let buf = WavBuilder::new()
            .fmt(1, 1, 8000, 16)
            .fmt(1, 1, 8000, 16)
            .data(&[0; 4])
            .build();
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::DuplicateChunk(FourCc::FORMAT))
        ));
    }

    #[test]
    fn test_streaming_chunks_rejected() {
        for id in [b"wavl", b"slnt"] {
            let buf = WavBuilder::new()
                .fmt(1, 1, 8000, 16)
                .chunk(id, &[0; 4])
                .data(&[0; 4])
                .build();
            match ChunkTable::scan(&buf) {
                Err(Error::UnsupportedChunk(found)) => assert_eq!(found.as_bytes(), id),
                other => panic!("expected unsupported chunk, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_chunks() {
        let buf = WavBuilder::new().data(&[0; 4]).build();
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::MissingChunk(FourCc::FORMAT))
        ));

        let buf = WavBuilder::new().fmt(1, 1, 8000, 16).build();
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::MissingChunk(FourCc::DATA))
        ));

        let buf = WavBuilder::new().build();
        assert_eq!(buf.len(), 12);
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::MissingChunk(_))
        ));
    }

    #[test]
    fn test_chunk_size_exceeds_buffer() {
        let mut buf = minimal();
        // data chunk header sits at offset 36
        buf[40..44].copy_from_slice(&9u32.to_le_bytes());
        match ChunkTable::scan(&buf) {
            Err(Error::ChunkOverflow {
                id,
                offset,
                size,
                remaining,
            }) => {
                assert_eq!(id, FourCc::DATA);
                assert_eq!(offset, 36);
                assert_eq!(size, 9);
                assert_eq!(remaining, 8);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_pad_byte_overshoots() {
        let mut buf = WavBuilder::new().fmt(1, 1, 8000, 8).data(&[1, 2, 3]).build();
        buf.pop();
        let riff_size = (buf.len() - 8) as u32;
        buf[4..8].copy_from_slice(&riff_size.to_le_bytes());
        assert!(matches!(
            ChunkTable::scan(&buf),
            Err(Error::TruncatedChunkTable { .. })
        ));
    }

    #[test]
    fn test_trailing_partial_header() {
        let mut buf = minimal();
        buf.extend_from_slice(b"jun");
        let riff_size = (buf.len() - 8) as u32;
        buf[4..8].copy_from_slice(&riff_size.to_le_bytes());
        match ChunkTable::scan(&buf) {
            Err(Error::TruncatedChunkTable { offset, len }) => {
                assert_eq!(offset, 52);
                assert_eq!(len, 55);
            }
            other => panic!("expected truncated table, got {other:?}"),
        }
    }

    #[test]
    fn test_fourcc_display() {
        assert_eq!(FourCc::FORMAT.to_string(), "fmt ");
        assert_eq!(FourCc([b'a', 0, b'b', 0xff]).to_string(), "a\\x00b\\xff");
    }
}
