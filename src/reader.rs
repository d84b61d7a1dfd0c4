//! The parsed view of a WAV buffer and its decoding entry points.

use std::ops::Range;
use std::time::Duration;

use aligned_vec::{AVec, CACHELINE_ALIGN};
use tracing::debug;

use crate::blocks::PcmBlocks;
use crate::chunk::{ChunkTable, FourCc};
use crate::format::{Compression, FormatDescriptor};
use crate::sample::{ConvertSample, SampleFormat};
use crate::{Error, Result};

/// A validated WAV file borrowed from a caller-owned buffer.
///
/// Construction does all of the checking; afterwards the value is read-only and
/// every decoding method takes `&self`, so one instance can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct ParsedWave<'a> {
    format: FormatDescriptor,
    sample_format: SampleFormat,
    data: &'a [u8],
    data_range: Range<usize>,
    pcm_count: usize,
    skipped: Vec<FourCc>,
}

impl<'a> ParsedWave<'a> {
    /// Parses `buf`, which must hold an entire RIFF/WAVE file.
    pub fn try_new(buf: &'a [u8]) -> Result<Self> {
        let table = ChunkTable::scan(buf)?;
        let format = FormatDescriptor::parse(&buf[table.format.clone()])?;
        let sample_format = format.sample_format()?;

        let bytes_per_sample = sample_format.bytes_per_sample();
        let data_range = table.data.clone();
        if data_range.len() % bytes_per_sample != 0 {
            return Err(Error::MisalignedData {
                size: data_range.len(),
                bytes_per_sample,
            });
        }

        let pcm_count = data_range.len() / bytes_per_sample;
        let skipped = table
            .spans
            .iter()
            .map(|span| span.id)
            .filter(|id| *id != FourCc::FORMAT && *id != FourCc::DATA)
            .collect();

        debug!(
            compression = ?format.compression,
            channels = format.channels,
            sample_rate = format.sample_rate,
            bits_per_sample = format.bits_per_sample,
            data_offset = data_range.start,
            pcm_count,
            "parsed wav"
        );

        Ok(Self {
            format,
            sample_format,
            data: &buf[data_range.clone()],
            data_range,
            pcm_count,
            skipped,
        })
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn compression(&self) -> Compression {
        self.format.compression
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.format.bits_per_sample
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    /// Number of raw samples in the data chunk, counting every channel.
    pub fn pcm_count(&self) -> usize {
        self.pcm_count
    }

    /// Number of whole frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.pcm_count / self.format.channels as usize
    }

    pub fn duration(&self) -> Duration {
        match self.format.sample_rate {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(self.frame_count() as f64 / rate as f64),
        }
    }

    /// The raw bytes of the data chunk.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Where the data chunk payload sits in the source buffer.
    pub fn data_range(&self) -> Range<usize> {
        self.data_range.clone()
    }

    /// Ids of the chunks that were skipped, in file order.
    pub fn skipped_chunks(&self) -> &[FourCc] {
        &self.skipped
    }

    /// Decodes up to `count` raw samples starting at raw sample `start` into
    /// `out[0..]` and returns how many were written.
    ///
    /// The result is `min(count, pcm_count - start)`, further capped by
    /// `out.len()`; a `start` at or past the end yields 0.
    pub fn decode(&self, out: &mut [i16], start: usize, count: usize) -> usize {
        let available = self.pcm_count.saturating_sub(start);
        let n = count.min(available).min(out.len());
        if n == 0 {
            return 0;
        }

        let width = self.sample_format.bytes_per_sample();
        let begin = start * width;
        let src = &self.data[begin..begin + n * width];
        self.sample_format.convert_into(src, &mut out[..n]);
        n
    }

    /// Decodes the whole data chunk into a cache-line aligned buffer.
    pub fn decode_all(&self) -> AVec<i16> {
        let mut out: AVec<i16> =
            AVec::from_iter(CACHELINE_ALIGN, std::iter::repeat(0i16).take(self.pcm_count));
        let written = self.decode(&mut out, 0, self.pcm_count);
        debug_assert_eq!(written, self.pcm_count);
        out
    }

    /// Iterates over the decoded data in blocks of at most `block_len` samples.
    pub fn blocks(&self, block_len: usize) -> PcmBlocks<'_, 'a> {
        PcmBlocks::new(self, block_len)
    }
}
