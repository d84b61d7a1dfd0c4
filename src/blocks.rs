//! Block-wise decoding over a [`ParsedWave`].

use aligned_vec::{AVec, CACHELINE_ALIGN};
use fallible_streaming_iterator::FallibleStreamingIterator;

use crate::reader::ParsedWave;
use crate::Error;

/// Decodes a data chunk in blocks, yielding slices of one reused aligned buffer.
///
/// Blocks always hold whole frames. Every block has `block_len` samples except
/// possibly the last.
pub struct PcmBlocks<'r, 'a> {
    wave: &'r ParsedWave<'a>,
    // Raw sample index of the next block
    position: usize,
    // Samples held by the current block
    filled: usize,
    buffer: AVec<i16>,
}

impl<'r, 'a> PcmBlocks<'r, 'a> {
    /// `block_len` is rounded down to a whole number of frames, with a minimum of one frame.
    pub(crate) fn new(wave: &'r ParsedWave<'a>, block_len: usize) -> Self {
        let channels = wave.channels() as usize;
        let block_len = (block_len / channels).max(1) * channels;
        let buffer: AVec<i16> =
            AVec::from_iter(CACHELINE_ALIGN, std::iter::repeat(0i16).take(block_len));

        Self {
            wave,
            position: 0,
            filled: 0,
            buffer,
        }
    }

    /// Samples per full block.
    pub fn block_len(&self) -> usize {
        self.buffer.len()
    }

    /// Raw sample index where the current block starts.
    pub fn block_start(&self) -> usize {
        self.position - self.filled
    }
}

impl FallibleStreamingIterator for PcmBlocks<'_, '_> {
    type Item = [i16];
    type Error = Error;

    fn advance(&mut self) -> Result<(), Self::Error> {
        let len = self.buffer.len();
        self.filled = self.wave.decode(&mut self.buffer, self.position, len);
        self.position += self.filled;
        Ok(())
    }

    fn get(&self) -> Option<&Self::Item> {
        if self.filled > 0 {
            Some(&self.buffer[..self.filled])
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.wave.pcm_count() - self.position;
        let blocks = remaining.div_ceil(self.buffer.len());
        (blocks, Some(blocks))
    }
}
