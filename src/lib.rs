//! In-memory RIFF/WAVE parsing and normalization to 16-bit signed PCM.
//!
//! The crate works on a byte buffer that is already loaded. [`ParsedWave::try_new`]
//! walks the chunk table, validates the `fmt ` chunk and borrows the `data` chunk;
//! [`ParsedWave::decode`] then converts any run of raw samples into `i16`.
//!
//! ```no_run
//! use wave_pcm::ParsedWave;
//!
//! let bytes = std::fs::read("input.wav")?;
//! let wave = ParsedWave::try_new(&bytes)?;
//!
//! let mut pcm = vec![0i16; wave.pcm_count()];
//! let written = wave.decode(&mut pcm, 0, wave.pcm_count());
//! assert_eq!(written, wave.pcm_count());
//! # Ok::<(), wave_pcm::Error>(())
//! ```

use std::io;
use std::path::Path;

pub mod blocks;
pub mod chunk;
pub mod format;
pub mod reader;
pub mod sample;

pub use blocks::PcmBlocks;
pub use chunk::{ChunkSpan, ChunkTable, FourCc};
pub use fallible_streaming_iterator::FallibleStreamingIterator;
pub use format::{Compression, FormatDescriptor};
pub use reader::ParsedWave;
pub use sample::{ConvertSample, SampleFormat};

/// Every way a buffer can be rejected while building a [`ParsedWave`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("buffer of {0} bytes is too short for a RIFF header")]
    TruncatedHeader(usize),
    #[error("invalid RIFF header")]
    InvalidRiffMagic,
    #[error("RIFF size field is {declared}, expected {expected} (buffer length - 8)")]
    RiffSizeMismatch { declared: u32, expected: usize },
    #[error("invalid WAVE header")]
    InvalidWaveMagic,
    #[error("duplicate <{0}> chunk")]
    DuplicateChunk(FourCc),
    #[error("missing <{0}> chunk")]
    MissingChunk(FourCc),
    #[error("unsupported <{0}> chunk")]
    UnsupportedChunk(FourCc),
    #[error("chunk <{id}> at offset {offset} declares {size} bytes but only {remaining} remain")]
    ChunkOverflow {
        id: FourCc,
        offset: usize,
        size: u32,
        remaining: usize,
    },
    #[error("chunk table does not end on the buffer boundary (offset {offset}, buffer length {len})")]
    TruncatedChunkTable { offset: usize, len: usize },
    #[error("format chunk is {0} bytes, at least 16 are required")]
    FormatChunkTooShort(usize),
    #[error("unsupported compression code {0} (only 1 = PCM and 3 = IEEE float are supported)")]
    UnsupportedCompression(u16),
    #[error("unsupported channel count {0} (only mono and stereo are supported)")]
    UnsupportedChannelCount(u16),
    #[error("unsupported bit depth {0}")]
    UnsupportedBitDepth(u16),
    #[error("unsupported encoding: {compression:?} with {bits_per_sample} bits per sample")]
    UnsupportedEncoding {
        compression: Compression,
        bits_per_sample: u16,
    },
    #[error("block align is {block_align}, expected {expected} (bytes per sample * channels)")]
    BlockAlignMismatch { block_align: u16, expected: u32 },
    #[error("data chunk of {size} bytes is not a whole number of {bytes_per_sample}-byte samples")]
    MisalignedData { size: usize, bytes_per_sample: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Specialized `Result` type for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reads a whole file into memory so it can be handed to [`ParsedWave::try_new`].
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}
