use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wave_pcm::*;

/// Inspect a WAV file and decode it to 16-bit PCM
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WAV file to read
    path: PathBuf,

    /// Samples per decoded block when scanning the whole file
    #[arg(short, long, default_value_t = 4096)]
    block_len: usize,

    /// Print decoded samples starting at this raw sample index
    #[arg(long)]
    start: Option<usize>,

    /// Number of samples to print with --start
    #[arg(long, default_value_t = 16)]
    count: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let bytes = read_file(&args.path)?;
    println!("File size: {}", bytes.len());

    let wave = ParsedWave::try_new(&bytes)?;
    println!("Channels: {}", wave.channels());
    println!("Sample rate: {}", wave.sample_rate());
    println!("Bits per sample: {}", wave.bits_per_sample());
    println!("Pcm count: {}", wave.pcm_count());
    println!("Frame count: {}", wave.frame_count());
    println!("Duration: {:.3}s", wave.duration().as_secs_f64());

    if let Some(start) = args.start {
        let mut out = vec![0i16; args.count];
        let n = wave.decode(&mut out, start, args.count);
        println!("Samples [{start}..{}]: {:?}", start + n, &out[..n]);
        return Ok(());
    }

    let time = std::time::Instant::now();
    let mut peak = 0u16;
    let mut decoded = 0usize;
    let mut blocks = wave.blocks(args.block_len);
    while let Some(block) = blocks.next()? {
        decoded += block.len();
        peak = block.iter().fold(peak, |p, s| p.max(s.unsigned_abs()));
    }
    tracing::info!(decoded, elapsed = ?time.elapsed(), "decoded");
    println!("Peak: {peak}");

    Ok(())
}
