//! Slice pool stress driver
//!
//! Exercises a pool with a deterministic churn workload: random
//! allocate/free against a bounded live set, periodic compaction, and
//! a JSON dump of the layout and the final brutto/netto accounting.
//!
//! # Examples
//!
//! ```bash
//! # default workload
//! slicebench
//!
//! # heavy churn on large slices, compressing every 4 rounds
//! slicebench --slice-size 16384 --slices-per-area 256 \
//!     --rounds 128 --live 2048 --compress-interval 4
//! ```

use clap::Parser;
use slicepool::{SliceBuffer, SlicePool};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Slice pool stress driver
#[derive(Parser, Debug)]
#[command(name = "slicebench")]
#[command(version = slicepool::VERSION)]
#[command(about = "Churn a slice pool and report its memory accounting", long_about = None)]
struct Cli {
    /// Slice size in bytes
    #[arg(long, default_value_t = 8192)]
    slice_size: usize,

    /// Target number of slices per area
    #[arg(long, default_value_t = 1024)]
    slices_per_area: u32,

    /// Number of churn rounds
    #[arg(long, default_value_t = 64)]
    rounds: u32,

    /// Maximum number of live allocations
    #[arg(long, default_value_t = 4096)]
    live: usize,

    /// Compress the pool every N rounds (0 disables)
    #[arg(long, default_value_t = 8)]
    compress_interval: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn lcg(x: u64) -> u64 {
    x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level)?)
        .init();

    let mut pool = SlicePool::new(cli.slice_size, cli.slices_per_area)?;
    println!("{}", serde_json::to_string_pretty(pool.layout())?);

    let mut rng: u64 = 0x9e3779b97f4a7c15;
    let mut live: Vec<SliceBuffer> = Vec::with_capacity(cli.live);
    let mut allocated = 0u64;
    let mut freed = 0u64;

    let started = Instant::now();
    for round in 0..cli.rounds {
        for _ in 0..cli.live {
            rng = lcg(rng);
            if live.len() < cli.live && (rng & 1 == 0 || live.is_empty()) {
                let mut buffer = pool.alloc_buffer();

                // touch every byte so the pages are actually committed
                let n = buffer.capacity();
                buffer.write().fill((rng >> 8) as u8);
                buffer.append(n);

                live.push(buffer);
                allocated += 1;
            } else {
                rng = lcg(rng);
                let victim = rng as usize % live.len();
                live.swap_remove(victim);
                freed += 1;
            }
        }

        if cli.compress_interval > 0 && (round + 1) % cli.compress_interval == 0 {
            pool.compress();
            let stats = pool.stats();
            info!(
                round,
                areas = pool.area_count(),
                brutto = stats.brutto_size,
                netto = stats.netto_size,
                "compressed"
            );
        }
    }

    live.clear();
    pool.compress();

    let elapsed = started.elapsed();
    info!(allocated, freed, ?elapsed, "churn complete");

    println!("{}", serde_json::to_string_pretty(&pool.stats())?);
    Ok(())
}
