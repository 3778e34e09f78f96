mod workload;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use zram_core::allocator::{DirectAllocator, SizeClassAllocator};
use zram_core::compressor::{BlockAwareLz4Compressor, Lz4Compressor, ZstdCompressor};
use zram_core::config::Config;
use zram_core::store::Store;
use zram_core::LockPolicy;

use workload::WorkloadConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressorKind {
    Lz4,
    Zstd,
    BlockAwareLz4,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AllocatorKind {
    Direct,
    SizeClass,
}

/// Drives a zram-core store through a mixed read/write/delete workload and
/// reports throughput and compression statistics.
#[derive(Debug, Parser)]
#[command(name = "zram-bench", version, about)]
struct Cli {
    /// log2 of the block size in bytes.
    #[arg(long, default_value_t = 8)]
    block_shift: u32,

    /// log2 of the page size in bytes.
    #[arg(long, default_value_t = 12)]
    page_shift: u32,

    /// Number of logical blocks in the store.
    #[arg(long, default_value_t = 1 << 20)]
    block_count: u64,

    /// Percentage of the page size a compressed page may occupy before falling
    /// back to huge (verbatim) storage.
    #[arg(long, default_value_t = 75)]
    max_non_huge_percent: u32,

    /// Block updates a huge page accepts before a recompression attempt.
    #[arg(long, default_value_t = 32)]
    huge_wait: u8,

    /// Pages guarded by one lock.
    #[arg(long, default_value_t = 32)]
    pages_per_lock_group: u32,

    #[arg(long, value_enum, default_value_t = CompressorKind::Lz4)]
    compressor: CompressorKind,

    #[arg(long, value_enum, default_value_t = AllocatorKind::Direct)]
    allocator: AllocatorKind,

    /// Fraction of operations that are writes.
    #[arg(long, default_value_t = 0.5)]
    write_fraction: f64,

    /// Fraction of operations that are deletes.
    #[arg(long, default_value_t = 0.05)]
    delete_fraction: f64,

    /// Number of operations to run.
    #[arg(long, default_value_t = 200_000)]
    iterations: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory containing `cr{k}-{k+1}.raw` fixture files; synthetic pages are
    /// used for any ratio bucket without a fixture.
    #[arg(long)]
    fixture_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config {
        block_shift: cli.block_shift,
        page_shift: cli.page_shift,
        block_count: cli.block_count,
        max_non_huge_percent: cli.max_non_huge_percent,
        huge_wait: cli.huge_wait,
        pages_per_lock_group: cli.pages_per_lock_group,
    };
    let pages = config.page_count();
    let workload_cfg = WorkloadConfig {
        pages,
        iterations: cli.iterations,
        write_fraction: cli.write_fraction,
        delete_fraction: cli.delete_fraction,
        seed: cli.seed,
    };

    let report = match (cli.compressor, cli.allocator) {
        (CompressorKind::Lz4, AllocatorKind::Direct) => {
            let store = Store::open(config, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
        (CompressorKind::Lz4, AllocatorKind::SizeClass) => {
            let store = Store::open(config, Lz4Compressor, SizeClassAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
        (CompressorKind::Zstd, AllocatorKind::Direct) => {
            let store = Store::open(config, ZstdCompressor, DirectAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
        (CompressorKind::Zstd, AllocatorKind::SizeClass) => {
            let store = Store::open(config, ZstdCompressor, SizeClassAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
        (CompressorKind::BlockAwareLz4, AllocatorKind::Direct) => {
            let compressor = BlockAwareLz4Compressor::new(config.blocks_per_page());
            let store = Store::open(config, compressor, DirectAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
        (CompressorKind::BlockAwareLz4, AllocatorKind::SizeClass) => {
            let compressor = BlockAwareLz4Compressor::new(config.blocks_per_page());
            let store = Store::open(config, compressor, SizeClassAllocator, LockPolicy::ReaderWriter)?;
            workload::run(&store, workload_cfg, cli.fixture_dir.as_deref())?
        }
    };

    println!("ops: {} reads, {} writes, {} deletes in {:.3}s", report.reads, report.writes, report.deletes, report.elapsed_secs);
    println!(
        "pages_stored={} huge_pages={} compr_data_size={}",
        report.final_pages_stored, report.final_huge_pages, report.final_compr_data_size
    );
    Ok(())
}
