//! Mixed read/write/delete workload generator driving a [`zram_core::Store`].
//!
//! Loosely mirrors the original project's workload driver: pages are seeded from
//! fixture files named `cr{k}-{k+1}.raw` (one per target compression ratio bucket)
//! when present, falling back to synthetically generated pages of the matching
//! ratio so the benchmark runs without any fixture directory at all.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zram_core::allocator::Allocator;
use zram_core::compressor::Compressor;
use zram_core::store::Store;

#[derive(Debug, Clone, Copy)]
pub struct WorkloadConfig {
    pub pages: u64,
    pub iterations: u64,
    pub write_fraction: f64,
    pub delete_fraction: f64,
    pub seed: u64,
}

#[derive(Debug, Default)]
pub struct WorkloadReport {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub elapsed_secs: f64,
    pub final_compr_data_size: i64,
    pub final_pages_stored: i64,
    pub final_huge_pages: i64,
}

/// Loads `cr{ratio}-{ratio_plus_one}.raw` from `fixture_dir` if present, else
/// synthesizes a page whose approximate compression ratio is `1 / ratio` by
/// filling `1 / ratio` of it with repeated bytes and the rest with pseudo-random
/// noise.
fn seed_page(fixture_dir: Option<&Path>, ratio: u32, page_size: usize, rng: &mut StdRng) -> Vec<u8> {
    if let Some(dir) = fixture_dir {
        let path = dir.join(format!("cr{}-{}.raw", ratio, ratio + 1));
        if let Ok(bytes) = std::fs::read(&path) {
            if bytes.len() >= page_size {
                return bytes[..page_size].to_vec();
            }
        }
    }
    let mut page = vec![0u8; page_size];
    let compressible_bytes = page_size / ratio.max(1) as usize;
    for b in page[..compressible_bytes].iter_mut() {
        *b = 0x5a;
    }
    rng.fill(&mut page[compressible_bytes..]);
    page
}

pub fn run<C: Compressor, A: Allocator>(
    store: &Store<C, A>,
    cfg: WorkloadConfig,
    fixture_dir: Option<&Path>,
) -> Result<WorkloadReport> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let page_size = store.page_size();
    let mut report = WorkloadReport::default();

    let start = Instant::now();
    for i in 0..cfg.iterations {
        let page_index = rng.random_range(0..cfg.pages);
        let roll: f64 = rng.random();
        if roll < cfg.delete_fraction {
            store.delete_pages(page_index, 1)?;
            report.deletes += 1;
        } else if roll < cfg.delete_fraction + cfg.write_fraction {
            let ratio = 2 + (i % 8) as u32;
            let page = seed_page(fixture_dir, ratio, page_size, &mut rng);
            store.write_pages(page_index, 1, &page)?;
            report.writes += 1;
        } else {
            let mut out = vec![0u8; page_size];
            store.read_pages(page_index, 1, &mut out)?;
            report.reads += 1;
        }
    }
    report.elapsed_secs = start.elapsed().as_secs_f64();
    report.final_compr_data_size = store.total_size();
    report.final_pages_stored = store.pages_stored();
    report.final_huge_pages = store.huge_pages();
    Ok(report)
}
