//! Page engine (component C5, §4.2): the per-page read/write/delete state machine.
//!
//! Every function here operates on exactly one page at a time and assumes the
//! caller already holds the appropriate lock (see `dispatcher.rs` and
//! `lock.rs`); none of them touch locking themselves.

use log::{debug, trace};

use crate::allocator::Allocator;
use crate::cache::BlockRange;
use crate::compressor::{Compressor, ReadDeleteOutcome, ReadModifyOutcome};
use crate::config::{Config, MAX_PAGE_SIZE};
use crate::error::Result;
use crate::page::{PageRecord, PageState};
use crate::stats::Stats;

/// Fills `out` with the full logical contents of `page`.
pub fn read_page(page: &PageRecord, compressor: &dyn Compressor, cfg: &Config, out: &mut [u8]) -> Result<()> {
    match page.state() {
        PageState::Empty => out.fill(0),
        PageState::Huge => out.copy_from_slice(page.data()),
        PageState::Compressed => {
            compressor.decompress(page.data(), cfg.page_size(), out)?;
            let block_size = cfg.block_size();
            page.cache.uncache(out, block_size);
        }
    }
    Ok(())
}

/// Fills `out` with the logical contents of `range` within `page`, logging the
/// read into the block-order cache when the page is compressed. Requires
/// exclusive access to `page` because logging a read mutates shared cache state
/// (§4.2 deviation — see `DESIGN.md`).
pub fn read_blocks(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    cfg: &Config,
    range: BlockRange,
    out: &mut [u8],
) -> Result<()> {
    let block_size = cfg.block_size();
    match page.state() {
        PageState::Empty => out.fill(0),
        PageState::Huge => {
            let start = range.start as usize * block_size;
            let len = range.count as usize * block_size;
            out.copy_from_slice(&page.data()[start..start + len]);
        }
        PageState::Compressed => {
            let needed = page.cache.bytes_needed(range, block_size);
            let mut raw = [0u8; MAX_PAGE_SIZE];
            let raw = &mut raw[..cfg.page_size()];
            compressor.decompress(page.data(), needed, raw)?;
            for (logical, physical) in page.cache.split_physical_ranges(range) {
                let dst_off = (logical.start - range.start) as usize * block_size;
                let dst_len = logical.count as usize * block_size;
                let src_off = physical.start as usize * block_size;
                out[dst_off..dst_off + dst_len].copy_from_slice(&raw[src_off..src_off + dst_len]);
            }
            page.cache.log_read(range.start..range.end());
        }
    }
    Ok(())
}

/// Decompresses a compressed page into its full logical layout (undoing the
/// block-order permutation), writing into `raw` (must be `cfg.page_size()` long).
fn decompress_logical(page: &PageRecord, compressor: &dyn Compressor, cfg: &Config, raw: &mut [u8]) -> Result<()> {
    compressor.decompress(page.data(), cfg.page_size(), raw)?;
    let block_size = cfg.block_size();
    page.cache.uncache(raw, block_size);
    Ok(())
}

/// Compresses `raw` (full logical page) into `page`, applying the pending
/// block-order permutation first, and falling back to `Huge` on failed
/// compression. `raw` is left untouched; the huge fallback stores the original
/// logical bytes (huge pages bypass the permutation entirely — see `DESIGN.md`).
fn compress_and_store(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    allocator: &dyn Allocator,
    cfg: &Config,
    raw: &[u8],
    stats: &Stats,
) {
    let was_huge = page.is_huge();
    let mut permuted = [0u8; MAX_PAGE_SIZE];
    let permuted = &mut permuted[..cfg.page_size()];
    page.cache.cache_page(raw, permuted, cfg.block_size());

    let mut dst = [0u8; MAX_PAGE_SIZE];
    let dst = &mut dst[..cfg.max_non_huge_bytes()];
    stats.compression_attempted();
    let n = compressor.compress(permuted, dst);

    if n == 0 {
        stats.compression_failed();
        trace!("page compression exceeded budget, storing huge");
        let new_alloc = allocator.size_for(cfg.page_size());
        let delta = page.set_huge(raw, new_alloc);
        stats.add_size(delta);
        if !was_huge {
            stats.became_huge();
        }
    } else {
        let new_alloc = allocator.size_for(n);
        let delta = page.set_compressed(&dst[..n], new_alloc);
        stats.add_size(delta);
        if was_huge {
            stats.became_non_huge();
        }
    }
}

/// Writes a full logical page, replacing any prior contents.
pub fn write_page(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    allocator: &dyn Allocator,
    cfg: &Config,
    raw: &[u8],
    stats: &Stats,
) -> Result<()> {
    let was_empty = matches!(page.state(), PageState::Empty);
    compress_and_store(page, compressor, allocator, cfg, raw, stats);
    if was_empty {
        stats.page_created();
    }
    Ok(())
}

/// Attempts a huge-page recompression after `blocks_updated` more blocks were
/// overwritten in place; bumps and resets the update counter per §4.2.
fn maybe_recompress_huge(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    allocator: &dyn Allocator,
    cfg: &Config,
    blocks_updated: u32,
    stats: &Stats,
) {
    let counter = page.update_counter().saturating_add(blocks_updated.min(255) as u8);
    if counter as u32 >= cfg.huge_wait as u32 {
        page.set_update_counter(0);
        debug!("huge page reached huge_wait, attempting recompression");
        let raw = page.data().to_vec();
        compress_and_store(page, compressor, allocator, cfg, &raw, stats);
    } else {
        page.set_update_counter(counter);
    }
}

/// Overwrites `range` of `page` with `new_data` (`range.count * block_size` bytes).
pub fn write_blocks(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    allocator: &dyn Allocator,
    cfg: &Config,
    range: BlockRange,
    new_data: &[u8],
    stats: &Stats,
) -> Result<()> {
    let block_size = cfg.block_size();
    match page.state() {
        PageState::Empty => {
            let mut raw = [0u8; MAX_PAGE_SIZE];
            let raw = &mut raw[..cfg.page_size()];
            raw.fill(0);
            patch(raw, range, new_data, block_size);
            compress_and_store(page, compressor, allocator, cfg, raw, stats);
            stats.page_created();
        }
        PageState::Huge => {
            let off = range.start as usize * block_size;
            let len = range.count as usize * block_size;
            page.data_mut_huge()[off..off + len].copy_from_slice(new_data);
            maybe_recompress_huge(page, compressor, allocator, cfg, range.count, stats);
        }
        PageState::Compressed => {
            match compressor.read_modify(page.data(), &[range], block_size, new_data)? {
                ReadModifyOutcome::Done(bytes) => {
                    let new_alloc = allocator.size_for(bytes.len());
                    let delta = page.set_compressed(&bytes, new_alloc);
                    stats.add_size(delta);
                }
                ReadModifyOutcome::RecompressNeeded => {
                    let mut raw = [0u8; MAX_PAGE_SIZE];
                    let raw = &mut raw[..cfg.page_size()];
                    decompress_logical(page, compressor, cfg, raw)?;
                    patch(raw, range, new_data, block_size);
                    compress_and_store(page, compressor, allocator, cfg, raw, stats);
                }
            }
        }
    }
    Ok(())
}

/// Zeros `range` of `page`.
pub fn delete_blocks(
    page: &mut PageRecord,
    compressor: &dyn Compressor,
    allocator: &dyn Allocator,
    cfg: &Config,
    range: BlockRange,
    stats: &Stats,
) -> Result<()> {
    let block_size = cfg.block_size();
    match page.state() {
        PageState::Empty => {}
        PageState::Huge => {
            let off = range.start as usize * block_size;
            let len = range.count as usize * block_size;
            page.data_mut_huge()[off..off + len].fill(0);
            maybe_recompress_huge(page, compressor, allocator, cfg, range.count, stats);
        }
        PageState::Compressed => {
            // The bitset (and any other per-block side state a compressor keeps)
            // is built over the page's physical, post-permutation layout, not its
            // logical block order, so the range must be translated before asking
            // the compressor about it.
            let physical_ranges: Vec<BlockRange> = page
                .cache
                .split_physical_ranges(range)
                .into_iter()
                .map(|(_, physical)| BlockRange {
                    start: physical.start,
                    count: physical.count,
                })
                .collect();
            match compressor.read_delete(page.data(), &physical_ranges, block_size)? {
                ReadDeleteOutcome::NowEmpty => {
                    let delta = page.clear();
                    stats.add_size(delta);
                    stats.page_deleted();
                }
                ReadDeleteOutcome::Done(bytes) => {
                    let new_alloc = allocator.size_for(bytes.len());
                    let delta = page.set_compressed(&bytes, new_alloc);
                    stats.add_size(delta);
                }
                ReadDeleteOutcome::RecompressNeeded => {
                    let zeros = vec![0u8; range.count as usize * block_size];
                    let mut raw = [0u8; MAX_PAGE_SIZE];
                    let raw = &mut raw[..cfg.page_size()];
                    decompress_logical(page, compressor, cfg, raw)?;
                    patch(raw, range, &zeros, block_size);
                    if raw.iter().all(|&b| b == 0) {
                        let delta = page.clear();
                        stats.add_size(delta);
                        stats.page_deleted();
                    } else {
                        compress_and_store(page, compressor, allocator, cfg, raw, stats);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Unconditionally frees `page`, reverting it to `Empty`.
pub fn delete_page(page: &mut PageRecord, stats: &Stats) {
    if page.state() == PageState::Empty {
        return;
    }
    let was_huge = page.is_huge();
    let delta = page.clear();
    stats.add_size(delta);
    stats.page_deleted();
    if was_huge {
        stats.became_non_huge();
    }
}

fn patch(raw: &mut [u8], range: BlockRange, new_data: &[u8], block_size: usize) {
    let off = range.start as usize * block_size;
    let len = range.count as usize * block_size;
    raw[off..off + len].copy_from_slice(&new_data[..len]);
}
