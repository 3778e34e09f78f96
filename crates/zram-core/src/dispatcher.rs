//! Request dispatcher (component C6, §4.1): validates addresses and splits
//! block/page ranges across page and lock-group boundaries.

use crate::cache::BlockRange;
use crate::config::Config;
use crate::error::{Error, Result};

/// One page-granular step of a split block range: the absolute page index, the
/// in-page block range it covers, and whether that range spans the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStep {
    pub page_index: u64,
    pub in_page: BlockRange,
}

impl PageStep {
    pub fn is_full_page(&self, blocks_per_page: u32) -> bool {
        self.in_page.start == 0 && self.in_page.count == blocks_per_page
    }
}

pub fn validate_block_range(cfg: &Config, blk_addr: u64, count: u64) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    let end = blk_addr
        .checked_add(count)
        .ok_or(Error::BadRange {
            start: blk_addr,
            start_plus_count: u64::MAX,
            block_count: cfg.block_count,
        })?;
    if end > cfg.block_count {
        return Err(Error::BadRange {
            start: blk_addr,
            start_plus_count: end,
            block_count: cfg.block_count,
        });
    }
    Ok(())
}

pub fn validate_page_range(cfg: &Config, pg_addr: u64, count: u64) -> Result<()> {
    if count == 0 {
        return Ok(());
    }
    let end = pg_addr
        .checked_add(count)
        .ok_or(Error::BadPageRange {
            start: pg_addr,
            start_plus_count: u64::MAX,
            page_count: cfg.page_count(),
        })?;
    if end > cfg.page_count() {
        return Err(Error::BadPageRange {
            start: pg_addr,
            start_plus_count: end,
            page_count: cfg.page_count(),
        });
    }
    Ok(())
}

/// Splits `[blk_addr, blk_addr + count)` into ascending, page-aligned steps. The
/// first and last steps may be partial pages; every interior step is a full page.
pub fn split_block_range(cfg: &Config, blk_addr: u64, count: u64) -> Vec<PageStep> {
    if count == 0 {
        return Vec::new();
    }
    let blocks_per_page = cfg.blocks_per_page() as u64;
    let mut steps = Vec::new();
    let mut remaining_start = blk_addr;
    let remaining_end = blk_addr + count;
    while remaining_start < remaining_end {
        let page_index = remaining_start / blocks_per_page;
        let page_start_block = page_index * blocks_per_page;
        let in_page_start = (remaining_start - page_start_block) as u32;
        let page_end_block = page_start_block + blocks_per_page;
        let step_end = remaining_end.min(page_end_block);
        let in_page_count = (step_end - remaining_start) as u32;
        steps.push(PageStep {
            page_index,
            in_page: BlockRange {
                start: in_page_start,
                count: in_page_count,
            },
        });
        remaining_start = step_end;
    }
    steps
}

/// Splits `[pg_addr, pg_addr + count)` page addresses into the individual page
/// indices (full pages only, for the page-granular API).
pub fn split_page_range(pg_addr: u64, count: u64) -> impl Iterator<Item = u64> {
    pg_addr..(pg_addr + count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config {
            block_shift: 8,
            page_shift: 12,
            block_count: 1024,
            max_non_huge_percent: 75,
            huge_wait: 32,
            pages_per_lock_group: 4,
        }
    }

    #[test]
    fn single_page_partial_range() {
        let steps = split_block_range(&cfg(), 2, 3);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].page_index, 0);
        assert_eq!(steps[0].in_page, BlockRange { start: 2, count: 3 });
    }

    #[test]
    fn crosses_three_pages_partial_full_partial() {
        // blocks_per_page = 16 for this config; write 20 blocks starting at block 14.
        let steps = split_block_range(&cfg(), 14, 20);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].page_index, 0);
        assert_eq!(steps[0].in_page, BlockRange { start: 14, count: 2 });
        assert_eq!(steps[1].page_index, 1);
        assert!(steps[1].is_full_page(16));
        assert_eq!(steps[2].page_index, 2);
        assert_eq!(steps[2].in_page, BlockRange { start: 0, count: 2 });
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(validate_block_range(&cfg(), 1000, 100).is_err());
        assert!(validate_block_range(&cfg(), 0, 1024).is_ok());
        assert!(validate_block_range(&cfg(), 0, 1025).is_err());
    }

    #[test]
    fn zero_count_is_a_no_op() {
        assert!(split_block_range(&cfg(), 5, 0).is_empty());
        assert!(validate_block_range(&cfg(), u64::MAX, 0).is_ok());
    }

    proptest::proptest! {
        /// §4.1's range-splitting invariant: the steps returned for an arbitrary
        /// in-bounds range cover it exactly, in order, with no gaps or overlap,
        /// and every step stays within its page.
        #[test]
        fn split_block_range_covers_the_request_exactly(
            blk_addr in 0u64..1024,
            len in 0u64..300,
        ) {
            let cfg = cfg();
            let count = len.min(cfg.block_count.saturating_sub(blk_addr));
            let steps = split_block_range(&cfg, blk_addr, count);

            let mut cursor = blk_addr;
            let mut covered = 0u64;
            for step in &steps {
                let abs_start = step.page_index * cfg.blocks_per_page() as u64 + step.in_page.start as u64;
                proptest::prop_assert_eq!(abs_start, cursor);
                proptest::prop_assert!(step.in_page.count > 0);
                proptest::prop_assert!(step.in_page.start + step.in_page.count <= cfg.blocks_per_page());
                cursor += step.in_page.count as u64;
                covered += step.in_page.count as u64;
            }
            proptest::prop_assert_eq!(covered, count);
            proptest::prop_assert_eq!(cursor, blk_addr + count);
        }
    }
}
