//! Block-order permutation cache (component C4).
//!
//! Keeps the most frequently read blocks of a page at the front of its compressed
//! representation, so a read touching only those blocks can decompress as little as
//! one or two block-sizes of compressed data instead of the whole page.

use crate::hints::{likely, unlikely};

/// Sentinel meaning "no candidate yet" — never equal to a real in-page block index
/// since `blocks_per_page` is capped well below this value.
const NONE: u32 = u32::MAX;

/// A contiguous range of logical block offsets within one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u32,
    pub count: u32,
}

impl BlockRange {
    pub fn end(&self) -> u32 {
        self.start + self.count
    }

    pub fn contains(&self, b: u32) -> bool {
        b >= self.start && b < self.end()
    }
}

/// A contiguous range of *physical* byte offsets (in block-size units) within the
/// compressed page's uncompressed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalRange {
    pub start: u32,
    pub count: u32,
}

/// Per-page block-order cache state (§3 `cache_meta`, §4.4).
///
/// `cur` is the permutation currently reflected in the page's stored bytes; `next`
/// is the permutation that will be written on the next recompression; `cand` holds
/// up to two promotion candidates, most-recently-touched first.
#[derive(Debug, Clone, Copy)]
pub struct CacheMeta {
    pub cur0: u32,
    pub cur1: u32,
    pub next0: u32,
    pub next1: u32,
    cand0: u32,
    cand1: u32,
    cand0_count: u8,
    cand1_count: u8,
}

impl CacheMeta {
    /// Natural order: blocks 0 and 1 occupy the front, no candidates yet.
    pub fn natural() -> Self {
        CacheMeta {
            cur0: 0,
            cur1: 1,
            next0: 0,
            next1: 1,
            cand0: NONE,
            cand1: NONE,
            cand0_count: 0,
            cand1_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::natural();
    }

    /// Records that `blocks` (in ascending order) were just served by a read,
    /// updating the promotion candidates per §4.4.
    pub fn log_read(&mut self, blocks: impl IntoIterator<Item = u32>) {
        for b in blocks {
            self.log_one(b);
        }
    }

    fn log_one(&mut self, b: u32) {
        if unlikely(b == self.next0) {
            self.cand0_count &= 1;
            self.cand1_count &= 1;
        } else if b == self.next1 {
            std::mem::swap(&mut self.next0, &mut self.next1);
            self.cand0_count >>= 1;
            self.cand1_count >>= 1;
        } else if b == self.cand0 {
            if self.cand0_count != 0 {
                self.next1 = self.next0;
                self.next0 = self.cand0;
                self.cand0_count = 0;
            } else {
                self.cand0_count = 0b11;
            }
        } else if b == self.cand1 {
            if self.cand1_count != 0 {
                self.next1 = self.next0;
                self.next0 = self.cand1;
                self.cand1_count = 0;
            } else {
                self.cand1_count = 0b11;
            }
            std::mem::swap(&mut self.cand0, &mut self.cand1);
            std::mem::swap(&mut self.cand0_count, &mut self.cand1_count);
        } else {
            self.cand1 = self.cand0;
            self.cand1_count = self.cand0_count;
            self.cand0 = b;
            self.cand0_count = 0;
        }
    }

    /// A block's position in the current on-disk permutation: `None` if it is not
    /// one of the two cached blocks, else its physical slot (0 or 1).
    fn cur_slot(&self, b: u32) -> Option<u32> {
        if b == self.cur0 {
            Some(0)
        } else if b == self.cur1 {
            Some(1)
        } else {
            None
        }
    }

    /// How many bytes of the compressed page's uncompressed image must be recovered
    /// to cover `range`, given the current permutation.
    pub fn bytes_needed(&self, range: BlockRange, block_size: usize) -> usize {
        if likely(range.count == 1) {
            if let Some(slot) = self.cur_slot(range.start) {
                return (slot + 1) as usize * block_size;
            }
        } else if range.count == 2 {
            if let (Some(a), Some(b)) = (self.cur_slot(range.start), self.cur_slot(range.start + 1)) {
                return (a.max(b) + 1) as usize * block_size;
            }
        }
        let highest = range.end() - 1;
        let preceding_cached = [self.cur0, self.cur1]
            .into_iter()
            .filter(|&c| c <= highest && !range.contains(c))
            .count() as u32;
        (highest + 1 + preceding_cached) as usize * block_size
    }

    /// Splits a logical block range into disjoint (logical, physical) sub-range
    /// pairs under the current permutation (at most five, per the implementation
    /// constant in §4.4). Each pair has matching `count`s; copying physical bytes
    /// to/from the corresponding logical position recovers the plain logical
    /// layout without a full [`uncache`](Self::uncache) pass.
    pub fn split_physical_ranges(&self, range: BlockRange) -> Vec<(BlockRange, PhysicalRange)> {
        let mut cached: Vec<(u32, u32)> = Vec::with_capacity(2);
        if range.contains(self.cur0) {
            cached.push((self.cur0, 0));
        }
        if range.contains(self.cur1) {
            cached.push((self.cur1, 1));
        }
        cached.sort_unstable_by_key(|&(logical, _)| logical);

        let mut out = Vec::with_capacity(5);
        let mut cursor = range.start;
        for &(logical, slot) in &cached {
            if logical > cursor {
                out.push((
                    BlockRange {
                        start: cursor,
                        count: logical - cursor,
                    },
                    PhysicalRange {
                        start: physical_offset(cursor, self),
                        count: logical - cursor,
                    },
                ));
            }
            out.push((
                BlockRange {
                    start: logical,
                    count: 1,
                },
                PhysicalRange { start: slot, count: 1 },
            ));
            cursor = logical + 1;
        }
        if cursor < range.end() {
            out.push((
                BlockRange {
                    start: cursor,
                    count: range.end() - cursor,
                },
                PhysicalRange {
                    start: physical_offset(cursor, self),
                    count: range.end() - cursor,
                },
            ));
        }
        out
    }

    /// Inverse permutation: rewrites `raw` (one full page, `block_size`-chunked)
    /// from on-disk (physical) order back into logical order. Allocates one
    /// page-sized scratch buffer internally; see `DESIGN.md` for why this trades
    /// the tighter two-block-size bound implied by §4.4 for a straightforwardly
    /// correct implementation.
    pub fn uncache(&self, raw: &mut [u8], block_size: usize) {
        let blocks_per_page = (raw.len() / block_size) as u32;
        let mut logical = vec![0u8; raw.len()];
        logical[self.cur0 as usize * block_size..][..block_size].copy_from_slice(&raw[0..block_size]);
        logical[self.cur1 as usize * block_size..][..block_size]
            .copy_from_slice(&raw[block_size..2 * block_size]);
        let mut slot = 2u32;
        for l in 0..blocks_per_page {
            if l == self.cur0 || l == self.cur1 {
                continue;
            }
            let src_off = slot as usize * block_size;
            let dst_off = l as usize * block_size;
            logical[dst_off..dst_off + block_size].copy_from_slice(&raw[src_off..src_off + block_size]);
            slot += 1;
        }
        raw.copy_from_slice(&logical);
    }

    /// Applies the `next` permutation to produce the bytes that should be
    /// compressed: physical slot 0 becomes logical block `next0`, slot 1 becomes
    /// `next1`, and every other block keeps its relative logical order packed
    /// into the remaining slots. Writes into `dst` (out-of-place) and advances
    /// `cur` to `next`.
    pub fn cache_page(&mut self, src: &[u8], dst: &mut [u8], block_size: usize) {
        let blocks_per_page = (src.len() / block_size) as u32;
        copy_block(dst, 0, src, self.next0, block_size);
        copy_block(dst, 1, src, self.next1, block_size);
        let mut slot = 2u32;
        for logical in 0..blocks_per_page {
            if logical == self.next0 || logical == self.next1 {
                continue;
            }
            copy_block(dst, slot, src, logical, block_size);
            slot += 1;
        }
        self.cur0 = self.next0;
        self.cur1 = self.next1;
    }
}

/// Physical slot of the first block of a contiguous run of *non-cached* logical
/// blocks starting at `logical`. The two cached blocks occupy slots 0 and 1; every
/// other block keeps its relative logical order, shifted down by however many
/// cached blocks precede it and up by the two reserved slots.
fn physical_offset(logical: u32, meta: &CacheMeta) -> u32 {
    let preceding_cached = [meta.cur0, meta.cur1]
        .into_iter()
        .filter(|&c| c < logical)
        .count() as u32;
    logical - preceding_cached + 2
}

fn copy_block(dst: &mut [u8], dst_slot: u32, src: &[u8], src_logical: u32, block_size: usize) {
    let dst_off = dst_slot as usize * block_size;
    let src_off = src_logical as usize * block_size;
    dst[dst_off..dst_off + block_size].copy_from_slice(&src[src_off..src_off + block_size]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_has_no_candidates() {
        let c = CacheMeta::natural();
        assert_eq!((c.cur0, c.cur1), (0, 1));
        assert_eq!((c.next0, c.next1), (0, 1));
    }

    #[test]
    fn reading_next_blocks_does_not_promote_a_new_one() {
        let mut c = CacheMeta::natural();
        c.log_read([0, 1, 0, 1]);
        // Order may swap (it tracks recency), but no block outside {0, 1} appears.
        let mut pair = [c.next0, c.next1];
        pair.sort_unstable();
        assert_eq!(pair, [0, 1]);
    }

    #[test]
    fn repeated_reads_of_a_cold_block_eventually_promote_it() {
        let mut c = CacheMeta::natural();
        for _ in 0..4 {
            c.log_read([5]);
        }
        assert!(c.next0 == 5 || c.next1 == 5);
    }

    #[test]
    fn bytes_needed_for_cached_single_block_is_one_block() {
        let c = CacheMeta::natural();
        let needed = c.bytes_needed(BlockRange { start: 0, count: 1 }, 256);
        assert_eq!(needed, 256);
    }

    #[test]
    fn split_ranges_cover_the_whole_request() {
        let c = CacheMeta::natural();
        let range = BlockRange { start: 0, count: 4 };
        let parts = c.split_physical_ranges(range);
        let total: u32 = parts.iter().map(|(l, _)| l.count).sum();
        assert_eq!(total, range.count);
    }

    #[test]
    fn cache_page_round_trips_with_uncache() {
        let mut c = CacheMeta::natural();
        c.log_read([3, 3, 3, 3]);
        let block_size = 4;
        let page_size = 16;
        let src: Vec<u8> = (0..page_size as u8).collect();
        let mut dst = vec![0u8; page_size];
        c.cache_page(&src, &mut dst, block_size);
        c.uncache(&mut dst, block_size);
        assert_eq!(dst, src);
    }

    proptest::proptest! {
        /// Cache transparency (§4.4): whatever read history permutes a page's
        /// on-disk block order, applying the permutation and then undoing it
        /// must recover the original bytes exactly.
        #[test]
        fn cache_page_uncache_round_trips_under_arbitrary_read_history(
            reads in proptest::collection::vec(0u32..8, 0..20),
            page in proptest::collection::vec(proptest::prelude::any::<u8>(), 32),
        ) {
            let block_size = 4;
            let mut c = CacheMeta::natural();
            c.log_read(reads);
            let mut dst = vec![0u8; page.len()];
            c.cache_page(&page, &mut dst, block_size);
            c.uncache(&mut dst, block_size);
            proptest::prop_assert_eq!(dst, page);
        }
    }
}
