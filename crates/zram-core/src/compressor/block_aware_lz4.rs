use crate::cache::BlockRange;
use crate::error::{Error, Result};

use super::{Compressor, ReadDeleteOutcome, ReadModifyOutcome};

/// LZ4 compressor that prefixes its stored bytes with a per-block all-zero bitset,
/// letting [`read_delete`](Compressor::read_delete) detect a page that has become
/// entirely zero without decompressing it.
///
/// The bitset travels as a header inside the same buffer `Store` already owns for
/// the page (rather than a separately allocated "secondary heap"), so a block-aware
/// page's `data` is still one contiguous allocation; `secondary_heap` reports zero
/// accordingly. See `DESIGN.md` for why this in-line layout was chosen over a
/// second allocation.
#[derive(Debug, Clone, Copy)]
pub struct BlockAwareLz4Compressor {
    blocks_per_page: u32,
}

impl BlockAwareLz4Compressor {
    pub fn new(blocks_per_page: u32) -> Self {
        BlockAwareLz4Compressor { blocks_per_page }
    }

    fn bitset_len(&self) -> usize {
        (self.blocks_per_page as usize).div_ceil(8)
    }

    fn block_is_zero(chunk: &[u8]) -> bool {
        chunk.iter().all(|&b| b == 0)
    }

    fn build_bitset(&self, raw: &[u8], block_size: usize) -> Vec<u8> {
        let mut bits = vec![0u8; self.bitset_len()];
        for b in 0..self.blocks_per_page {
            let off = b as usize * block_size;
            if Self::block_is_zero(&raw[off..off + block_size]) {
                bits[b as usize / 8] |= 1 << (b % 8);
            }
        }
        bits
    }

    fn bit(bits: &[u8], index: u32) -> bool {
        bits[index as usize / 8] & (1 << (index % 8)) != 0
    }
}

impl Compressor for BlockAwareLz4Compressor {
    fn compress(&self, raw: &[u8], dst: &mut [u8]) -> usize {
        let header = self.bitset_len();
        if dst.len() <= header {
            return 0;
        }
        let block_size = raw.len() / self.blocks_per_page as usize;
        let bits = self.build_bitset(raw, block_size);
        match lz4_flex::block::compress_into(raw, &mut dst[header..]) {
            Ok(n) => {
                dst[..header].copy_from_slice(&bits);
                header + n
            }
            Err(_) => 0,
        }
    }

    fn decompress(&self, compressed: &[u8], prefix_hint: usize, dst: &mut [u8]) -> Result<()> {
        let header = self.bitset_len();
        let _ = prefix_hint;
        if compressed.len() < header {
            return Err(Error::Corrupt {
                reason: "block-aware page shorter than its bitset header".into(),
            });
        }
        lz4_flex::block::decompress_into(&compressed[header..], dst)
            .map(|_| ())
            .map_err(|e| Error::Corrupt {
                reason: e.to_string(),
            })
    }

    /// `ranges` must already be expressed in *physical* (post-cache-permutation)
    /// block positions, matching the bitset's index space — the same space
    /// `compress` built it in. Callers translate a logical delete range through
    /// `CacheMeta::split_physical_ranges` before calling this (see `engine.rs`).
    fn read_delete(
        &self,
        compressed: &[u8],
        ranges: &[BlockRange],
        _block_size: usize,
    ) -> Result<ReadDeleteOutcome> {
        let header = self.bitset_len();
        if compressed.len() < header {
            return Err(Error::Corrupt {
                reason: "block-aware page shorter than its bitset header".into(),
            });
        }
        let bits = &compressed[..header];
        let now_zero = |b: u32| ranges.iter().any(|r| r.contains(b)) || Self::bit(bits, b);
        if (0..self.blocks_per_page).all(now_zero) {
            Ok(ReadDeleteOutcome::NowEmpty)
        } else {
            Ok(ReadDeleteOutcome::RecompressNeeded)
        }
    }

    fn read_modify(
        &self,
        _compressed: &[u8],
        _ranges: &[BlockRange],
        _block_size: usize,
        _new_data: &[u8],
    ) -> Result<ReadModifyOutcome> {
        Ok(ReadModifyOutcome::RecompressNeeded)
    }
}
