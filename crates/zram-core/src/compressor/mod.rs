//! Compressor adapter (component C1, §4.3).
//!
//! A [`Compressor`] is a stateless capability shared by every page in a store. It
//! compresses and decompresses whole pages, and may optionally support in-place
//! updates for block ranges without a full decompress/recompress round trip.

mod block_aware_lz4;
mod lz4;
mod zstd_backend;

pub use block_aware_lz4::BlockAwareLz4Compressor;
pub use lz4::Lz4Compressor;
pub use zstd_backend::ZstdCompressor;

use crate::cache::BlockRange;
use crate::error::Result;

/// Outcome of [`Compressor::read_modify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadModifyOutcome {
    /// The compressed representation was updated in place; these are its new bytes.
    Done(Vec<u8>),
    /// The backend could not update in place; caller must decompress, patch, and
    /// recompress the full page.
    RecompressNeeded,
}

/// Outcome of [`Compressor::read_delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadDeleteOutcome {
    /// The ranges were zeroed in place; these are the new bytes.
    Done(Vec<u8>),
    /// Every block of the page is now known to be zero; the page should revert to
    /// `Empty` and its buffer should be freed.
    NowEmpty,
    /// The backend could not update in place; caller must decompress, patch, and
    /// recompress the full page.
    RecompressNeeded,
}

/// Capability interface a [`Store`](crate::store::Store) uses to compress,
/// decompress, and (optionally) partially update page buffers.
///
/// All methods operate on one page's buffer at a time and carry no ambient state;
/// backends that need per-page side information (see
/// [`BlockAwareLz4Compressor`]) encode it into the bytes they return from
/// `compress`, so that it travels with the page's `data` buffer rather than living
/// in the compressor itself.
pub trait Compressor: Send + Sync {
    /// Compress `raw` (exactly one page) into `dst`. Returns the number of bytes
    /// written, or `0` if the result would not fit in `dst` (signals "store huge").
    fn compress(&self, raw: &[u8], dst: &mut [u8]) -> usize;

    /// Decompress `compressed` into `dst` (exactly one page). `prefix_hint` is the
    /// number of leading bytes the caller actually needs; backends that cannot
    /// perform a partial decompression ignore it and decompress the full page.
    fn decompress(&self, compressed: &[u8], prefix_hint: usize, dst: &mut [u8]) -> Result<()>;

    /// Secondary heap reachable from a page's primary buffer, given its compressed
    /// length. Zero for backends that keep no side structures.
    fn secondary_heap(&self, compressed_len: usize) -> usize {
        let _ = compressed_len;
        0
    }

    /// Attempt to update `ranges` of the page (already compressed into `compressed`)
    /// in place using `new_data` (concatenated bytes for all ranges, `block_size`
    /// each), without a full decompress/recompress cycle.
    ///
    /// The default implementation never attempts this and always asks the caller to
    /// fall back to decompress-patch-recompress.
    fn read_modify(
        &self,
        compressed: &[u8],
        ranges: &[BlockRange],
        block_size: usize,
        new_data: &[u8],
    ) -> Result<ReadModifyOutcome> {
        let _ = (compressed, ranges, block_size, new_data);
        Ok(ReadModifyOutcome::RecompressNeeded)
    }

    /// Attempt to zero `ranges` of the page in place, possibly detecting that the
    /// whole page is now zero.
    fn read_delete(
        &self,
        compressed: &[u8],
        ranges: &[BlockRange],
        block_size: usize,
    ) -> Result<ReadDeleteOutcome> {
        let _ = (compressed, ranges, block_size);
        Ok(ReadDeleteOutcome::RecompressNeeded)
    }
}
