use crate::error::{Error, Result};

use super::Compressor;

/// Plain LZ4 block compressor, favoring speed over ratio. Offers no in-place
/// update support; every partial write falls back to the shared
/// decompress-patch-recompress path.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, raw: &[u8], dst: &mut [u8]) -> usize {
        match lz4_flex::block::compress_into(raw, dst) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    fn decompress(&self, compressed: &[u8], _prefix_hint: usize, dst: &mut [u8]) -> Result<()> {
        lz4_flex::block::decompress_into(compressed, dst)
            .map(|_| ())
            .map_err(|e| Error::Corrupt {
                reason: e.to_string(),
            })
    }
}
