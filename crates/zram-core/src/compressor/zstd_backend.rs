use crate::error::{Error, Result};

use super::Compressor;

const ZSTD_LEVEL: i32 = 3;

/// Zstandard compressor, favoring ratio over speed relative to [`Lz4Compressor`](super::Lz4Compressor).
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn compress(&self, raw: &[u8], dst: &mut [u8]) -> usize {
        match zstd::bulk::compress_to_buffer(raw, dst, ZSTD_LEVEL) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    fn decompress(&self, compressed: &[u8], _prefix_hint: usize, dst: &mut [u8]) -> Result<()> {
        zstd::bulk::decompress_to_buffer(compressed, dst)
            .map(|_| ())
            .map_err(|e| Error::Corrupt {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_compressible_data() {
        let c = ZstdCompressor;
        let raw = vec![9u8; 4096];
        let mut dst = vec![0u8; raw.len() * 2];
        let n = c.compress(&raw, &mut dst);
        assert!(n > 0 && n < raw.len());
        let mut out = vec![0u8; raw.len()];
        c.decompress(&dst[..n], raw.len(), &mut out).unwrap();
        assert_eq!(out, raw);
    }
}
