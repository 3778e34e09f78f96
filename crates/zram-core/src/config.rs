use crate::error::{Error, Result};

/// Upper bound on page size, in bytes. Scratch buffers used on the read/write hot
/// path are fixed-size stack arrays sized to this cap and sliced down to `page_size`
/// at runtime, since Rust has no stable way to size a stack array from a runtime value.
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

/// Immutable geometry and tuning parameters for a [`Store`](crate::store::Store).
///
/// Validated eagerly by [`Config::validate`], which every store constructor calls
/// before allocating the page table.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub block_shift: u32,
    pub page_shift: u32,
    pub block_count: u64,
    /// Percentage (1..=100) of `page_size` a compressed page may occupy before it is
    /// stored as a huge (incompressible) page instead.
    pub max_non_huge_percent: u32,
    /// Number of block updates a huge page accepts before a recompression is attempted.
    pub huge_wait: u8,
    pub pages_per_lock_group: u32,
}

impl Config {
    pub fn block_size(&self) -> usize {
        1usize << self.block_shift
    }

    pub fn page_size(&self) -> usize {
        1usize << self.page_shift
    }

    pub fn blocks_per_page(&self) -> u32 {
        1u32 << (self.page_shift - self.block_shift)
    }

    pub fn page_count(&self) -> u64 {
        self.block_count.div_ceil(self.blocks_per_page() as u64)
    }

    pub fn lock_count(&self) -> u64 {
        self.page_count().div_ceil(self.pages_per_lock_group as u64)
    }

    pub fn max_non_huge_bytes(&self) -> usize {
        let bound = (self.page_size() as u64 * self.max_non_huge_percent as u64) / 100;
        bound.max(1) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_shift < self.block_shift {
            return Err(Error::InvalidConfig(
                "page_shift must be >= block_shift".into(),
            ));
        }
        if self.page_shift - self.block_shift > 8 {
            return Err(Error::InvalidConfig(
                "blocks_per_page must fit a practical range (<= 256)".into(),
            ));
        }
        if self.block_count == 0 {
            return Err(Error::InvalidConfig("block_count must be nonzero".into()));
        }
        if self.max_non_huge_percent == 0 || self.max_non_huge_percent > 100 {
            return Err(Error::InvalidConfig(
                "max_non_huge_percent must be in 1..=100".into(),
            ));
        }
        if self.huge_wait == 0 || self.huge_wait > 64 {
            return Err(Error::InvalidConfig("huge_wait must be in 1..=64".into()));
        }
        if self.pages_per_lock_group == 0 {
            return Err(Error::InvalidConfig(
                "pages_per_lock_group must be nonzero".into(),
            ));
        }
        if self.page_size() > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page_size {} exceeds the {} byte cap",
                self.page_size(),
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    /// 4 KiB pages of 256 B blocks over a 64 MiB address space, matching the
    /// defaults a zram-like store would ship with.
    fn default() -> Self {
        Config {
            block_shift: 8,
            page_shift: 12,
            block_count: (64 * 1024 * 1024) / 256,
            max_non_huge_percent: 75,
            huge_wait: 32,
            pages_per_lock_group: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_geometry() {
        let cfg = Config::default();
        assert_eq!(cfg.block_size(), 256);
        assert_eq!(cfg.page_size(), 4096);
        assert_eq!(cfg.blocks_per_page(), 16);
        assert_eq!(cfg.page_count(), cfg.block_count.div_ceil(16));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_page_smaller_than_block() {
        let mut cfg = Config::default();
        cfg.page_shift = cfg.block_shift - 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_oversized_page() {
        let mut cfg = Config::default();
        cfg.page_shift = 20;
        cfg.block_shift = 8;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_huge_wait() {
        let mut cfg = Config::default();
        cfg.huge_wait = 0;
        assert!(cfg.validate().is_err());
    }
}
