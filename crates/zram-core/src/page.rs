//! Per-page record (§3 Page record) and its three observable states (§4.2).

use crate::cache::CacheMeta;

/// Observable state of one page, derived from its record rather than stored
/// redundantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Empty,
    Compressed,
    Huge,
}

/// One page's stored bytes, compression state, and block-order cache metadata.
///
/// `data` is empty iff the page has never been written or has since been deleted
/// (§3 invariant 1). `allocated` tracks the actual buffer size the configured
/// [`Allocator`](crate::allocator::Allocator) reserved, which may exceed
/// `data.len()` under a size-class allocator and is what statistics report.
#[derive(Debug, Clone)]
pub struct PageRecord {
    data: Vec<u8>,
    allocated: usize,
    huge: bool,
    /// Update counter while huge (bounded by `huge_wait`); unused while not huge.
    update_counter: u8,
    pub cache: CacheMeta,
}

impl PageRecord {
    pub fn empty() -> Self {
        PageRecord {
            data: Vec::new(),
            allocated: 0,
            huge: false,
            update_counter: 0,
            cache: CacheMeta::natural(),
        }
    }

    pub fn state(&self) -> PageState {
        if self.data.is_empty() {
            PageState::Empty
        } else if self.huge {
            PageState::Huge
        } else {
            PageState::Compressed
        }
    }

    pub fn is_huge(&self) -> bool {
        self.huge
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn update_counter(&self) -> u8 {
        self.update_counter
    }

    pub fn set_update_counter(&mut self, n: u8) {
        self.update_counter = n;
    }

    /// Replaces the stored buffer, marking the page `Compressed`, and returns the
    /// allocator delta (`new_allocated - old_allocated`).
    pub fn set_compressed(&mut self, bytes: &[u8], new_allocated: usize) -> i64 {
        let delta = new_allocated as i64 - self.allocated as i64;
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.allocated = new_allocated;
        self.huge = false;
        self.update_counter = 0;
        delta
    }

    /// Replaces the stored buffer with a raw page, marking the page `Huge`, and
    /// returns the allocator delta.
    pub fn set_huge(&mut self, raw: &[u8], new_allocated: usize) -> i64 {
        let delta = new_allocated as i64 - self.allocated as i64;
        self.data.clear();
        self.data.extend_from_slice(raw);
        self.allocated = new_allocated;
        self.huge = true;
        delta
    }

    /// Mutates the huge page's buffer in place (same allocated size); no allocator
    /// delta.
    pub fn data_mut_huge(&mut self) -> &mut [u8] {
        debug_assert!(self.huge);
        &mut self.data
    }

    /// Frees the buffer, reverting to `Empty`, and returns the allocator delta
    /// (always `-allocated`).
    pub fn clear(&mut self) -> i64 {
        let delta = -(self.allocated as i64);
        self.data = Vec::new();
        self.allocated = 0;
        self.huge = false;
        self.update_counter = 0;
        self.cache.reset();
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let p = PageRecord::empty();
        assert_eq!(p.state(), PageState::Empty);
        assert_eq!(p.allocated(), 0);
    }

    #[test]
    fn set_compressed_then_clear_round_trips_allocation_delta() {
        let mut p = PageRecord::empty();
        let delta_in = p.set_compressed(&[1, 2, 3], 64);
        assert_eq!(delta_in, 64);
        assert_eq!(p.state(), PageState::Compressed);
        let delta_out = p.clear();
        assert_eq!(delta_out, -64);
        assert_eq!(p.state(), PageState::Empty);
    }
}
