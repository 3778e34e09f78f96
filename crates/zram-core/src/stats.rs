//! Statistics (component C7).
//!
//! Counters are mutated under a page's lock but read without one, so every field
//! is atomic (relaxed ordering suffices — callers only need eventual consistency,
//! matching §5's note that torn reads, not ordering, are the hazard to avoid).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Stats {
    compr_data_size: AtomicI64,
    pages_stored: AtomicI64,
    huge_pages: AtomicI64,
    num_compr: AtomicU64,
    failed_compr: AtomicU64,
}

impl Stats {
    pub fn compr_data_size(&self) -> i64 {
        self.compr_data_size.load(Ordering::Relaxed)
    }

    pub fn pages_stored(&self) -> i64 {
        self.pages_stored.load(Ordering::Relaxed)
    }

    pub fn huge_pages(&self) -> i64 {
        self.huge_pages.load(Ordering::Relaxed)
    }

    pub fn num_compr(&self) -> u64 {
        self.num_compr.load(Ordering::Relaxed)
    }

    pub fn failed_compr(&self) -> u64 {
        self.failed_compr.load(Ordering::Relaxed)
    }

    pub fn add_size(&self, delta: i64) {
        if delta != 0 {
            self.compr_data_size.fetch_add(delta, Ordering::Relaxed);
        }
    }

    pub fn page_created(&self) {
        self.pages_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_deleted(&self) {
        self.pages_stored.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn became_huge(&self) {
        self.huge_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn became_non_huge(&self) {
        self.huge_pages.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn compression_attempted(&self) {
        self.num_compr.fetch_add(1, Ordering::Relaxed);
    }

    pub fn compression_failed(&self) {
        self.failed_compr.fetch_add(1, Ordering::Relaxed);
    }

    /// Zeros the compression-attempt counters; called by `Store::exit` per §6.
    /// `pages_stored`/`huge_pages`/`compr_data_size` are left to the per-page
    /// deletions that accompany an `exit` to drive back to zero.
    pub fn reset_compression_counters(&self) {
        self.num_compr.store(0, Ordering::Relaxed);
        self.failed_compr.store(0, Ordering::Relaxed);
    }
}
