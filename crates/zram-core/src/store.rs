//! Store lifecycle (component C8, §6): the public, in-process API tying the page
//! table, locks, compressor, allocator, and statistics together.

use std::sync::Arc;

use log::debug;

use crate::allocator::Allocator;
use crate::compressor::Compressor;
use crate::config::Config;
use crate::dispatcher::{self, PageStep};
use crate::engine;
use crate::error::{Error, Result};
use crate::lock::{LockPolicy, PageTable};
use crate::stats::Stats;

struct Inner<C, A> {
    config: Config,
    table: PageTable,
    stats: Stats,
    compressor: C,
    allocator: A,
    lock_policy: LockPolicy,
}

/// A compressed in-memory block store. Cheap to clone (an `Arc` handle, as
/// `rawdb::Database` is); every clone shares the same page table and counters.
pub struct Store<C, A> {
    inner: Arc<Inner<C, A>>,
}

impl<C, A> Clone for Store<C, A> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Compressor, A: Allocator> Store<C, A> {
    /// Builds a fresh store from `config`. There is no separate global `init`:
    /// Rust's ownership model makes re-initializing an already-open store
    /// structurally unreachable, so the "idempotent fail if already initialized"
    /// contract is satisfied by construction rather than a runtime flag.
    pub fn open(config: Config, compressor: C, allocator: A, lock_policy: LockPolicy) -> Result<Self> {
        config.validate()?;
        debug!(
            "opening store: {} pages, {} blocks/page, {} lock groups",
            config.page_count(),
            config.blocks_per_page(),
            config.lock_count()
        );
        let table = PageTable::new(config.page_count(), config.pages_per_lock_group);
        Ok(Store {
            inner: Arc::new(Inner {
                config,
                table,
                stats: Stats::default(),
                compressor,
                allocator,
                lock_policy,
            }),
        })
    }

    /// Deletes every page and zeroes the compression-attempt counters (§6).
    pub fn exit(&self) -> Result<()> {
        self.delete_all()?;
        self.inner.stats.reset_compression_counters();
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    fn block_size(&self) -> usize {
        self.inner.config.block_size()
    }

    pub fn read_pages(&self, pg_addr: u64, count: u64, out: &mut [u8]) -> Result<()> {
        dispatcher::validate_page_range(&self.inner.config, pg_addr, count)?;
        let page_size = self.inner.config.page_size();
        for (i, page_index) in dispatcher::split_page_range(pg_addr, count).enumerate() {
            let (group_idx, offset) = self.inner.table.group_of(page_index);
            let group = self.inner.table.group(group_idx).acquire_read(self.inner.lock_policy);
            let chunk = &mut out[i * page_size..(i + 1) * page_size];
            engine::read_page(&group[offset], &self.inner.compressor, &self.inner.config, chunk)?;
        }
        Ok(())
    }

    pub fn read_blocks(&self, blk_addr: u64, count: u64, out: &mut [u8]) -> Result<()> {
        dispatcher::validate_block_range(&self.inner.config, blk_addr, count)?;
        let block_size = self.block_size();
        let mut cursor = 0usize;
        for step in dispatcher::split_block_range(&self.inner.config, blk_addr, count) {
            let (group_idx, offset) = self.inner.table.group_of(step.page_index);
            let mut group = self.inner.table.group(group_idx).acquire_write();
            let len = step.in_page.count as usize * block_size;
            engine::read_blocks(
                &mut group[offset],
                &self.inner.compressor,
                &self.inner.config,
                step.in_page,
                &mut out[cursor..cursor + len],
            )?;
            cursor += len;
        }
        Ok(())
    }

    pub fn write_pages(&self, pg_addr: u64, count: u64, data: &[u8]) -> Result<()> {
        dispatcher::validate_page_range(&self.inner.config, pg_addr, count)?;
        let page_size = self.inner.config.page_size();
        for (i, page_index) in dispatcher::split_page_range(pg_addr, count).enumerate() {
            let (group_idx, offset) = self.inner.table.group_of(page_index);
            let mut group = self.inner.table.group(group_idx).acquire_write();
            let chunk = &data[i * page_size..(i + 1) * page_size];
            engine::write_page(
                &mut group[offset],
                &self.inner.compressor,
                &self.inner.allocator,
                &self.inner.config,
                chunk,
                &self.inner.stats,
            )?;
        }
        Ok(())
    }

    pub fn write_blocks(&self, blk_addr: u64, count: u64, data: &[u8]) -> Result<()> {
        dispatcher::validate_block_range(&self.inner.config, blk_addr, count)?;
        let block_size = self.block_size();
        let mut cursor = 0usize;
        for step in dispatcher::split_block_range(&self.inner.config, blk_addr, count) {
            let (group_idx, offset) = self.inner.table.group_of(step.page_index);
            let mut group = self.inner.table.group(group_idx).acquire_write();
            let len = step.in_page.count as usize * block_size;
            engine::write_blocks(
                &mut group[offset],
                &self.inner.compressor,
                &self.inner.allocator,
                &self.inner.config,
                step.in_page,
                &data[cursor..cursor + len],
                &self.inner.stats,
            )?;
            cursor += len;
        }
        Ok(())
    }

    /// Like [`write_blocks`](Self::write_blocks), but the caller asserts that
    /// `orig` equals the current contents of `[blk_addr, blk_addr + count)`
    /// (nonexistent blocks read as zero). Verifying this would require decompressing
    /// the affected pages, which would defeat the point of the hint, so it is
    /// checked only in debug builds.
    pub fn write_blocks_hint(&self, blk_addr: u64, count: u64, data: &[u8], orig: &[u8]) -> Result<()> {
        if cfg!(debug_assertions) && count > 0 {
            let mut current = vec![0u8; (count as usize) * self.block_size()];
            self.read_blocks(blk_addr, count, &mut current)?;
            if current != orig {
                return Err(Error::HintMismatch);
            }
        }
        self.write_blocks(blk_addr, count, data)
    }

    pub fn delete_pages(&self, pg_addr: u64, count: u64) -> Result<()> {
        dispatcher::validate_page_range(&self.inner.config, pg_addr, count)?;
        for page_index in dispatcher::split_page_range(pg_addr, count) {
            let (group_idx, offset) = self.inner.table.group_of(page_index);
            let mut group = self.inner.table.group(group_idx).acquire_write();
            engine::delete_page(&mut group[offset], &self.inner.stats);
        }
        Ok(())
    }

    pub fn delete_blocks(&self, blk_addr: u64, count: u64) -> Result<()> {
        dispatcher::validate_block_range(&self.inner.config, blk_addr, count)?;
        for step in dispatcher::split_block_range(&self.inner.config, blk_addr, count) {
            self.delete_blocks_step(step)?;
        }
        Ok(())
    }

    fn delete_blocks_step(&self, step: PageStep) -> Result<()> {
        let (group_idx, offset) = self.inner.table.group_of(step.page_index);
        let mut group = self.inner.table.group(group_idx).acquire_write();
        engine::delete_blocks(
            &mut group[offset],
            &self.inner.compressor,
            &self.inner.allocator,
            &self.inner.config,
            step.in_page,
            &self.inner.stats,
        )
    }

    pub fn delete_all(&self) -> Result<()> {
        for group_idx in 0..self.inner.table.group_count() {
            let mut group = self.inner.table.group(group_idx).acquire_write();
            for page in group.iter_mut() {
                engine::delete_page(page, &self.inner.stats);
            }
        }
        Ok(())
    }

    pub fn page_exists(&self, pg: u64) -> Result<bool> {
        dispatcher::validate_page_range(&self.inner.config, pg, 1)?;
        let (group_idx, offset) = self.inner.table.group_of(pg);
        let group = self.inner.table.group(group_idx).acquire_read(self.inner.lock_policy);
        Ok(!group[offset].data().is_empty())
    }

    pub fn page_is_huge(&self, pg: u64) -> Result<bool> {
        dispatcher::validate_page_range(&self.inner.config, pg, 1)?;
        let (group_idx, offset) = self.inner.table.group_of(pg);
        let group = self.inner.table.group(group_idx).acquire_read(self.inner.lock_policy);
        Ok(group[offset].is_huge())
    }

    pub fn page_heap(&self, pg: u64) -> Result<usize> {
        dispatcher::validate_page_range(&self.inner.config, pg, 1)?;
        let (group_idx, offset) = self.inner.table.group_of(pg);
        let group = self.inner.table.group(group_idx).acquire_read(self.inner.lock_policy);
        let page = &group[offset];
        Ok(page.allocated() + self.inner.compressor.secondary_heap(page.data().len()))
    }

    pub fn page_size(&self) -> usize {
        self.inner.config.page_size()
    }

    pub fn total_size(&self) -> i64 {
        self.inner.stats.compr_data_size()
    }

    pub fn total_heap(&self) -> Result<usize> {
        let mut sum = 0usize;
        for group_idx in 0..self.inner.table.group_count() {
            let group = self.inner.table.group(group_idx).acquire_read(self.inner.lock_policy);
            for page in group.iter() {
                sum += page.allocated() + self.inner.compressor.secondary_heap(page.data().len());
            }
        }
        Ok(sum)
    }

    pub fn pages_stored(&self) -> i64 {
        self.inner.stats.pages_stored()
    }

    pub fn huge_pages(&self) -> i64 {
        self.inner.stats.huge_pages()
    }

    pub fn num_compr(&self) -> u64 {
        self.inner.stats.num_compr()
    }

    pub fn failed_compr(&self) -> u64 {
        self.inner.stats.failed_compr()
    }
}
