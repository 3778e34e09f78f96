//! Lock adapter (component C3, §4.6) and the page table it guards.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::page::PageRecord;

/// Whether a lock group permits concurrent readers, or serializes every access
/// (including reads) behind the writer lock.
///
/// The core is correct under either policy; `WriterOnly` simply serializes reads,
/// matching §4.6's note that a writer-only lock backend is an acceptable
/// implementation of the same contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    ReaderWriter,
    WriterOnly,
}

/// One lock group: the `RwLock` directly owns the slice of page records it
/// guards, so "one lock protects N pages" needs no separate pointer-plus-lock
/// table and no unsafe aliasing (see `DESIGN.md`).
pub struct LockGroup {
    pages: RwLock<Vec<PageRecord>>,
}

pub enum GroupGuard<'a> {
    Read(RwLockReadGuard<'a, Vec<PageRecord>>),
    Write(RwLockWriteGuard<'a, Vec<PageRecord>>),
}

impl<'a> std::ops::Deref for GroupGuard<'a> {
    type Target = Vec<PageRecord>;

    fn deref(&self) -> &Vec<PageRecord> {
        match self {
            GroupGuard::Read(g) => g,
            GroupGuard::Write(g) => g,
        }
    }
}

pub enum GroupGuardMut<'a> {
    Write(RwLockWriteGuard<'a, Vec<PageRecord>>),
}

impl<'a> std::ops::Deref for GroupGuardMut<'a> {
    type Target = Vec<PageRecord>;

    fn deref(&self) -> &Vec<PageRecord> {
        match self {
            GroupGuardMut::Write(g) => g,
        }
    }
}

impl<'a> std::ops::DerefMut for GroupGuardMut<'a> {
    fn deref_mut(&mut self) -> &mut Vec<PageRecord> {
        match self {
            GroupGuardMut::Write(g) => g,
        }
    }
}

impl LockGroup {
    fn new(pages: Vec<PageRecord>) -> Self {
        LockGroup {
            pages: RwLock::new(pages),
        }
    }

    /// Acquires this group for a read-only whole-page access. Under
    /// `WriterOnly` this still takes the exclusive lock.
    pub fn acquire_read(&self, policy: LockPolicy) -> GroupGuard<'_> {
        match policy {
            LockPolicy::ReaderWriter => GroupGuard::Read(self.pages.read()),
            LockPolicy::WriterOnly => GroupGuard::Write(self.pages.write()),
        }
    }

    /// Acquires this group exclusively, for any access that mutates page state —
    /// including `read_blocks`, which logs into the block-order cache (§4.2).
    pub fn acquire_write(&self) -> GroupGuardMut<'_> {
        GroupGuardMut::Write(self.pages.write())
    }
}

/// The full page table: `page_count` records grouped into `lock_count` lock
/// groups of up to `pages_per_group` pages each.
pub struct PageTable {
    groups: Vec<LockGroup>,
    pages_per_group: u32,
    page_count: u64,
}

impl PageTable {
    pub fn new(page_count: u64, pages_per_group: u32) -> Self {
        let group_count = page_count.div_ceil(pages_per_group as u64);
        let mut groups = Vec::with_capacity(group_count as usize);
        let mut remaining = page_count;
        for _ in 0..group_count {
            let n = remaining.min(pages_per_group as u64) as usize;
            remaining -= n as u64;
            groups.push(LockGroup::new((0..n).map(|_| PageRecord::empty()).collect()));
        }
        PageTable {
            groups,
            pages_per_group,
            page_count,
        }
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_of(&self, page_index: u64) -> (usize, usize) {
        let group = (page_index / self.pages_per_group as u64) as usize;
        let offset = (page_index % self.pages_per_group as u64) as usize;
        (group, offset)
    }

    pub fn group(&self, index: usize) -> &LockGroup {
        &self.groups[index]
    }
}
