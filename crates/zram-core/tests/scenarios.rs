//! Integration tests for the concrete scenarios and invariants layed out for this
//! store's public API: round-trip, zero-read, delete idempotence, huge stability,
//! and cross-page block writes.

use zram_core::allocator::DirectAllocator;
use zram_core::compressor::{BlockAwareLz4Compressor, Lz4Compressor};
use zram_core::config::Config;
use zram_core::store::Store;
use zram_core::LockPolicy;

fn small_config() -> Config {
    Config {
        block_shift: 8,  // 256 B blocks
        page_shift: 12,  // 4096 B pages -> 16 blocks/page
        block_count: 64, // 4 pages
        max_non_huge_percent: 75,
        huge_wait: 4,
        pages_per_lock_group: 2,
    }
}

/// Deterministic pseudo-random fill, incompressible enough to defeat LZ4.
fn fill_incompressible(buf: &mut [u8], seed: u64) {
    let mut state = seed | 1;
    for b in buf.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *b = (state & 0xff) as u8;
    }
}

#[test]
fn scenario_1_empty_page_reads_as_zero() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let mut out = vec![0xffu8; cfg.page_size()];
    store.read_pages(0, 1, &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0));
    assert!(!store.page_exists(0).unwrap());
    assert_eq!(store.total_size(), 0);
}

#[test]
fn scenario_2_single_write_read_round_trips() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let page: Vec<u8> = (0..cfg.page_size()).map(|i| (i % 251) as u8).collect();
    store.write_pages(0, 1, &page).unwrap();
    let mut out = vec![0u8; cfg.page_size()];
    store.read_pages(0, 1, &mut out).unwrap();
    assert_eq!(out, page);
    assert_eq!(store.pages_stored(), 1);
}

#[test]
fn scenario_3_incompressible_page_becomes_huge_and_recovers() {
    // huge_wait equals blocks_per_page so the loop below zeroes the whole page
    // exactly once by the time recompression is attempted.
    let mut cfg = small_config();
    cfg.huge_wait = cfg.blocks_per_page() as u8;
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let mut page = vec![0u8; cfg.page_size()];
    fill_incompressible(&mut page, 0xDEADBEEF);
    store.write_pages(0, 1, &page).unwrap();
    assert!(store.page_is_huge(0).unwrap());
    assert_eq!(store.huge_pages(), 1);

    let zeros = vec![0u8; cfg.block_size()];
    let blocks_per_page = cfg.blocks_per_page() as u64;
    for i in 0..blocks_per_page - 1 {
        store.write_blocks(i, 1, &zeros).unwrap();
        assert!(store.page_is_huge(0).unwrap(), "page should remain huge before huge_wait is reached");
    }
    // The last block's write reaches huge_wait and forces a recompression
    // attempt; the page is now entirely zero, so it must compress successfully.
    store.write_blocks(blocks_per_page - 1, 1, &zeros).unwrap();
    assert!(!store.page_is_huge(0).unwrap());
    assert_eq!(store.huge_pages(), 0);
}

#[test]
fn scenario_4_zeroing_every_block_empties_a_block_aware_page() {
    let cfg = small_config();
    let blocks_per_page = cfg.blocks_per_page();
    let store = Store::open(
        cfg,
        BlockAwareLz4Compressor::new(blocks_per_page),
        DirectAllocator,
        LockPolicy::ReaderWriter,
    )
    .unwrap();

    let data = vec![0x7Au8; cfg.block_size()];
    store.write_blocks(0, 1, &data).unwrap();
    assert!(store.page_exists(0).unwrap());
    assert_eq!(store.pages_stored(), 1);

    store.delete_blocks(0, 1).unwrap();
    assert!(!store.page_exists(0).unwrap());
    assert_eq!(store.pages_stored(), 0);
}

#[test]
fn scenario_5_cache_promotion_is_transparent_through_reads_and_deletes() {
    let cfg = small_config();
    let blocks_per_page = cfg.blocks_per_page();
    let store = Store::open(
        cfg,
        BlockAwareLz4Compressor::new(blocks_per_page),
        DirectAllocator,
        LockPolicy::ReaderWriter,
    )
    .unwrap();

    let block = |fill: u8| vec![fill; cfg.block_size()];
    store.write_blocks(0, 1, &block(0xAA)).unwrap();
    store.write_blocks(1, 1, &block(0xBB)).unwrap();
    store.write_blocks(2, 1, &block(0xCC)).unwrap();

    // Read block 2 repeatedly so it gets promoted to the front of the
    // permutation (§4.4): enough reads of the same cold block turn it into a
    // `next` candidate and then promote it.
    let mut scratch = vec![0u8; cfg.block_size()];
    for _ in 0..4 {
        store.read_blocks(2, 1, &mut scratch).unwrap();
    }

    // Rewriting block 1 forces a decompress/recompress, which applies the
    // pending permutation: block 2 now sits at a different physical slot than
    // its logical index.
    store.write_blocks(1, 1, &block(0xBB)).unwrap();

    // Deleting block 0 must not lose blocks 1 and 2, even though the bitset's
    // physical layout no longer matches logical block order.
    store.delete_blocks(0, 1).unwrap();
    assert!(
        store.page_exists(0).unwrap(),
        "page still holds live data in blocks 1 and 2"
    );

    let mut out = vec![0u8; cfg.page_size()];
    store.read_pages(0, 1, &mut out).unwrap();
    let bs = cfg.block_size();
    assert!(out[0..bs].iter().all(|&b| b == 0), "block 0 was deleted");
    assert!(
        out[bs..2 * bs].iter().all(|&b| b == 0xBB),
        "block 1 survives the permutation"
    );
    assert!(
        out[2 * bs..3 * bs].iter().all(|&b| b == 0xCC),
        "block 2 survives the permutation"
    );

    // Deleting the remaining nonzero blocks must then report the page empty.
    store.delete_blocks(1, 1).unwrap();
    store.delete_blocks(2, 1).unwrap();
    assert!(!store.page_exists(0).unwrap());
}

#[test]
fn scenario_6_cross_page_block_write_round_trips() {
    let cfg = small_config(); // 16 blocks/page, 2 pages/lock group
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();

    // blk_addr=14, blocks=20 spans pages 0 (partial), 1 (full), 2 (partial).
    let data: Vec<u8> = (0..20 * cfg.block_size()).map(|i| (i % 200) as u8).collect();
    store.write_blocks(14, 20, &data).unwrap();

    let mut out = vec![0u8; 20 * cfg.block_size()];
    store.read_blocks(14, 20, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn delete_pages_is_idempotent() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let page = vec![0x11u8; cfg.page_size()];
    store.write_pages(0, 1, &page).unwrap();
    assert_eq!(store.pages_stored(), 1);

    store.delete_pages(0, 1).unwrap();
    assert_eq!(store.pages_stored(), 0);
    store.delete_pages(0, 1).unwrap();
    assert_eq!(store.pages_stored(), 0);

    let mut out = vec![0xffu8; cfg.page_size()];
    store.read_pages(0, 1, &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn bad_range_is_rejected_without_mutating_state() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let data = vec![1u8; cfg.block_size()];
    let err = store.write_blocks(cfg.block_count, 1, &data).unwrap_err();
    assert_eq!(err.code(), -1);
    assert_eq!(store.pages_stored(), 0);
}

#[test]
fn exit_clears_pages_and_compression_counters() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::ReaderWriter).unwrap();
    let page = vec![0x22u8; cfg.page_size()];
    store.write_pages(0, 1, &page).unwrap();
    assert!(store.num_compr() > 0);
    store.exit().unwrap();
    assert_eq!(store.pages_stored(), 0);
    assert_eq!(store.num_compr(), 0);
    assert_eq!(store.failed_compr(), 0);
}

#[test]
fn writer_only_lock_policy_still_serves_reads() {
    let cfg = small_config();
    let store = Store::open(cfg, Lz4Compressor, DirectAllocator, LockPolicy::WriterOnly).unwrap();
    let page: Vec<u8> = (0..cfg.page_size()).map(|i| (i % 13) as u8).collect();
    store.write_pages(0, 1, &page).unwrap();
    let mut out = vec![0u8; cfg.page_size()];
    store.read_pages(0, 1, &mut out).unwrap();
    assert_eq!(out, page);
}
