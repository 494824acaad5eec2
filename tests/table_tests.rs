//! Tests for the table accessor
//!
//! These tests verify:
//! - Insert with record id stamping and automatic expansion
//! - Fetch semantics: zero-fill, clamping, cursor advance
//! - Cursor navigation and clamping
//! - Find scanning and cursor placement
//! - Update in place by record id
//! - Delete by swap-with-last
//! - Accessor validity across expansion and table deletion

use rowstore::format::{row_rid, Rid};
use rowstore::{DataFile, RowStoreError, Table};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const ROW_SIZE: usize = 40;

fn setup_table() -> (TempDir, DataFile, Table) {
    let temp_dir = TempDir::new().unwrap();
    let store = DataFile::new(temp_dir.path().join("store.db"));
    store.create(10).unwrap();
    let table = store.create_table("events", ROW_SIZE as u32, 4, 4).unwrap();
    (temp_dir, store, table)
}

/// Insert `count` rows whose payload byte repeats the row's ordinal
fn insert_rows(table: &mut Table, count: usize) -> Vec<u8> {
    let mut rows = vec![0u8; ROW_SIZE * count];
    for (i, chunk) in rows.chunks_exact_mut(ROW_SIZE).enumerate() {
        chunk[4..].fill(i as u8 + 1);
    }
    assert_eq!(table.insert(&mut rows).unwrap(), count);
    rows
}

/// Record ids of every row in slot order
fn all_rids(table: &mut Table) -> Vec<Rid> {
    let count = table.record_count().unwrap() as usize;
    if count == 0 {
        return Vec::new();
    }
    let mut buf = vec![0u8; ROW_SIZE * count];
    table.move_first();
    assert_eq!(table.fetch(&mut buf).unwrap(), count);
    buf.chunks_exact(ROW_SIZE).map(row_rid).collect()
}

fn row_with_rid(rid: Rid, payload: u8) -> Vec<u8> {
    let mut row = vec![payload; ROW_SIZE];
    row[..4].copy_from_slice(&rid.to_le_bytes());
    row
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_stamps_monotonic_rids() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 3);

    let stamped: Vec<Rid> = rows.chunks_exact(ROW_SIZE).map(row_rid).collect();
    assert_eq!(stamped, vec![1, 2, 3]);
    assert_eq!(table.record_count().unwrap(), 3);
    assert_eq!(table.position(), 0);
}

#[test]
fn test_insert_expands_full_table() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 4);
    assert_eq!(table.free_slots().unwrap(), 0);

    // Fifth record triggers one expansion of 4 slots
    insert_rows(&mut table, 1);
    assert_eq!(table.record_count().unwrap(), 5);
    assert_eq!(table.slot_count().unwrap(), 8);
    assert_eq!(all_rids(&mut table), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_insert_batch_larger_than_capacity() {
    let (_temp, _store, mut table) = setup_table();

    // 11 records into 4 slots: expansion repeats until the batch fits
    insert_rows(&mut table, 11);
    assert_eq!(table.record_count().unwrap(), 11);
    assert_eq!(table.slot_count().unwrap(), 12);
    assert_eq!(all_rids(&mut table), (1..=11).collect::<Vec<Rid>>());
}

#[test]
fn test_insert_rejects_bad_buffer() {
    let (_temp, _store, mut table) = setup_table();

    let mut empty: [u8; 0] = [];
    assert!(matches!(
        table.insert(&mut empty).unwrap_err(),
        RowStoreError::InvalidArgument(_)
    ));

    let mut partial = vec![0u8; ROW_SIZE + 1];
    assert!(matches!(
        table.insert(&mut partial).unwrap_err(),
        RowStoreError::InvalidArgument(_)
    ));
}

#[test]
fn test_rids_not_reused_after_delete() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 3);
    table.delete(&rows).unwrap();
    assert_eq!(table.record_count().unwrap(), 0);

    let fresh = insert_rows(&mut table, 2);
    let stamped: Vec<Rid> = fresh.chunks_exact(ROW_SIZE).map(row_rid).collect();
    assert_eq!(stamped, vec![4, 5]);
}

// =============================================================================
// Fetch Tests
// =============================================================================

#[test]
fn test_fetch_reads_in_slot_order() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 3);

    let mut buf = vec![0u8; ROW_SIZE * 3];
    table.move_first();
    assert_eq!(table.fetch(&mut buf).unwrap(), 3);
    assert_eq!(buf, rows);
    assert_eq!(table.position(), 3);
}

#[test]
fn test_fetch_clamps_to_remaining_records() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 2);

    // Room for 4 rows but only 2 exist; the tail stays zeroed
    let mut buf = vec![0xAAu8; ROW_SIZE * 4];
    table.move_first();
    assert_eq!(table.fetch(&mut buf).unwrap(), 2);
    assert!(buf[ROW_SIZE * 2..].iter().all(|&b| b == 0));

    // At end of data every further fetch returns zero records
    assert_eq!(table.fetch(&mut buf).unwrap(), 0);
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn test_fetch_rejects_bad_buffer() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 1);

    let mut empty: [u8; 0] = [];
    assert!(matches!(
        table.fetch(&mut empty).unwrap_err(),
        RowStoreError::InvalidArgument(_)
    ));

    let mut partial = vec![0u8; ROW_SIZE - 1];
    assert!(matches!(
        table.fetch(&mut partial).unwrap_err(),
        RowStoreError::InvalidArgument(_)
    ));
}

#[test]
fn test_fetch_single_rows_walks_the_table() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    let mut buf = vec![0u8; ROW_SIZE];
    table.move_first();
    let mut seen = Vec::new();
    while table.fetch(&mut buf).unwrap() == 1 {
        seen.push(row_rid(&buf));
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn test_cursor_positioning_clamps() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    assert_eq!(table.set_position(2).unwrap(), 2);
    assert_eq!(table.set_position(99).unwrap(), 3);

    table.move_first();
    assert_eq!(table.move_by(1).unwrap(), 1);
    assert_eq!(table.move_by(10).unwrap(), 3);

    table.move_last().unwrap();
    assert_eq!(table.position(), 3);
}

#[test]
fn test_cursor_resumes_mid_table() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    let mut buf = vec![0u8; ROW_SIZE];
    table.set_position(1).unwrap();
    assert_eq!(table.fetch(&mut buf).unwrap(), 1);
    assert_eq!(row_rid(&buf), 2);
}

// =============================================================================
// Find Tests
// =============================================================================

#[test]
fn test_find_existing_and_missing() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    assert!(table.find(2).unwrap());
    assert!(!table.find(99).unwrap());
    assert!(!table.find(0).unwrap());
}

#[test]
fn test_find_leaves_cursor_past_match() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    assert!(table.find(1).unwrap());
    let mut buf = vec![0u8; ROW_SIZE];
    assert_eq!(table.fetch(&mut buf).unwrap(), 1);
    assert_eq!(row_rid(&buf), 2);

    // Missing rid parks the cursor at end of data
    assert!(!table.find(99).unwrap());
    assert_eq!(table.position(), 3);
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_overwrites_in_place() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 3);

    table.update(&row_with_rid(2, 0xEE)).unwrap();

    let mut buf = vec![0u8; ROW_SIZE * 3];
    table.move_first();
    table.fetch(&mut buf).unwrap();
    let updated = &buf[ROW_SIZE..ROW_SIZE * 2];
    assert_eq!(row_rid(updated), 2);
    assert!(updated[4..].iter().all(|&b| b == 0xEE));

    // Neighbors untouched
    assert!(buf[4..ROW_SIZE].iter().all(|&b| b == 1));
    assert!(buf[ROW_SIZE * 2 + 4..].iter().all(|&b| b == 3));
}

#[test]
fn test_update_skips_missing_rids() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 2);

    let mut batch = row_with_rid(1, 0xEE);
    batch.extend_from_slice(&row_with_rid(99, 0xEE));
    assert_eq!(table.update(&batch).unwrap(), 1);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_swaps_last_record_in() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 5);

    // Victim slot inherits the last record's bytes
    assert_eq!(table.delete(&rows[ROW_SIZE..ROW_SIZE * 2]).unwrap(), 1);
    assert_eq!(table.record_count().unwrap(), 4);
    assert_eq!(all_rids(&mut table), vec![1, 5, 3, 4]);
    assert!(!table.find(2).unwrap());
    assert!(table.find(5).unwrap());
}

#[test]
fn test_delete_last_record() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 3);

    // The last record is its own swap partner
    assert_eq!(table.delete(&rows[ROW_SIZE * 2..]).unwrap(), 1);
    assert_eq!(all_rids(&mut table), vec![1, 2]);
}

#[test]
fn test_delete_missing_rid_is_skipped() {
    let (_temp, _store, mut table) = setup_table();
    insert_rows(&mut table, 2);

    assert_eq!(table.delete(&row_with_rid(99, 0)).unwrap(), 0);
    assert_eq!(table.record_count().unwrap(), 2);
}

#[test]
fn test_delete_all_records() {
    let (_temp, _store, mut table) = setup_table();
    let rows = insert_rows(&mut table, 4);

    assert_eq!(table.delete(&rows).unwrap(), 4);
    assert_eq!(table.record_count().unwrap(), 0);
    assert_eq!(all_rids(&mut table), Vec::<Rid>::new());
}

// =============================================================================
// Accessor Validity Tests
// =============================================================================

#[test]
fn test_accessor_survives_relocation() {
    let temp_dir = TempDir::new().unwrap();
    let store = DataFile::new(temp_dir.path().join("store.db"));
    store.create(10).unwrap();

    let mut first = store.create_table("first", ROW_SIZE as u32, 4, 4).unwrap();
    let rows = insert_rows(&mut first, 3);
    store.create_table("second", ROW_SIZE as u32, 4, 4).unwrap();

    // "first" is now interior; expansion relocates its region
    store.expand_table("first").unwrap();

    let mut buf = vec![0u8; ROW_SIZE * 3];
    first.move_first();
    assert_eq!(first.fetch(&mut buf).unwrap(), 3);
    assert_eq!(buf, rows);
}

#[test]
fn test_accessor_fails_after_table_delete() {
    let (_temp, store, mut table) = setup_table();
    insert_rows(&mut table, 2);
    store.delete_table("events").unwrap();

    let mut buf = vec![0u8; ROW_SIZE];
    assert!(matches!(
        table.fetch(&mut buf).unwrap_err(),
        RowStoreError::NotFound(_)
    ));
    assert!(matches!(
        table.record_count().unwrap_err(),
        RowStoreError::NotFound(_)
    ));
}

#[test]
fn test_two_accessors_share_one_table() {
    let (_temp, store, mut writer) = setup_table();
    let mut reader = store.table("events").unwrap();

    insert_rows(&mut writer, 2);
    assert_eq!(reader.record_count().unwrap(), 2);

    let mut buf = vec![0u8; ROW_SIZE];
    reader.move_first();
    assert_eq!(reader.fetch(&mut buf).unwrap(), 1);
    assert_eq!(row_rid(&buf), 1);

    // Both accessors observe the same counter
    insert_rows(&mut reader, 1);
    assert_eq!(writer.record_count().unwrap(), 3);
}
