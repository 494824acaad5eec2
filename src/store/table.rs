//! Table accessor
//!
//! A stateful cursor bound to one table. Accessors hold the table's id
//! plus a slot hint and re-resolve the live catalog entry under the engine
//! lock on every operation, so expansion, compaction, or deletion of the
//! table can never leave an accessor reading through a stale offset: a
//! relocated table is re-read, a deleted one surfaces as `NotFound`.
//!
//! Records are opaque fixed-size byte rows whose first four bytes are the
//! record id. Callers pass row buffers whose length is a multiple of the
//! table's row size; insert/update/delete operate on each row-size chunk.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, RowStoreError};
use crate::file::BackingFile;
use crate::format::{row_rid, set_row_rid, Rid, TableInfo, RID_SIZE};

use super::datafile::{DataFileInner, Session};

/// Cursor-based accessor for one table
///
/// Each accessor has its own cursor; the catalog entry and backing file
/// are shared through the engine lock, so mutations made through one
/// accessor are immediately visible to all others.
#[derive(Debug)]
pub struct Table {
    inner: Arc<Mutex<DataFileInner>>,
    table_id: u32,
    slot_hint: usize,
    /// Zero-based slot index, clamped to `[0, entries]`
    cursor: u32,
}

impl Table {
    pub(crate) fn new(inner: Arc<Mutex<DataFileInner>>, table_id: u32, slot_hint: usize) -> Self {
        Self {
            inner,
            table_id,
            slot_hint,
            cursor: 0,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Position the cursor at the first record
    pub fn move_first(&mut self) {
        self.cursor = 0;
    }

    /// Position the cursor one past the last record
    pub fn move_last(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;
        let entry = table_entry(session.tables.get(slot))?;
        self.cursor = entry.entries;
        Ok(())
    }

    /// Set the cursor, clamped to `[0, entries]`; returns the new position
    pub fn set_position(&mut self, position: u32) -> Result<u32> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;
        let entry = table_entry(session.tables.get(slot))?;
        self.cursor = position.min(entry.entries);
        Ok(self.cursor)
    }

    /// Current cursor position
    pub fn position(&self) -> u32 {
        self.cursor
    }

    /// Skip the next `skip` records, clamped to one past the last record;
    /// returns the new position
    pub fn move_by(&mut self, skip: u32) -> Result<u32> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;
        let entry = table_entry(session.tables.get(slot))?;
        self.cursor = self.cursor.saturating_add(skip).min(entry.entries);
        Ok(self.cursor)
    }

    /// Whether a record with the given id exists
    ///
    /// Resets the cursor to the first record, then scans forward; the
    /// cursor ends just past the match, or at end of data when absent.
    pub fn find(&mut self, rid: Rid) -> Result<bool> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;

        let Session { file, tables, .. } = session;
        let entry = table_entry(tables.get(slot))?;

        self.cursor = 0;
        let found = scan_for_rid(file, entry, rid)?;
        self.cursor = match found {
            Some(slot) => slot + 1,
            None => entry.entries,
        };
        Ok(found.is_some())
    }

    // =========================================================================
    // Record I/O
    // =========================================================================

    /// Read up to `buf.len() / row_size` records at the cursor
    ///
    /// `buf` must be a nonzero multiple of the row size. The buffer is
    /// zero-filled first; only as many records as remain before end of
    /// data are read. Advances the cursor by the records read and returns
    /// that count (0 at end of data).
    pub fn fetch(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;

        let Session { file, tables, .. } = session;
        let entry = table_entry(tables.get(slot))?;
        let row_size = entry.row_size as usize;
        let requested = validate_rows(buf.len(), row_size)? as u32;

        buf.fill(0);

        // Another accessor may have shrunk the table under this cursor
        let cursor = self.cursor.min(entry.entries);
        let count = requested.min(entry.entries - cursor);
        if count == 0 {
            self.cursor = cursor;
            return Ok(0);
        }

        let region = entry.region();
        file.seek(region.slot_offset(cursor))?;
        file.read_exact(&mut buf[..count as usize * row_size])?;

        self.cursor = cursor + count;
        trace!(table = self.table_id, cursor, count, "fetched records");
        Ok(count as usize)
    }

    /// Append records, assigning each a fresh monotonic record id
    ///
    /// `rows` must be a nonzero multiple of the row size; the leading four
    /// bytes of every row are overwritten with the assigned id. Expands
    /// the table first when the batch would exceed its capacity. Resets
    /// the cursor to the first record. Returns the records written.
    pub fn insert(&mut self, rows: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        self.cursor = 0;

        let slot = {
            let session = inner.session_mut()?;
            Self::resolve(session, self.table_id, &mut self.slot_hint)?
        };

        let (row_size, entries, mut slots) = {
            let session = inner.session_mut()?;
            let entry = table_entry(session.tables.get(slot))?;
            (entry.row_size as usize, entry.entries, entry.slots)
        };
        let count = validate_rows(rows.len(), row_size)? as u32;

        // Grow until the batch fits; growth factor is nonzero by
        // construction so this terminates
        while entries + count > slots {
            inner.expand_table_slot(slot)?;
            let session = inner.session_mut()?;
            slots = table_entry(session.tables.get(slot))?.slots;
        }

        let session = inner.session_mut()?;
        let Session { file, tables, .. } = session;
        let entry = tables
            .get_mut(slot)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;

        for chunk in rows.chunks_exact_mut(row_size) {
            entry.last_record_id += 1;
            set_row_rid(chunk, entry.last_record_id);
        }

        let region = entry.region();
        file.seek(region.slot_offset(entry.entries))?;
        file.write_all(rows)?;

        // Bookkeeping commits only after the write succeeded
        entry.entries += count;

        trace!(table = self.table_id, count, last_rid = entry.last_record_id, "inserted records");
        Ok(count as usize)
    }

    /// Overwrite existing records in place, matched by record id
    ///
    /// Rows whose id is not found are silently skipped; compare the
    /// returned count against the batch size to detect partial
    /// application. Resets the cursor to the first record.
    pub fn update(&mut self, rows: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        self.cursor = 0;

        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;

        let Session { file, tables, .. } = session;
        let entry = table_entry(tables.get(slot))?;
        let row_size = entry.row_size as usize;
        validate_rows(rows.len(), row_size)?;

        let mut updated = 0;
        for chunk in rows.chunks_exact(row_size) {
            let rid = row_rid(chunk);
            if let Some(victim) = scan_for_rid(file, entry, rid)? {
                file.seek(entry.region().slot_offset(victim))?;
                file.write_all(chunk)?;
                updated += 1;
            }
        }

        trace!(table = self.table_id, updated, "updated records");
        Ok(updated)
    }

    /// Remove records matched by record id
    ///
    /// Constant-time removal by swap-with-last: the last live record's
    /// bytes move into the vacated slot, the old last slot is zeroed, and
    /// the entry count drops by one. Record order is not preserved. Rows
    /// whose id is not found are skipped. Resets the cursor to the first
    /// record. Returns the records removed.
    pub fn delete(&mut self, rows: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        self.cursor = 0;

        let session = inner.session_mut()?;
        let slot = Self::resolve(session, self.table_id, &mut self.slot_hint)?;

        let Session { file, tables, .. } = session;
        let entry = tables
            .get_mut(slot)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;
        let row_size = entry.row_size as usize;
        validate_rows(rows.len(), row_size)?;

        let mut scratch = vec![0u8; row_size];
        let mut deleted = 0;

        for chunk in rows.chunks_exact(row_size) {
            let rid = row_rid(chunk);
            let victim = match scan_for_rid(file, entry, rid)? {
                Some(victim) => victim,
                None => continue,
            };

            let region = entry.region();
            let last = entry.entries - 1;

            // Move the last live record into the vacated slot
            file.seek(region.slot_offset(last))?;
            file.read_exact(&mut scratch)?;
            file.seek(region.slot_offset(victim))?;
            file.write_all(&scratch)?;

            // Zero what was the last slot
            scratch.fill(0);
            file.seek(region.slot_offset(last))?;
            file.write_all(&scratch)?;

            entry.entries = last;
            deleted += 1;
        }

        trace!(table = self.table_id, deleted, "deleted records");
        Ok(deleted)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// The table's unique id
    pub fn id(&self) -> u32 {
        self.table_id
    }

    /// Records currently in the table
    pub fn record_count(&self) -> Result<u32> {
        self.with_entry(|entry| entry.entries)
    }

    /// Total record capacity before the next expansion
    pub fn slot_count(&self) -> Result<u32> {
        self.with_entry(|entry| entry.slots)
    }

    /// Remaining capacity in records
    pub fn free_slots(&self) -> Result<u32> {
        self.with_entry(|entry| entry.slots - entry.entries)
    }

    /// Fixed record size in bytes
    pub fn row_size(&self) -> Result<u32> {
        self.with_entry(|entry| entry.row_size)
    }

    /// The table's name
    pub fn name(&self) -> Result<String> {
        self.with_entry(|entry| entry.name())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Slot of the live catalog entry for this table
    ///
    /// Tries the cached hint first, then rescans by id; the table may have
    /// been deleted out from under this accessor.
    fn resolve(session: &Session, table_id: u32, slot_hint: &mut usize) -> Result<usize> {
        let slot = resolve_slot(session, table_id, *slot_hint)?;
        *slot_hint = slot;
        Ok(slot)
    }

    fn with_entry<T>(&self, read: impl FnOnce(&TableInfo) -> T) -> Result<T> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        let slot = resolve_slot(session, self.table_id, self.slot_hint)?;
        let entry = table_entry(session.tables.get(slot))?;
        Ok(read(entry))
    }
}

fn resolve_slot(session: &Session, table_id: u32, hint: usize) -> Result<usize> {
    if let Some(entry) = session.tables.get(hint) {
        if entry.id == table_id {
            return Ok(hint);
        }
    }
    session
        .tables
        .find_by_id(table_id)
        .ok_or_else(|| RowStoreError::NotFound(format!("table id {} no longer exists", table_id)))
}

fn table_entry(entry: Option<&TableInfo>) -> Result<&TableInfo> {
    entry.ok_or_else(|| RowStoreError::Corrupted("table slot out of range".to_string()))
}

/// Linear scan of the live region for a record id; returns its slot
fn scan_for_rid(file: &mut BackingFile, entry: &TableInfo, rid: Rid) -> Result<Option<u32>> {
    let region = entry.region();
    let mut prefix = [0u8; RID_SIZE];

    for slot in 0..entry.entries {
        file.seek(region.slot_offset(slot))?;
        file.read_exact(&mut prefix)?;
        if row_rid(&prefix) == rid {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

/// Row-buffer shape check: nonzero multiple of the row size
fn validate_rows(buf_len: usize, row_size: usize) -> Result<usize> {
    if buf_len == 0 || buf_len % row_size != 0 {
        return Err(RowStoreError::InvalidArgument(format!(
            "buffer length {} is not a nonzero multiple of row size {}",
            buf_len, row_size
        )));
    }
    Ok(buf_len / row_size)
}
