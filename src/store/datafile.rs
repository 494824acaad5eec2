//! Data file manager
//!
//! Owns the backing file, the header, and both catalogs, and exposes the
//! file lifecycle (create/open/close/save/compact) plus table lifecycle
//! (create/delete/expand/lookup).
//!
//! ## Concurrency
//! One engine-wide `parking_lot::Mutex` guards all state. Every manager
//! operation and every [`Table`] accessor operation holds it for its full
//! duration, so structural mutations (expansion, compaction, table delete)
//! can never interleave with record reads or writes. Guards are scoped;
//! the lock is released on every exit path, including error propagation.
//!
//! ## State machine
//! ```text
//! closed ──create/open──▶ open ──close/compact──▶ closed
//! ```
//! All in-memory catalog state lives in a [`Session`] that exists only
//! while the file is open.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Result, RowStoreError};
use crate::file::BackingFile;
use crate::format::{
    FileHeader, IndexInfo, TableInfo, ENTRY_SIZE, FILL_BYTE, HEADER_SIZE, RID_SIZE,
};

use super::table::Table;

/// In-memory state of an open file
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) file: BackingFile,
    pub(crate) header: FileHeader,
    pub(crate) tables: Catalog<TableInfo>,
    pub(crate) indexes: Catalog<IndexInfo>,
}

/// State behind the engine lock
#[derive(Debug)]
pub(crate) struct DataFileInner {
    path: PathBuf,
    config: Config,
    /// Chunk buffer for region copies (expansion, compaction)
    buffer: Vec<u8>,
    pub(crate) session: Option<Session>,
}

impl DataFileInner {
    pub(crate) fn session_mut(&mut self) -> Result<&mut Session> {
        let path = self.path.display().to_string();
        self.session
            .as_mut()
            .ok_or(RowStoreError::NotOpen(path))
    }

    fn open_session(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(RowStoreError::AlreadyOpen(self.path.display().to_string()));
        }

        let mut file = BackingFile::new(&self.path);
        file.open()?;

        let mut raw = [0u8; HEADER_SIZE as usize];
        file.seek(0)?;
        file.read_exact(&mut raw)?;
        let header = FileHeader::decode(&raw)?;

        // Counts and offsets are trusted as recorded; no consistency scan
        let tables = Catalog::load(&mut file, &header.tables)?;
        let indexes = Catalog::load(&mut file, &header.indexes)?;

        info!(
            path = %self.path.display(),
            tables = header.tables.entries,
            data_end = header.data_end,
            "data file opened"
        );

        self.session = Some(Session {
            file,
            header,
            tables,
            indexes,
        });
        Ok(())
    }

    /// Grow one table's data region, in place when it sits at the tail of
    /// the data region, otherwise by relocating it to the tail.
    ///
    /// Bookkeeping (entry offset/slots, `data_end`) commits only after the
    /// file extend and any byte copy succeed.
    pub(crate) fn expand_table_slot(&mut self, slot: usize) -> Result<()> {
        let buffer = &mut self.buffer;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(RowStoreError::NotOpen(self.path.display().to_string())),
        };
        let Session {
            file,
            header,
            tables,
            ..
        } = session;

        let entry = tables
            .get_mut(slot)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;

        let region = entry.region();
        let new_slots = entry.slots + entry.growth_factor;

        if region.end() == header.data_end {
            // Already the tail of the data region: extend in place
            let new_end = region.offset() + entry.row_size as u64 * new_slots as u64;
            file.extend(new_end, FILL_BYTE)?;

            entry.slots = new_slots;
            header.data_end = new_end;

            debug!(
                table = %entry.name(),
                slots = new_slots,
                "table expanded in place"
            );
        } else {
            // Relocate: new region at the tail, copy all existing row bytes
            let new_offset = header.data_end;
            let new_end = new_offset + entry.row_size as u64 * new_slots as u64;
            file.extend(new_end, FILL_BYTE)?;
            copy_within(file, buffer, region.offset(), new_offset, region.byte_len())?;

            entry.offset = new_offset;
            entry.slots = new_slots;
            header.data_end = new_end;

            debug!(
                table = %entry.name(),
                slots = new_slots,
                offset = new_offset,
                "table relocated and expanded"
            );
        }

        Ok(())
    }
}

/// A single-file record store
///
/// Cloneable handle; all clones and all [`Table`] accessors share one
/// engine lock and one backing file.
#[derive(Clone)]
pub struct DataFile {
    inner: Arc<Mutex<DataFileInner>>,
}

impl DataFile {
    /// Bind a store to a path with default configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, Config::default())
    }

    /// Bind a store to a path
    pub fn with_config(path: impl Into<PathBuf>, config: Config) -> Self {
        let buffer = vec![0u8; config.buffer_size.max(1)];
        Self {
            inner: Arc::new(Mutex::new(DataFileInner {
                path: path.into(),
                config,
                buffer,
                session: None,
            })),
        }
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Create a new empty store with capacity for `max_tables` tables
    ///
    /// Fails if the backing file already exists. Nothing is persisted until
    /// [`save`](Self::save) or [`close`](Self::close).
    pub fn create(&self, max_tables: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Err(RowStoreError::AlreadyOpen(inner.path.display().to_string()));
        }

        let mut file = BackingFile::new(&inner.path);
        file.create()?;

        let mut header = FileHeader::new();

        // Table catalog directly after the header
        header.tables.offset = header.data_start;
        header.tables.entry_size = ENTRY_SIZE;
        header.tables.slots = max_tables;
        header.tables.growth_factor = inner.config.table_catalog_growth;
        header.data_end += header.tables.region().byte_len();

        // Index catalog after the table catalog; reserved, zero capacity
        header.indexes.offset = header.data_end;
        header.indexes.entry_size = ENTRY_SIZE;
        header.indexes.slots = 0;
        header.indexes.growth_factor = inner.config.table_catalog_growth;
        header.data_end += header.indexes.region().byte_len();

        let tables = Catalog::new(&header.tables);
        let indexes = Catalog::new(&header.indexes);

        info!(path = %inner.path.display(), max_tables, "data file created");

        inner.session = Some(Session {
            file,
            header,
            tables,
            indexes,
        });
        Ok(())
    }

    /// Create a new empty store sized by the configured table capacity
    pub fn create_default(&self) -> Result<()> {
        let max_tables = self.inner.lock().config.default_tables;
        self.create(max_tables)
    }

    /// Open an existing store: read the header, load both catalogs
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.open_session()
    }

    /// Persist header and catalogs, then close the backing file
    ///
    /// The file is closed and in-memory state discarded even if the final
    /// save fails; the save error is propagated.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let path = inner.path.display().to_string();
        let mut session = inner.session.take().ok_or(RowStoreError::NotOpen(path))?;

        let result = save_session(&mut session);
        session.file.close();

        info!(path = %inner.path.display(), "data file closed");
        result
    }

    /// Persist header and both catalogs, refresh the update timestamp, and
    /// flush. Table data regions are not touched.
    pub fn save(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        save_session(session)
    }

    /// Rewrite the whole file with catalogs and table regions packed, then
    /// replace the original.
    ///
    /// Opens the file if it is closed. Works against a cloned header and
    /// catalogs streamed into a `.tmp` sibling; any failure before the
    /// final rename deletes the temp file and leaves the original as the
    /// authoritative copy. The store is closed afterward.
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.session.is_none() {
            inner.open_session()?;
        }

        let mut dest = BackingFile::new(tmp_path(&inner.path));
        if dest.exists() {
            // Leftover from an earlier interrupted compact
            dest.delete()?;
        }

        let DataFileInner {
            path,
            buffer,
            session,
            ..
        } = &mut *inner;
        let session_ref = match session.as_mut() {
            Some(session) => session,
            None => return Err(RowStoreError::NotOpen(path.display().to_string())),
        };

        if let Err(e) = compact_into(session_ref, buffer, &mut dest) {
            dest.close();
            if dest.exists() {
                let _ = dest.delete();
            }
            return Err(e);
        }

        // The temp file is complete; retire the source and move it into place
        let mut session = match inner.session.take() {
            Some(session) => session,
            None => return Err(RowStoreError::NotOpen(inner.path.display().to_string())),
        };
        session.file.close();

        if let Err(e) = session.file.delete() {
            let _ = dest.delete();
            return Err(e);
        }
        dest.rename(&inner.path)?;

        info!(path = %inner.path.display(), "data file compacted");
        Ok(())
    }

    /// Whether the backing file exists on disk
    pub fn exists(&self) -> bool {
        self.inner.lock().path.exists()
    }

    /// Whether the store is open
    pub fn is_open(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    /// Delete the backing file; the store must be closed
    pub fn delete(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Err(RowStoreError::AlreadyOpen(inner.path.display().to_string()));
        }
        let path = inner.path.clone();
        BackingFile::new(path).delete()
    }

    /// Current physical size of the backing file in bytes
    pub fn file_size(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        match inner.session.as_mut() {
            Some(session) => session.file.size(),
            None => Ok(std::fs::metadata(&inner.path)?.len()),
        }
    }

    /// Snapshot of the current header
    pub fn header(&self) -> Result<FileHeader> {
        let mut inner = self.inner.lock();
        Ok(inner.session_mut()?.header.clone())
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Create a table and return an accessor bound to it
    ///
    /// `row_size` is the fixed record size in bytes (at least the 4-byte
    /// record id prefix); `initial_slots` the starting capacity;
    /// `growth_factor` the slots added per expansion.
    pub fn create_table(
        &self,
        name: &str,
        row_size: u32,
        initial_slots: u32,
        growth_factor: u32,
    ) -> Result<Table> {
        if (row_size as usize) < RID_SIZE {
            return Err(RowStoreError::InvalidArgument(format!(
                "row size {} is below the {}-byte record id prefix",
                row_size, RID_SIZE
            )));
        }
        if initial_slots == 0 || growth_factor == 0 {
            return Err(RowStoreError::InvalidArgument(
                "initial slots and growth factor must be nonzero".to_string(),
            ));
        }

        // Validates the name before any state changes
        let mut info = TableInfo::default();
        info.set_name(name)?;
        info.row_size = row_size;
        info.slots = initial_slots;
        info.growth_factor = growth_factor;

        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;

        if session.tables.find_by_name(name).is_some() {
            return Err(RowStoreError::AlreadyExists(name.to_string()));
        }

        let Session {
            file,
            header,
            tables,
            ..
        } = session;

        let slot = tables.allocate_slot(&mut header.tables, &mut header.data_end, file)?;

        // Append the table's data region at the tail of the data region
        let region_offset = header.data_end;
        let new_end = region_offset + row_size as u64 * initial_slots as u64;
        file.extend(new_end, FILL_BYTE)?;

        header.tables.entries += 1;
        header.tables.last_id += 1;
        info.id = header.tables.last_id;
        info.offset = region_offset;

        let entry = tables
            .get_mut(slot)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;
        *entry = info;
        header.data_end = new_end;

        debug!(table = name, id = header.tables.last_id, slot, offset = region_offset, "table created");

        let id = header.tables.last_id;
        Ok(Table::new(Arc::clone(&self.inner), id, slot))
    }

    /// Create a table with the configured default capacity and growth
    pub fn create_table_with_defaults(&self, name: &str, row_size: u32) -> Result<Table> {
        let (slots, growth) = {
            let inner = self.inner.lock();
            (inner.config.default_slots, inner.config.default_growth_factor)
        };
        self.create_table(name, row_size, slots, growth)
    }

    /// Remove a table from the catalog
    ///
    /// The slot is zeroed and freed; the table's data region stays on disk
    /// until the next [`compact`](Self::compact).
    pub fn delete_table(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;

        let slot = session
            .tables
            .find_by_name(name)
            .ok_or_else(|| RowStoreError::NotFound(name.to_string()))?;

        session.tables.clear_slot(slot);
        session.header.tables.entries -= 1;

        debug!(table = name, slot, "table deleted");
        Ok(())
    }

    /// Grow a table's data region by its growth factor
    pub fn expand_table(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let slot = {
            let session = inner.session_mut()?;
            session
                .tables
                .find_by_name(name)
                .ok_or_else(|| RowStoreError::NotFound(name.to_string()))?
        };
        inner.expand_table_slot(slot)
    }

    /// Look up a table by name and return an accessor bound to it
    pub fn table(&self, name: &str) -> Result<Table> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;

        let slot = session
            .tables
            .find_by_name(name)
            .ok_or_else(|| RowStoreError::NotFound(name.to_string()))?;
        let id = session
            .tables
            .get(slot)
            .map(|entry| entry.id)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;

        Ok(Table::new(Arc::clone(&self.inner), id, slot))
    }

    /// Names of all active tables in catalog order
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        let session = inner.session_mut()?;
        Ok(session
            .tables
            .iter_active()
            .map(|(_, entry)| entry.name())
            .collect())
    }
}

/// Write header and both catalogs, then flush
fn save_session(session: &mut Session) -> Result<()> {
    session.header.touch();

    let Session {
        file,
        header,
        tables,
        indexes,
    } = session;

    file.seek(0)?;
    file.write_all(&header.encode())?;
    tables.save(file, &header.tables)?;
    indexes.save(file, &header.indexes)?;
    file.flush()?;
    Ok(())
}

/// Stream a packed copy of the file into `dest`
///
/// Mutates only cloned state; the live session is untouched.
fn compact_into(session: &mut Session, buffer: &mut [u8], dest: &mut BackingFile) -> Result<()> {
    let mut header = session.header.clone();
    let mut tables = session.tables.clone();
    let indexes = session.indexes.clone();
    let src = &mut session.file;

    // Recompute offsets as if everything were packed with no gaps
    header.tables.offset = header.data_start;
    header.indexes.offset = header.tables.offset + header.tables.region().byte_len();
    header.data_end = header.indexes.offset + header.indexes.region().byte_len();

    dest.create()?;

    // Stream every active table's region to its packed position
    let active: Vec<usize> = tables.iter_active().map(|(slot, _)| slot).collect();
    for slot in active {
        let entry = tables
            .get_mut(slot)
            .ok_or_else(|| RowStoreError::Corrupted(format!("table slot {} out of range", slot)))?;
        let region = entry.region();

        copy_across(src, dest, buffer, region.offset(), header.data_end, region.byte_len())?;

        entry.offset = header.data_end;
        header.data_end += region.byte_len();
    }

    header.touch();
    dest.seek(0)?;
    dest.write_all(&header.encode())?;
    tables.save(dest, &header.tables)?;
    indexes.save(dest, &header.indexes)?;
    dest.flush()?;
    dest.close();
    Ok(())
}

/// Chunked byte copy between two offsets of one file
fn copy_within(
    file: &mut BackingFile,
    buffer: &mut [u8],
    mut src: u64,
    mut dst: u64,
    len: u64,
) -> Result<()> {
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(buffer.len() as u64) as usize;
        file.seek(src)?;
        file.read_exact(&mut buffer[..chunk])?;
        file.seek(dst)?;
        file.write_all(&buffer[..chunk])?;
        src += chunk as u64;
        dst += chunk as u64;
        remaining -= chunk as u64;
    }
    Ok(())
}

/// Chunked byte copy from one file into another
fn copy_across(
    src_file: &mut BackingFile,
    dst_file: &mut BackingFile,
    buffer: &mut [u8],
    mut src: u64,
    mut dst: u64,
    len: u64,
) -> Result<()> {
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(buffer.len() as u64) as usize;
        src_file.seek(src)?;
        src_file.read_exact(&mut buffer[..chunk])?;
        dst_file.seek(dst)?;
        dst_file.write_all(&buffer[..chunk])?;
        src += chunk as u64;
        dst += chunk as u64;
        remaining -= chunk as u64;
    }
    Ok(())
}

/// Sibling temp path for compaction: `<file>.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
