//! Catalog entries
//!
//! Both catalogs store fixed 64-byte slots. A slot with `id == 0` is free;
//! zeroed bytes decode to a free slot, so freshly initialized catalog
//! regions are all-free by construction.
//!
//! ```text
//! id (4) | name (32) | offset (8) | size (4) | entries (4) |
//! slots (4) | growth (4) | tail (4)
//! ```
//!
//! The tail field is `last_record_id` for tables and `table_id` for
//! indexes.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, RowStoreError};

use super::{Region, Rid};

/// Encoded size of one catalog slot
pub const ENTRY_SIZE: u32 = 64;

/// Maximum object name length in bytes
pub const MAX_NAME_LEN: usize = 32;

/// Common shape of a catalog slot: a self-describing object with its own
/// data region, encoded to exactly [`ENTRY_SIZE`] bytes.
pub trait CatalogEntry: Clone + Default {
    /// Encoded size of one slot in bytes
    const SIZE: u32;

    /// Object id; zero marks a free slot
    fn id(&self) -> u32;

    fn encode(&self, buf: &mut BytesMut);

    /// Decode from exactly [`ENTRY_SIZE`] bytes
    fn decode(buf: &mut &[u8]) -> Self;

    /// Raw NUL-padded name bytes
    fn name_bytes(&self) -> &[u8; MAX_NAME_LEN];

    fn is_free(&self) -> bool {
        self.id() == 0
    }

    /// Exact, case-sensitive name match
    fn name_matches(&self, name: &str) -> bool {
        let bytes = self.name_bytes();
        let trimmed = match bytes.iter().position(|&b| b == 0) {
            Some(pos) => &bytes[..pos],
            None => &bytes[..],
        };
        trimmed == name.as_bytes()
    }
}

/// Table catalog slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Unique table id (0 == free slot)
    pub id: u32,
    name: [u8; MAX_NAME_LEN],
    /// Absolute offset of the table's data region
    pub offset: u64,
    /// Bytes per record
    pub row_size: u32,
    /// Records in use
    pub entries: u32,
    /// Record capacity
    pub slots: u32,
    /// Slots added per expansion
    pub growth_factor: u32,
    /// Monotonic record id counter; rids are never reused
    pub last_record_id: Rid,
}

impl TableInfo {
    /// Set the table name, rejecting empty or over-long names
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.name = pack_name(name)?;
        Ok(())
    }

    /// Table name as stored (NUL padding stripped)
    pub fn name(&self) -> String {
        unpack_name(&self.name)
    }

    /// The file region holding this table's rows
    pub fn region(&self) -> Region {
        Region::new(self.offset, self.row_size, self.slots)
    }
}

impl Default for TableInfo {
    fn default() -> Self {
        Self {
            id: 0,
            name: [0; MAX_NAME_LEN],
            offset: 0,
            row_size: 0,
            entries: 0,
            slots: 0,
            growth_factor: 0,
            last_record_id: 0,
        }
    }
}

impl CatalogEntry for TableInfo {
    const SIZE: u32 = ENTRY_SIZE;

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.id);
        buf.put_slice(&self.name);
        buf.put_u64_le(self.offset);
        buf.put_u32_le(self.row_size);
        buf.put_u32_le(self.entries);
        buf.put_u32_le(self.slots);
        buf.put_u32_le(self.growth_factor);
        buf.put_u32_le(self.last_record_id);
    }

    fn decode(buf: &mut &[u8]) -> Self {
        let id = buf.get_u32_le();
        let mut name = [0u8; MAX_NAME_LEN];
        buf.copy_to_slice(&mut name);
        Self {
            id,
            name,
            offset: buf.get_u64_le(),
            row_size: buf.get_u32_le(),
            entries: buf.get_u32_le(),
            slots: buf.get_u32_le(),
            growth_factor: buf.get_u32_le(),
            last_record_id: buf.get_u32_le(),
        }
    }

    fn name_bytes(&self) -> &[u8; MAX_NAME_LEN] {
        &self.name
    }
}

/// Index catalog slot
///
/// Bookkeeping only: slots are allocated and persisted, but no index
/// algorithm populates or queries them in this version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Unique index id (0 == free slot)
    pub id: u32,
    name: [u8; MAX_NAME_LEN],
    /// Absolute offset of the index's data region
    pub offset: u64,
    /// Bytes per index entry
    pub size: u32,
    /// Entries in use
    pub entries: u32,
    /// Entry capacity
    pub slots: u32,
    /// Slots added per expansion
    pub growth_factor: u32,
    /// Owning table id
    pub table_id: u32,
}

impl IndexInfo {
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.name = pack_name(name)?;
        Ok(())
    }

    pub fn name(&self) -> String {
        unpack_name(&self.name)
    }
}

impl Default for IndexInfo {
    fn default() -> Self {
        Self {
            id: 0,
            name: [0; MAX_NAME_LEN],
            offset: 0,
            size: 0,
            entries: 0,
            slots: 0,
            growth_factor: 0,
            table_id: 0,
        }
    }
}

impl CatalogEntry for IndexInfo {
    const SIZE: u32 = ENTRY_SIZE;

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.id);
        buf.put_slice(&self.name);
        buf.put_u64_le(self.offset);
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.entries);
        buf.put_u32_le(self.slots);
        buf.put_u32_le(self.growth_factor);
        buf.put_u32_le(self.table_id);
    }

    fn decode(buf: &mut &[u8]) -> Self {
        let id = buf.get_u32_le();
        let mut name = [0u8; MAX_NAME_LEN];
        buf.copy_to_slice(&mut name);
        Self {
            id,
            name,
            offset: buf.get_u64_le(),
            size: buf.get_u32_le(),
            entries: buf.get_u32_le(),
            slots: buf.get_u32_le(),
            growth_factor: buf.get_u32_le(),
            table_id: buf.get_u32_le(),
        }
    }

    fn name_bytes(&self) -> &[u8; MAX_NAME_LEN] {
        &self.name
    }
}

fn pack_name(name: &str) -> Result<[u8; MAX_NAME_LEN]> {
    if name.is_empty() {
        return Err(RowStoreError::InvalidArgument(
            "object name is empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(RowStoreError::InvalidArgument(format!(
            "object name '{}' exceeds {} bytes",
            name, MAX_NAME_LEN
        )));
    }

    let mut packed = [0u8; MAX_NAME_LEN];
    packed[..name.len()].copy_from_slice(name.as_bytes());
    Ok(packed)
}

fn unpack_name(name: &[u8; MAX_NAME_LEN]) -> String {
    let trimmed = match name.iter().position(|&b| b == 0) {
        Some(pos) => &name[..pos],
        None => &name[..],
    };
    String::from_utf8_lossy(trimmed).into_owned()
}
