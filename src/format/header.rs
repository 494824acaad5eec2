//! File header and catalog descriptors
//!
//! The header is a 96-byte structure at offset 0: engine version, the two
//! catalog descriptors, the bounds of the used data region, and timestamps.
//! It is written in full on every save and trusted in full on open.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, RowStoreError};

use super::Region;

/// Engine major version; a mismatch on open is a hard error
pub const MAJOR_VERSION: u32 = 1;
/// Engine minor version
pub const MINOR_VERSION: u32 = 0;

/// Encoded size of a [`CatalogDescriptor`]
pub const DESCRIPTOR_SIZE: usize = 28;

/// Encoded size of the [`FileHeader`]; also the start of the data region
pub const HEADER_SIZE: u64 = 96;

/// Describes one catalog slot array in the file
///
/// ```text
/// offset (8) | entry_size (4) | entries (4) | slots (4) | growth (4) | last_id (4)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogDescriptor {
    /// Absolute file offset of the slot array
    pub offset: u64,
    /// Bytes per slot
    pub entry_size: u32,
    /// Slots in use
    pub entries: u32,
    /// Total slot capacity
    pub slots: u32,
    /// Slots added per expansion
    pub growth_factor: u32,
    /// Monotonic id counter; ids are never reused
    pub last_id: u32,
}

impl CatalogDescriptor {
    /// The file region holding this catalog's slots
    pub fn region(&self) -> Region {
        Region::new(self.offset, self.entry_size, self.slots)
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.offset);
        buf.put_u32_le(self.entry_size);
        buf.put_u32_le(self.entries);
        buf.put_u32_le(self.slots);
        buf.put_u32_le(self.growth_factor);
        buf.put_u32_le(self.last_id);
    }

    pub(crate) fn decode(buf: &mut &[u8]) -> Self {
        Self {
            offset: buf.get_u64_le(),
            entry_size: buf.get_u32_le(),
            entries: buf.get_u32_le(),
            slots: buf.get_u32_le(),
            growth_factor: buf.get_u32_le(),
            last_id: buf.get_u32_le(),
        }
    }
}

/// The 96-byte structure written at offset 0
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub major_version: u32,
    pub minor_version: u32,
    /// Table catalog descriptor
    pub tables: CatalogDescriptor,
    /// Index catalog descriptor (reserved; no index algorithms exist yet)
    pub indexes: CatalogDescriptor,
    /// Start of the data region; always equal to `HEADER_SIZE`
    pub data_start: u64,
    /// End of the used data region
    pub data_end: u64,
    /// Unix seconds at file creation
    pub created_at: i64,
    /// Unix seconds at last save
    pub updated_at: i64,
}

impl FileHeader {
    /// A fresh header with an empty data region and current timestamps
    pub fn new() -> Self {
        let now = unix_timestamp();
        Self {
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            tables: CatalogDescriptor::default(),
            indexes: CatalogDescriptor::default(),
            data_start: HEADER_SIZE,
            data_end: HEADER_SIZE,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);
        buf.put_u32_le(self.major_version);
        buf.put_u32_le(self.minor_version);
        self.tables.encode(&mut buf);
        self.indexes.encode(&mut buf);
        buf.put_u64_le(self.data_start);
        buf.put_u64_le(self.data_end);
        buf.put_i64_le(self.created_at);
        buf.put_i64_le(self.updated_at);
        debug_assert_eq!(buf.len(), HEADER_SIZE as usize);
        buf
    }

    /// Decode and validate a header read from offset 0
    pub fn decode(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(RowStoreError::Corrupted(format!(
                "header truncated: {} bytes",
                buf.len()
            )));
        }

        let header = Self {
            major_version: buf.get_u32_le(),
            minor_version: buf.get_u32_le(),
            tables: CatalogDescriptor::decode(&mut buf),
            indexes: CatalogDescriptor::decode(&mut buf),
            data_start: buf.get_u64_le(),
            data_end: buf.get_u64_le(),
            created_at: buf.get_i64_le(),
            updated_at: buf.get_i64_le(),
        };

        if header.major_version != MAJOR_VERSION {
            return Err(RowStoreError::Corrupted(format!(
                "unsupported major version {}",
                header.major_version
            )));
        }
        if header.data_start != HEADER_SIZE {
            return Err(RowStoreError::Corrupted(format!(
                "data region starts at {} (expected {})",
                header.data_start, HEADER_SIZE
            )));
        }
        if header.data_end < header.data_start {
            return Err(RowStoreError::Corrupted(format!(
                "data region ends at {} before it starts at {}",
                header.data_end, header.data_start
            )));
        }
        for (name, desc) in [("table", &header.tables), ("index", &header.indexes)] {
            if desc.entries > desc.slots {
                return Err(RowStoreError::Corrupted(format!(
                    "{} catalog has {} entries in {} slots",
                    name, desc.entries, desc.slots
                )));
            }
        }

        Ok(header)
    }

    /// Refresh the last-updated timestamp
    pub fn touch(&mut self) {
        self.updated_at = unix_timestamp();
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time as unix seconds
pub(crate) fn unix_timestamp() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(_) => 0,
    }
}
