//! On-disk format
//!
//! Fixed-size binary layouts for the file header, catalog descriptors, and
//! catalog entries, plus the bounded [`Region`] type used for all offset
//! arithmetic.
//!
//! ## File Layout (all offsets absolute)
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ FileHeader (96 bytes at offset 0)             │
//! ├───────────────────────────────────────────────┤
//! │ Table catalog   (64 bytes x tables.slots)     │
//! ├───────────────────────────────────────────────┤
//! │ Index catalog   (64 bytes x indexes.slots)    │
//! ├───────────────────────────────────────────────┤
//! │ Table 1 rows    (row_size x slots)            │
//! │ Table 2 rows                                  │
//! │ ...                                           │
//! ├───────────────────────────────────────────────┤
//! │ [data_end, EOF)  unallocated                  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are little-endian fixed-width fields. There is
//! no framing and no checksumming; counts and offsets recorded in the
//! header are trusted as written.

mod entry;
mod header;
mod region;

pub use entry::{CatalogEntry, IndexInfo, TableInfo, ENTRY_SIZE, MAX_NAME_LEN};
pub use header::{CatalogDescriptor, FileHeader, DESCRIPTOR_SIZE, HEADER_SIZE, MAJOR_VERSION, MINOR_VERSION};
pub use region::Region;

/// Sentinel byte written by file extension to force physical allocation
pub const FILL_BYTE: u8 = 0xFF;

/// Size of the record id prefix every row begins with
pub const RID_SIZE: usize = 4;

/// Record id: unique within a table, assigned by the engine, never reused.
/// Zero is never a valid rid.
pub type Rid = u32;

/// Read the record id from the first bytes of a row
pub fn row_rid(row: &[u8]) -> Rid {
    debug_assert!(row.len() >= RID_SIZE);
    u32::from_le_bytes([row[0], row[1], row[2], row[3]])
}

/// Stamp a record id into the first bytes of a row
pub fn set_row_rid(row: &mut [u8], rid: Rid) {
    debug_assert!(row.len() >= RID_SIZE);
    row[..RID_SIZE].copy_from_slice(&rid.to_le_bytes());
}
