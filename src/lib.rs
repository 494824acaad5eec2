//! # RowStore
//!
//! A single-file, schema-agnostic record store. One backing file holds a
//! fixed header, a table catalog, a reserved index catalog, and a packed
//! data region of fixed-size records; tables are created, grown, and
//! dropped at runtime without any schema layer on top.
//!
//! ## Features
//!
//! - **Single backing file**: header, catalogs, and every table's records
//!   live in one file with explicit little-endian layouts
//! - **Fixed-size records**: each table stores opaque rows of one declared
//!   size, prefixed by a monotonic 4-byte record id
//! - **Cursor accessors**: [`Table`] handles carry an independent cursor
//!   and stay valid across expansion and compaction
//! - **In-place growth**: tables at the file tail extend in place; interior
//!   tables relocate to the tail, with the gap reclaimed by compaction
//! - **Coarse locking**: one engine-wide lock serializes every operation,
//!   so handles are freely cloneable across threads
//!
//! ## Example
//!
//! ```no_run
//! use rowstore::DataFile;
//!
//! # fn main() -> rowstore::Result<()> {
//! let store = DataFile::new("app.db");
//! store.create(10)?;
//!
//! let mut events = store.create_table("events", 40, 1000, 500)?;
//! let mut rows = vec![0u8; 40 * 3];
//! events.insert(&mut rows)?;
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod store;

pub use config::{Config, ConfigBuilder};
pub use error::{Result, RowStoreError};
pub use store::{DataFile, Table};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
