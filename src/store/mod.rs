//! Store engine
//!
//! The two public surfaces of the engine: [`DataFile`], the manager that
//! owns the backing file and both catalogs, and [`Table`], the cursor-based
//! accessor it hands out for record operations.

mod datafile;
mod table;

pub use datafile::DataFile;
pub use table::Table;
