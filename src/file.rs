//! Backing file
//!
//! Raw byte-store primitives for the engine: a handle bound to one path
//! with absolute seeks, exact-length reads/writes, and extend/rename/delete
//! maintenance operations. Short reads and short writes surface as I/O
//! errors; nothing here retries.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, RowStoreError};

/// A seekable byte store bound to one file path.
///
/// The handle is either open (holding a [`File`]) or closed. All read/write
/// operations require the open state and fail with `NotOpen` otherwise.
#[derive(Debug)]
pub struct BackingFile {
    path: PathBuf,
    file: Option<File>,
}

impl BackingFile {
    /// Bind a handle to a path without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Create the file for read/write access
    ///
    /// Fails if the handle is already open or the file already exists.
    pub fn create(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Err(RowStoreError::AlreadyOpen(self.display()));
        }
        if self.exists() {
            return Err(RowStoreError::AlreadyExists(self.display()));
        }

        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&self.path)?;

        self.file = Some(file);
        Ok(())
    }

    /// Open an existing file for read/write access
    ///
    /// Fails if the handle is already open.
    pub fn open(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Err(RowStoreError::AlreadyOpen(self.display()));
        }

        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;

        self.file = Some(file);
        Ok(())
    }

    /// Close the handle
    ///
    /// Dropping the [`File`] releases the descriptor. Closing a closed
    /// handle is a no-op.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Move the cursor to an absolute offset
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.handle()?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Read exactly `buf.len()` bytes at the current cursor
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.handle()?.read_exact(buf)?;
        Ok(())
    }

    /// Write all of `buf` at the current cursor
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.handle()?.write_all(buf)?;
        Ok(())
    }

    /// Flush buffered writes to the storage device
    pub fn flush(&mut self) -> Result<()> {
        self.handle()?.sync_all()?;
        Ok(())
    }

    /// Guarantee the physical file size reaches `offset`
    ///
    /// Writes a single `fill` byte at `offset - 1`; intervening bytes are
    /// left uninitialized by the filesystem. The sentinel overwrites
    /// whatever sits at `offset - 1`, so the target must be at or beyond
    /// the end of live data.
    pub fn extend(&mut self, offset: u64, fill: u8) -> Result<()> {
        if offset == 0 {
            return Ok(());
        }
        let file = self.handle()?;
        file.seek(SeekFrom::Start(offset - 1))?;
        file.write_all(&[fill])?;
        Ok(())
    }

    /// Delete the file; the handle must be closed
    pub fn delete(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Err(RowStoreError::AlreadyOpen(self.display()));
        }
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Rename the file; the handle must be closed
    pub fn rename(&mut self, new_path: impl Into<PathBuf>) -> Result<()> {
        if self.file.is_some() {
            return Err(RowStoreError::AlreadyOpen(self.display()));
        }
        let new_path = new_path.into();
        std::fs::rename(&self.path, &new_path)?;
        self.path = new_path;
        Ok(())
    }

    /// Whether a file exists at the bound path
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether the handle is open
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Current physical file size in bytes
    pub fn size(&mut self) -> Result<u64> {
        Ok(self.handle()?.metadata()?.len())
    }

    /// Current cursor offset
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.handle()?.stream_position()?)
    }

    /// Whether the cursor sits at or past the end of the file
    pub fn at_end(&mut self) -> Result<bool> {
        let size = self.size()?;
        Ok(self.position()? >= size)
    }

    /// The bound path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&mut self) -> Result<&mut File> {
        let display = self.display();
        self.file
            .as_mut()
            .ok_or(RowStoreError::NotOpen(display))
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}
