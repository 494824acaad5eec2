//! Catalog
//!
//! A catalog is a fixed-slot array of metadata entries (tables or indexes)
//! held wholly in memory while the file is open and persisted wholly on
//! save. Free slots have `id == 0`; allocation scans for the first free
//! slot and grows the array when none remains.
//!
//! Growth relocates the catalog's on-disk region to the end of the data
//! region: the file is extended first (the only fallible step), then the
//! in-memory array, the descriptor, and the data-region end are updated
//! together. A failed extend leaves all three untouched.

use bytes::BytesMut;
use tracing::debug;

use crate::error::{Result, RowStoreError};
use crate::file::BackingFile;
use crate::format::{CatalogDescriptor, CatalogEntry, FILL_BYTE};

/// In-memory slot array for one catalog
#[derive(Debug, Clone)]
pub struct Catalog<E: CatalogEntry> {
    entries: Vec<E>,
}

impl<E: CatalogEntry> Catalog<E> {
    /// A zero-filled catalog sized to the descriptor's capacity
    pub fn new(descriptor: &CatalogDescriptor) -> Self {
        Self {
            entries: vec![E::default(); descriptor.slots as usize],
        }
    }

    /// Read `entry_size * slots` bytes at the descriptor's offset
    pub fn load(file: &mut BackingFile, descriptor: &CatalogDescriptor) -> Result<Self> {
        if descriptor.slots > 0 && descriptor.entry_size != E::SIZE {
            return Err(RowStoreError::Corrupted(format!(
                "catalog entry size {} (expected {})",
                descriptor.entry_size,
                E::SIZE
            )));
        }

        let region = descriptor.region();
        let mut raw = vec![0u8; region.byte_len() as usize];
        file.seek(region.offset())?;
        file.read_exact(&mut raw)?;

        let mut entries = Vec::with_capacity(descriptor.slots as usize);
        let mut cursor = raw.as_slice();
        for _ in 0..descriptor.slots {
            entries.push(E::decode(&mut cursor));
        }

        Ok(Self { entries })
    }

    /// Write `entry_size * slots` bytes at the descriptor's offset
    pub fn save(&self, file: &mut BackingFile, descriptor: &CatalogDescriptor) -> Result<()> {
        let region = descriptor.region();
        let mut buf = BytesMut::with_capacity(region.byte_len() as usize);
        for entry in &self.entries {
            entry.encode(&mut buf);
        }
        debug_assert_eq!(buf.len() as u64, region.byte_len());

        file.seek(region.offset())?;
        file.write_all(&buf)?;
        Ok(())
    }

    /// Index of the first free slot, if any
    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|entry| entry.is_free())
    }

    /// A free slot index, growing the catalog if every slot is in use
    ///
    /// On growth the returned index is the first newly added slot.
    pub fn allocate_slot(
        &mut self,
        descriptor: &mut CatalogDescriptor,
        data_end: &mut u64,
        file: &mut BackingFile,
    ) -> Result<usize> {
        if let Some(slot) = self.find_free_slot() {
            return Ok(slot);
        }

        let first_new = descriptor.slots as usize;
        self.grow(descriptor, data_end, file)?;
        Ok(first_new)
    }

    /// Relocate the catalog region to the end of the data region and add
    /// `growth_factor` slots
    pub fn grow(
        &mut self,
        descriptor: &mut CatalogDescriptor,
        data_end: &mut u64,
        file: &mut BackingFile,
    ) -> Result<()> {
        if descriptor.growth_factor == 0 {
            return Err(RowStoreError::InvalidArgument(
                "catalog growth factor is zero".to_string(),
            ));
        }

        let new_slots = descriptor.slots + descriptor.growth_factor;
        let new_offset = *data_end;
        let new_end = new_offset + descriptor.entry_size as u64 * new_slots as u64;

        // The only fallible step; bookkeeping commits after it succeeds
        file.extend(new_end, FILL_BYTE)?;

        self.entries.resize(new_slots as usize, E::default());
        descriptor.offset = new_offset;
        descriptor.slots = new_slots;
        *data_end = new_end;

        debug!(
            slots = new_slots,
            offset = new_offset,
            "catalog grown and relocated"
        );
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<&E> {
        self.entries.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut E> {
        self.entries.get_mut(slot)
    }

    /// Zero a slot, marking it free
    pub fn clear_slot(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = E::default();
        }
    }

    /// Active (non-free) slots in catalog order
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &E)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_free())
    }

    /// First active slot with an exact name match
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_free() && entry.name_matches(name))
    }

    /// First slot holding the given object id
    pub fn find_by_id(&self, id: u32) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }
}
