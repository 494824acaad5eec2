//! Configuration for rowstore
//!
//! Centralized configuration with sensible defaults.

/// Main configuration for a rowstore data file
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Chunk size (bytes) for bulk copies during expansion and compaction
    pub buffer_size: usize,

    // -------------------------------------------------------------------------
    // Table Defaults
    // -------------------------------------------------------------------------
    /// Initial slot count for new tables when the caller gives none
    pub default_slots: u32,

    /// Slots added per table expansion when the caller gives none
    pub default_growth_factor: u32,

    // -------------------------------------------------------------------------
    // Catalog Configuration
    // -------------------------------------------------------------------------
    /// Table catalog capacity for new files
    pub default_tables: u32,

    /// Slots added when the table catalog itself fills up
    pub table_catalog_growth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            default_slots: 1000,
            default_growth_factor: 500,
            default_tables: 10,
            table_catalog_growth: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the copy buffer size (in bytes)
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Set the default initial slot count for new tables
    pub fn default_slots(mut self, slots: u32) -> Self {
        self.config.default_slots = slots;
        self
    }

    /// Set the default table growth factor (in slots)
    pub fn default_growth_factor(mut self, slots: u32) -> Self {
        self.config.default_growth_factor = slots;
        self
    }

    /// Set the table catalog capacity for new files
    pub fn default_tables(mut self, tables: u32) -> Self {
        self.config.default_tables = tables;
        self
    }

    /// Set the table catalog growth factor (in slots)
    pub fn table_catalog_growth(mut self, slots: u32) -> Self {
        self.config.table_catalog_growth = slots;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
