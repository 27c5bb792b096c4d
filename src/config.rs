//! Tuning parameters for a scan, optionally loaded from a TOML file:
//!
//! ```toml
//! # onebrc.toml
//! [scan]
//! chunk_size = 16777216
//! workers = 12
//! overshoot = 128
//! strict = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{BrcError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_OVERSHOOT: usize = 64;

/// Bytes a record needs beyond its station name: `;`, up to `-99.9`, `\n`.
pub const RECORD_OVERHEAD: usize = 7;

/// Smallest overshoot that can still complete a one-letter record.
pub const MIN_OVERSHOOT: usize = 1 + RECORD_OVERHEAD;

/// Largest chunk a worker will buffer.
pub const MAX_CHUNK_SIZE: usize = 1 << 30;

/// Largest overshoot window, far past any sane station name.
pub const MAX_OVERSHOOT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Nominal bytes per chunk.
    pub chunk_size: usize,
    /// Upper bound on chunks being parsed at once.
    pub workers: usize,
    /// Extra bytes read past each chunk end so its last record can be finished.
    /// Must be at least the longest record, newline included.
    pub overshoot: usize,
    /// Parsed chunks allowed to wait for the merger before workers block.
    pub queue_depth: usize,
    /// Validate every record instead of trusting the input.
    pub strict: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            overshoot: DEFAULT_OVERSHOOT,
            queue_depth: DEFAULT_WORKERS,
            strict: false,
        }
    }
}

impl ScanConfig {
    /// Sizes the overshoot for station names up to `len` bytes.
    pub fn with_max_station_name(mut self, len: usize) -> Self {
        self.overshoot = len.saturating_add(RECORD_OVERHEAD);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(BrcError::InvalidConfig(format!(
                "chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {}",
                self.chunk_size
            )));
        }
        if self.workers == 0 {
            return Err(BrcError::InvalidConfig(
                "workers must be positive".into(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(BrcError::InvalidConfig(
                "queue_depth must be positive".into(),
            ));
        }
        if !(MIN_OVERSHOOT..=MAX_OVERSHOOT).contains(&self.overshoot) {
            return Err(BrcError::InvalidConfig(format!(
                "overshoot must be between {MIN_OVERSHOOT} and {MAX_OVERSHOOT} bytes, got {}",
                self.overshoot
            )));
        }
        Ok(())
    }
}

/// Root of a `onebrc.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanConfig,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| BrcError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BrcError::InvalidConfig(e.to_string()))
    }
}
