//! Parallel min/mean/max aggregation over `station;temperature` files.
//!
//! The input is cut into fixed-size byte ranges that are parsed concurrently on a
//! bounded worker pool; each range produces its own [`StationTable`], and a single
//! merge thread folds those into the final table.
//!
//! ```no_run
//! use onebrc::{ScanConfig, format::render, scan_path};
//!
//! let report = scan_path("measurements.txt", &ScanConfig::default(), false)?;
//! println!("{}", render(&report.table));
//! # Ok::<(), onebrc::BrcError>(())
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod format;
pub mod measurement;
pub mod merge;
#[cfg(unix)]
pub mod mmap;
pub mod scheduler;
pub mod source;
pub mod station;

use std::{fs::File, path::Path};

pub use config::ScanConfig;
pub use error::{BrcError, Result};
pub use scheduler::{ScanReport, scan};
pub use source::ByteSource;
pub use station::{StationStat, StationTable};

/// Opens `path` and scans it, through a memory map when `mmap` is set.
pub fn scan_path<P: AsRef<Path>>(path: P, config: &ScanConfig, mmap: bool) -> Result<ScanReport> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| BrcError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    if mmap {
        return scan_mapped(path, &file, config);
    }
    scan(&file, config)
}

#[cfg(unix)]
fn scan_mapped(path: &Path, file: &File, config: &ScanConfig) -> Result<ScanReport> {
    let mapped = mmap::MappedFile::map(file).map_err(|source| BrcError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    scan(&mapped, config)
}

#[cfg(not(unix))]
fn scan_mapped(_path: &Path, file: &File, config: &ScanConfig) -> Result<ScanReport> {
    log::warn!("memory mapping is unsupported on this platform, using positional reads");
    scan(file, config)
}
