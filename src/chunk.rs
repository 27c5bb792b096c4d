use log::debug;
use memchr::memchr;

use crate::config::ScanConfig;
use crate::error::{BrcError, MalformedKind, Result};
use crate::measurement::{parse_measurement, try_parse_measurement};
use crate::source::{ByteSource, read_full_at};
use crate::station::StationTable;

/// A candidate byte range handed to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: u64,
    pub length: usize,
}

impl Chunk {
    pub fn new(offset: u64, length: usize) -> Self {
        Self { offset, length }
    }

    /// Offset of the chunk that follows this one.
    pub fn next_offset(&self) -> u64 {
        self.offset + self.length as u64
    }
}

#[derive(Debug)]
pub enum ChunkOutcome {
    /// The offset is at or past the end of the input.
    Exhausted,
    /// Records owned by the chunk. `eof` is set when the chunk's nominal range
    /// reaches the end of the input, so no later chunk has anything to read.
    Parsed { table: StationTable, eof: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Value,
}

/// Parses every record that starts inside `chunk` into a fresh table.
///
/// A chunk owns the records that begin at or before its nominal end, so the record
/// straddling the end is finished from the overshoot bytes, and a chunk that does
/// not start the file drops everything up to its first newline (that record
/// belongs to the previous chunk).
pub fn parse_chunk<S: ByteSource + ?Sized>(
    source: &S,
    chunk: Chunk,
    config: &ScanConfig,
) -> Result<ChunkOutcome> {
    let Some(window) = chunk.length.checked_add(config.overshoot) else {
        return Err(BrcError::InvalidConfig(format!(
            "chunk of {} bytes plus {} bytes of overshoot overflows",
            chunk.length, config.overshoot
        )));
    };
    let mut buf = vec![0u8; window];
    let read = read_full_at(source, &mut buf, chunk.offset).map_err(|source| BrcError::Read {
        offset: chunk.offset,
        source,
    })?;
    if read == 0 {
        return Ok(ChunkOutcome::Exhausted);
    }
    let short_read = read < buf.len();
    // no later chunk has bytes to read
    let eof = read <= chunk.length;
    let data = &buf[..read];
    let boundary = chunk.length.min(read);

    let start = if chunk.offset == 0 {
        0
    } else {
        match memchr(b'\n', data) {
            Some(pos) => pos + 1,
            None if short_read => {
                return Ok(ChunkOutcome::Parsed {
                    table: StationTable::new(),
                    eof,
                });
            }
            None => {
                return Err(BrcError::RecordTooLong {
                    offset: chunk.offset,
                    overshoot: config.overshoot,
                });
            }
        }
    };

    let mut table = StationTable::with_capacity(512);
    let mut field = Field::Name;
    let mut name_start = start;
    let mut delimiter = start;
    let mut p = start;
    while p < read {
        if p > boundary && data[p - 1] == b'\n' {
            break;
        }
        match (field, data[p]) {
            (Field::Name, b';') => {
                field = Field::Value;
                delimiter = p;
            }
            (Field::Value, b'\n') => {
                fold_record(
                    &mut table,
                    &data[name_start..delimiter],
                    &data[delimiter + 1..p],
                    config.strict,
                    chunk.offset + name_start as u64,
                )?;
                field = Field::Name;
                name_start = p + 1;
            }
            (Field::Name, b'\n') => {
                if config.strict {
                    return Err(BrcError::Malformed {
                        offset: chunk.offset + name_start as u64,
                        kind: MalformedKind::MissingDelimiter,
                    });
                }
                name_start = p + 1;
            }
            _ => {}
        }
        p += 1;
    }

    // ran off the buffer in the middle of a record
    if p == read && name_start < read {
        let record_offset = chunk.offset + name_start as u64;
        if !short_read {
            return Err(BrcError::RecordTooLong {
                offset: record_offset,
                overshoot: config.overshoot,
            });
        }
        match field {
            // last line of the input without a trailing newline
            Field::Value => fold_record(
                &mut table,
                &data[name_start..delimiter],
                &data[delimiter + 1..read],
                config.strict,
                record_offset,
            )?,
            Field::Name if config.strict => {
                return Err(BrcError::Malformed {
                    offset: record_offset,
                    kind: MalformedKind::MissingDelimiter,
                });
            }
            Field::Name => {}
        }
    }

    debug!(
        "chunk @{} ({} bytes read): {} records, {} stations{}",
        chunk.offset,
        read,
        table.record_count(),
        table.len(),
        if eof { ", end of input" } else { "" }
    );
    Ok(ChunkOutcome::Parsed { table, eof })
}

#[inline]
fn fold_record(
    table: &mut StationTable,
    name: &[u8],
    value: &[u8],
    strict: bool,
    offset: u64,
) -> Result<()> {
    let measurement = if strict {
        if name.is_empty() {
            return Err(BrcError::Malformed {
                offset,
                kind: MalformedKind::EmptyStation,
            });
        }
        try_parse_measurement(value).map_err(|kind| BrcError::Malformed { offset, kind })?
    } else {
        parse_measurement(value)
    };
    table.record(name, measurement);
    Ok(())
}
