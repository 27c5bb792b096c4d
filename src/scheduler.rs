//! Splits the input into fixed-size chunks and parses them on a bounded worker
//! pool, feeding every result to the [`Merger`].
//!
//! The dispatcher takes a slot before admitting a chunk, so at most `workers`
//! chunks are being parsed at once. A worker gives its slot back as soon as it
//! has parsed, then waits in line to hand its table to the merger. Admission
//! stops for good the first time a worker sees the end of the input (or fails);
//! chunks already admitted always run to completion.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::bounded;
use log::{debug, info, warn};

use crate::chunk::{Chunk, ChunkOutcome, parse_chunk};
use crate::config::ScanConfig;
use crate::error::{BrcError, Result};
use crate::merge::Merger;
use crate::source::ByteSource;
use crate::station::StationTable;

/// Result of a completed scan.
#[derive(Debug)]
pub struct ScanReport {
    pub table: StationTable,
    pub chunks_dispatched: usize,
    pub chunks_merged: usize,
}

/// One-way stop signal for chunk admission.
#[derive(Debug, Default)]
struct Cancellation(AtomicBool);

impl Cancellation {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Scans `source` and returns the fully merged station table.
pub fn scan<S: ByteSource + ?Sized>(source: &S, config: &ScanConfig) -> Result<ScanReport> {
    config.validate()?;
    let size = source
        .size()
        .map_err(|source| BrcError::Read { offset: 0, source })?;
    info!(
        "scanning {size} bytes: chunk_size={}, workers={}, overshoot={}{}",
        config.chunk_size,
        config.workers,
        config.overshoot,
        if config.strict { ", strict" } else { "" }
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("onebrc-worker-{i}"))
        .build()?;
    let merger = Merger::spawn(config.queue_depth)?;

    let (acquire, release) = bounded::<()>(config.workers);
    let cancellation = Cancellation::default();
    let first_error: Mutex<Option<BrcError>> = Mutex::new(None);
    let mut dispatched = 0;

    // runs on this thread, so blocking for a slot never starves the pool
    pool.in_place_scope(|scope| {
        let mut offset = 0u64;
        while !cancellation.is_cancelled() {
            if acquire.send(()).is_err() {
                break;
            }
            if cancellation.is_cancelled() {
                let _ = release.try_recv();
                break;
            }

            let chunk = Chunk::new(offset, config.chunk_size);
            dispatched += 1;
            let (release, merger, cancellation, first_error) =
                (&release, &merger, &cancellation, &first_error);
            scope.spawn(move |_| {
                let outcome = parse_chunk(source, chunk, config);
                let _ = release.recv();
                let handoff = match outcome {
                    Ok(ChunkOutcome::Exhausted) => {
                        cancellation.cancel();
                        Ok(())
                    }
                    Ok(ChunkOutcome::Parsed { table, eof }) => {
                        if eof {
                            cancellation.cancel();
                        }
                        merger.submit(table)
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = handoff {
                    warn!("chunk @{} failed: {e}", chunk.offset);
                    cancellation.cancel();
                    let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                }
            });

            offset = chunk.next_offset();
            if offset >= size {
                debug!("dispatched through end of input at chunk {dispatched}");
                cancellation.cancel();
            }
        }
    });

    let (table, chunks_merged) = merger.finish()?;
    if let Some(e) = first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
        return Err(e);
    }
    info!(
        "{} stations, {} records from {chunks_merged}/{dispatched} chunks",
        table.len(),
        table.record_count()
    );
    Ok(ScanReport {
        table,
        chunks_dispatched: dispatched,
        chunks_merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn config(chunk_size: usize, workers: usize) -> ScanConfig {
        ScanConfig {
            chunk_size,
            workers,
            ..Default::default()
        }
    }

    /// Fails every read that touches `bad_offset` or beyond.
    struct FailingSource {
        data: Vec<u8>,
        bad_offset: u64,
    }

    impl ByteSource for FailingSource {
        fn size(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            if offset + buf.len() as u64 > self.bad_offset {
                return Err(io::Error::other("torn read"));
            }
            self.data.read_at(buf, offset)
        }
    }

    /// Tracks how many reads are in flight at the same time.
    struct CountingSource {
        data: Vec<u8>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ByteSource for CountingSource {
        fn size(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_micros(200));
            let read = self.data.read_at(buf, offset);
            self.active.fetch_sub(1, Ordering::SeqCst);
            read
        }
    }

    #[test]
    fn test_concrete_scenario_single_worker() {
        let input = b"StationA;23.4\nStationB;-5.1\nStationA;10.0\n".to_vec();
        let report = scan(&input, &config(1024, 1)).unwrap();
        assert_eq!(report.chunks_dispatched, 1);
        assert_eq!(report.chunks_merged, 1);

        let a = report.table.get(b"StationA").unwrap();
        assert_eq!((a.min, a.max, a.count), (10.0, 23.4, 2));
        assert!((a.sum - 33.4).abs() < 1e-9);
        let b = report.table.get(b"StationB").unwrap();
        assert_eq!((b.min, b.max, b.sum, b.count), (-5.1, -5.1, -5.1, 1));
    }

    #[test]
    fn test_empty_input() {
        let report = scan(&Vec::<u8>::new(), &config(1024, 4)).unwrap();
        assert!(report.table.is_empty());
        assert_eq!(report.chunks_dispatched, 1);
    }

    #[test]
    fn test_many_small_chunks() {
        let mut input = Vec::new();
        for i in 0..500 {
            input.extend_from_slice(format!("S{};{}.{}\n", i % 7, i % 40, i % 10).as_bytes());
        }
        let whole = scan(&input, &config(input.len(), 1)).unwrap().table;
        for (chunk_size, workers) in [(1, 1), (3, 2), (17, 8), (64, 3), (1000, 16)] {
            let report = scan(&input, &config(chunk_size, workers)).unwrap();
            assert_eq!(report.chunks_dispatched, input.len().div_ceil(chunk_size));
            assert_eq!(report.chunks_merged, report.chunks_dispatched);
            assert_eq!(report.table.record_count(), 500);
            for (name, expected) in whole.iter() {
                let actual = report.table.get(name).unwrap();
                assert_eq!(actual.count, expected.count);
                assert_eq!(actual.min, expected.min);
                assert_eq!(actual.max, expected.max);
                assert!((actual.sum - expected.sum).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_single_record_with_tiny_chunks() {
        let input = b"Hamburg;12.0\n".to_vec();
        for workers in [1, 2, 8] {
            let report = scan(&input, &config(2, workers)).unwrap();
            assert_eq!(report.table.get(b"Hamburg").unwrap().count, 1);
        }
    }

    #[test]
    fn test_read_failure_aborts_scan() {
        let mut data = Vec::new();
        for _ in 0..200 {
            data.extend_from_slice(b"Tokyo;15.2\n");
        }
        let source = FailingSource {
            data,
            bad_offset: 1000,
        };
        let err = scan(&source, &config(100, 4)).unwrap_err();
        assert!(matches!(err, BrcError::Read { .. }));
    }

    #[test]
    fn test_strict_error_surfaces() {
        let input = b"Tokyo;15.2\nTokyo;15\nTokyo;1.0\n".to_vec();
        let mut config = config(8, 2);
        config.strict = true;
        let err = scan(&input, &config).unwrap_err();
        assert!(matches!(err, BrcError::Malformed { offset: 11, .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = scan(&Vec::<u8>::new(), &config(0, 1)).unwrap_err();
        assert!(matches!(err, BrcError::InvalidConfig(_)));
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let err = scan(&b"a;1.0\n".to_vec(), &config(usize::MAX, 1)).unwrap_err();
        assert!(matches!(err, BrcError::InvalidConfig(_)));
    }

    #[test]
    fn test_parsing_bounded_by_workers() {
        let mut data = Vec::new();
        for i in 0..2000 {
            data.extend_from_slice(format!("S{};{}.{}\n", i % 13, i % 50, i % 10).as_bytes());
        }
        let expected_chunks = data.len().div_ceil(97);
        let source = CountingSource {
            data,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        let report = scan(&source, &config(97, 3)).unwrap();
        let peak = source.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak of {peak} concurrent reads");
        assert_eq!(report.chunks_dispatched, expected_chunks);
        assert_eq!(report.chunks_merged, expected_chunks);
        assert_eq!(report.table.record_count(), 2000);
    }
}
