//! The single consumer that folds per-chunk tables into the global table.
//!
//! ```text
//! worker ─┐
//! worker ─┼── bounded channel ──▶ merge thread (owns the global StationTable)
//! worker ─┘
//! ```
//!
//! Only the merge thread ever touches the global table, so it needs no locking.
//! The channel is bounded: when merging falls behind, workers block on handoff
//! instead of piling up parsed tables.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use log::debug;

use crate::error::{BrcError, Result};
use crate::station::StationTable;

/// Handle to the background merge thread.
pub struct Merger {
    sender: Option<Sender<StationTable>>,
    handle: Option<JoinHandle<(StationTable, usize)>>,
}

impl Merger {
    /// Spawns the merge thread with room for `queue_depth` pending tables.
    pub fn spawn(queue_depth: usize) -> Result<Self> {
        let (sender, receiver) = bounded::<StationTable>(queue_depth);
        let handle = thread::Builder::new()
            .name("onebrc-merge".to_string())
            .spawn(move || {
                let mut global = StationTable::new();
                let mut merged = 0;
                for local in receiver {
                    global.merge(local);
                    merged += 1;
                }
                debug!(
                    "merge thread done: {merged} tables, {} stations",
                    global.len()
                );
                (global, merged)
            })
            .map_err(|source| BrcError::Spawn {
                name: "merge",
                source,
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Hands a chunk's table to the merge thread, blocking while the queue is full.
    pub fn submit(&self, table: StationTable) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(BrcError::ThreadPanicked("merge"))?;
        sender
            .send(table)
            .map_err(|_| BrcError::ThreadPanicked("merge"))
    }

    /// Closes the queue, waits for every submitted table to be merged and returns
    /// the global table with the number of tables merged into it.
    pub fn finish(mut self) -> Result<(StationTable, usize)> {
        self.sender.take();
        let handle = self
            .handle
            .take()
            .ok_or(BrcError::ThreadPanicked("merge"))?;
        handle.join().map_err(|_| BrcError::ThreadPanicked("merge"))
    }
}

impl Drop for Merger {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
