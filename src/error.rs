use std::{io, path::PathBuf};

/// Why a record was rejected by strict parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedKind {
    #[error("missing ';' delimiter")]
    MissingDelimiter,
    #[error("empty station name")]
    EmptyStation,
    #[error("temperature is not of the form -?d+.d")]
    BadTemperature,
}

/// Errors produced while scanning a measurement file.
#[derive(Debug, thiserror::Error)]
pub enum BrcError {
    /// The input could not be opened or stat-ed
    #[error("cannot open {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A positional read failed for a reason other than end-of-stream
    #[error("read failed at byte {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Strict parsing rejected a record
    #[error("malformed record at byte {offset}: {kind}")]
    Malformed { offset: u64, kind: MalformedKind },

    /// A record straddling the chunk end did not fit in the overshoot window
    #[error("record at byte {offset} is longer than the {overshoot}-byte overshoot window")]
    RecordTooLong { offset: u64, overshoot: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, BrcError>;
