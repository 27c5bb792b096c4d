use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use onebrc::config::ConfigFile;
use onebrc::format::render;
use onebrc::{ScanConfig, scan_path};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

/// Per-station min/mean/max over a `station;temperature` file
#[derive(Parser)]
#[command(name = "onebrc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Measurements file
    #[arg(value_name = "FILE", default_value = "measurements.txt")]
    input: PathBuf,

    /// TOML file with a [scan] table; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bytes per chunk
    #[arg(short = 'c', long)]
    chunk_size: Option<usize>,

    /// Chunks parsed at the same time
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Bytes read past each chunk end; must cover the longest record
    #[arg(long, conflicts_with = "max_station_name")]
    overshoot: Option<usize>,

    /// Longest expected station name, used to size the overshoot
    #[arg(long)]
    max_station_name: Option<usize>,

    /// Reject malformed records instead of trusting the input
    #[arg(long)]
    strict: bool,

    /// Read through a memory map instead of positional reads
    #[arg(long)]
    mmap: bool,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn scan_config(&self) -> Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => {
                ConfigFile::from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
                    .scan
            }
            None => ScanConfig::default(),
        };
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(overshoot) = self.overshoot {
            config.overshoot = overshoot;
        }
        if let Some(len) = self.max_station_name {
            config = config.with_max_station_name(len);
        }
        config.strict |= self.strict;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = cli.scan_config()?;
    let start = Instant::now();
    let report = scan_path(&cli.input, &config, cli.mmap)
        .with_context(|| format!("Failed to scan {}", cli.input.display()))?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", render(&report.table))?;
    out.flush()?;

    info!(
        "done in {:.2?}: {} chunks, {} stations",
        start.elapsed(),
        report.chunks_dispatched,
        report.table.len()
    );
    Ok(())
}
