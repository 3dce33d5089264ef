//! Command-line argument definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::OutputFormat;
use crate::config::{CaptureConfig, RunConfig, SourceKind, DEFAULT_SNAPLEN};
use crate::error::ConfigError;

/// Decode packets from an interface or a capture file into flat records.
#[derive(Parser, Debug)]
#[command(name = "pcapidx")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Network interface to capture from
    #[arg(short = 'i', long = "interface", value_name = "IFACE", conflicts_with = "file")]
    pub interface: Option<String>,

    /// PCAP/PCAPNG file to read (optionally gzip-compressed)
    #[arg(short = 'r', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Maximum bytes captured per packet
    #[arg(long = "snaplen", default_value_t = DEFAULT_SNAPLEN)]
    pub snaplen: u32,

    /// Put the interface into promiscuous mode
    #[arg(long = "promisc")]
    pub promiscuous: bool,

    /// Live read timeout in milliseconds
    #[arg(long = "timeout-ms", default_value = "1", value_name = "MS")]
    pub timeout_ms: u64,

    /// BPF filter expression
    #[arg(short = 'f', long = "filter", default_value = "", value_name = "EXPR")]
    pub filter: String,

    /// Number of decode workers
    #[arg(short = 'c', long = "concurrency", default_value = "1")]
    pub concurrency: usize,

    /// Log capture progress every thousand packets
    #[arg(long = "debug")]
    pub debug: bool,

    /// Output format for records
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Write records to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// List capture interfaces and exit
    #[arg(long = "list-interfaces")]
    pub list_interfaces: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Validate the arguments into a run configuration.
    pub fn to_config(&self) -> Result<RunConfig, ConfigError> {
        let source = SourceKind::select(self.interface.clone(), self.file.clone())?;
        let capture = CaptureConfig::new(source)
            .snaplen(self.snaplen)
            .promiscuous(self.promiscuous)
            .timeout(Duration::from_millis(self.timeout_ms))
            .filter(self.filter.clone());
        RunConfig::new(capture, self.concurrency, self.debug)
    }

    /// Default tracing filter for the verbosity count.
    ///
    /// Progress lines are logged at info, so `--debug` raises the level to
    /// at least info.
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.debug) {
            (0, false) => "warn",
            (0, true) | (1, _) => "info",
            (2, _) => "debug",
            _ => "trace",
        }
    }
}
