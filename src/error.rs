//! Error types for pcapidx.

use thiserror::Error;

/// Main error type for pcapidx operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error opening or reading a capture session
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error serializing a record
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a capture session.
///
/// `Open` and `Filter` only occur while opening a session and abort startup.
/// `Device` and `File` end the stream they occur on.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The interface or file could not be opened
    #[error("cannot open {source_name}: {reason}")]
    Open { source_name: String, reason: String },

    /// The filter expression is invalid or could not be installed
    #[error("invalid filter {expression:?}: {reason}")]
    Filter { expression: String, reason: String },

    /// The live capture device failed mid-stream
    #[error("capture device failed: {0}")]
    Device(String),

    /// The capture file could not be read
    #[error(transparent)]
    File(#[from] PcapError),

    /// The session was closed
    #[error("capture session closed")]
    Closed,
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum PcapError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP format
    #[error("Invalid PCAP format: {reason}")]
    InvalidFormat { reason: String },
}

/// Structural failure while decoding a single packet.
///
/// Never fatal: the decoder returns it next to the partially filled record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Packet too short for a protocol header
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Header present but malformed
    #[error("{protocol}: {reason}")]
    Malformed {
        protocol: &'static str,
        reason: String,
    },

    /// Link type the decoder has no parser for
    #[error("unsupported link type: {0}")]
    UnsupportedLinkType(u16),
}

/// Invalid run configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither an interface nor a file was given
    #[error("no capture source: set an interface or a capture file")]
    NoSource,

    /// Both an interface and a file were given
    #[error("interface {interface:?} and file {path:?} are mutually exclusive")]
    ConflictingSources { interface: String, path: String },

    /// Snap length must be positive
    #[error("snap length must be positive")]
    ZeroSnaplen,

    /// Worker count must be positive
    #[error("worker count must be positive")]
    ZeroWorkers,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
