//! pcapidx - Decode captured packets into flat records.
//!
//! Packets come from a live interface or a PCAP/PCAPNG file, filtered with a
//! BPF expression, and are decoded layer by layer into a [`Record`]. A
//! [`RecordSource`] shares one capture session between decode workers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pcapidx::capture::CaptureSource;
//! use pcapidx::config::CaptureConfig;
//! use pcapidx::counter::{AtomicCounter, ProgressLog};
//! use pcapidx::source::RecordSource;
//!
//! fn main() -> pcapidx::Result<()> {
//!     let config = CaptureConfig::offline("capture.pcap").filter("tcp port 80");
//!     let capture = CaptureSource::open(&config)?;
//!     let source = RecordSource::new(capture, Arc::new(AtomicCounter::new()), ProgressLog::disabled());
//!
//!     for emitted in source.records() {
//!         let emitted = emitted?;
//!         println!("{} {:?}", emitted.sequence, emitted.record.http);
//!     }
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod counter;
pub mod decode;
pub mod error;
pub mod pcap;
pub mod pipeline;
pub mod record;
pub mod source;

pub use decode::{decode, Decoded, Decoder, ErrorPolicy};
pub use error::{CaptureError, DecodeError, Error, Result};
pub use record::{HttpRequest, Record, TcpFlags};
pub use source::{Emitted, RecordSource};
