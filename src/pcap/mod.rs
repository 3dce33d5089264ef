//! Capture file reading module.
//!
//! Reads PCAP and PCAPNG files (optionally gzip-compressed) and exposes
//! their packets as [`RawPacket`]s in file order.

mod packet;
mod reader;

#[cfg(test)]
pub(crate) mod test_util;

pub use packet::{linktype, RawPacket};
pub use reader::{is_gzip_extension, PcapFormat, PcapReader};
