//! Offline capture from a PCAP/PCAPNG file.

use std::path::Path;

use tracing::debug;

use super::filter::PacketFilter;
use crate::error::CaptureError;
use crate::pcap::{PcapReader, RawPacket};

/// Capture session reading a file to its end.
pub struct OfflineCapture {
    reader: PcapReader,
    filter: Option<PacketFilter>,
}

impl OfflineCapture {
    /// Open `path` and compile `expression` for the file's link type.
    ///
    /// An empty expression accepts every packet.
    pub fn open(path: &Path, expression: &str) -> Result<Self, CaptureError> {
        let reader = PcapReader::open(path).map_err(|e| CaptureError::Open {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let filter = if expression.trim().is_empty() {
            None
        } else {
            Some(PacketFilter::compile(expression, reader.link_type())?)
        };

        Ok(Self { reader, filter })
    }

    pub fn link_type(&self) -> u16 {
        self.reader.link_type()
    }

    /// Next packet passing the filter, `Ok(None)` once the file is exhausted.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, CaptureError> {
        while let Some(packet) = self.reader.next_packet()? {
            if self.accepts(&packet)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    fn accepts(&mut self, packet: &RawPacket) -> Result<bool, CaptureError> {
        let Some(filter) = self.filter.as_mut() else {
            return Ok(true);
        };

        // PCAPNG files may mix interfaces with different link types.
        if filter.link_type() != packet.link_type {
            debug!(
                from = filter.link_type(),
                to = packet.link_type,
                "recompiling filter for new link type"
            );
            let recompiled = PacketFilter::compile(filter.expression(), packet.link_type)?;
            *filter = recompiled;
        }

        Ok(filter.matches(&packet.data, packet.original_length))
    }
}
