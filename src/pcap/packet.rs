//! Captured packet representation.

/// Link-layer header types (LINKTYPE_* values from the pcap file format).
pub mod linktype {
    pub const NULL: u16 = 0;
    pub const ETHERNET: u16 = 1;
    /// Raw IP as reported by a live libpcap handle (`DLT_RAW`)
    pub const DLT_RAW: u16 = 12;
    pub const RAW: u16 = 101;
    pub const LOOP: u16 = 108;
    pub const LINUX_SLL: u16 = 113;
    pub const IPV4: u16 = 228;
    pub const IPV6: u16 = 229;
}

/// One packet as delivered by a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// Arrival position within the session (1-indexed).
    pub frame_number: u64,

    /// Timestamp in microseconds since epoch.
    pub timestamp_us: i64,

    /// Bytes actually captured (bounded by the snap length).
    pub captured_length: u32,

    /// Length on the wire.
    pub original_length: u32,

    /// Link layer type of `data`.
    pub link_type: u16,

    /// Captured bytes, starting at the link-layer header.
    pub data: Vec<u8>,
}

impl RawPacket {
    pub fn new(
        frame_number: u64,
        timestamp_us: i64,
        original_length: u32,
        link_type: u16,
        data: Vec<u8>,
    ) -> Self {
        Self {
            frame_number,
            timestamp_us,
            captured_length: data.len() as u32,
            original_length,
            link_type,
            data,
        }
    }

    /// Check if the packet was truncated by the snap length.
    pub fn is_truncated(&self) -> bool {
        self.captured_length < self.original_length
    }
}
