//! Helpers for building capture files in tests.

use std::io::Write;

use tempfile::NamedTempFile;

/// Build a little-endian microsecond PCAP file holding `frames`.
pub fn legacy_pcap(link_type: u16, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut data = Vec::new();

    data.extend_from_slice(&[0xd4, 0xc3, 0xb2, 0xa1]); // Magic
    data.extend_from_slice(&2u16.to_le_bytes()); // Version major
    data.extend_from_slice(&4u16.to_le_bytes()); // Version minor
    data.extend_from_slice(&0i32.to_le_bytes()); // Thiszone
    data.extend_from_slice(&0u32.to_le_bytes()); // Sigfigs
    data.extend_from_slice(&65535u32.to_le_bytes()); // Snaplen
    data.extend_from_slice(&(link_type as u32).to_le_bytes()); // Network

    for (i, frame) in frames.iter().enumerate() {
        let ts_sec: u32 = 1_000_000_000 + i as u32;
        data.extend_from_slice(&ts_sec.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // ts_usec
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes()); // caplen
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes()); // origlen
        data.extend_from_slice(frame);
    }

    data
}

/// Build a little-endian PCAPNG file with one interface per entry of
/// `link_types`, followed by `(interface id, frame)` enhanced packets.
pub fn pcapng(link_types: &[u16], packets: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut data = Vec::new();

    // Section header block
    data.extend_from_slice(&0x0a0d0d0au32.to_le_bytes()); // Block type
    data.extend_from_slice(&28u32.to_le_bytes()); // Block length
    data.extend_from_slice(&0x1a2b3c4du32.to_le_bytes()); // Byte-order magic
    data.extend_from_slice(&1u16.to_le_bytes()); // Version major
    data.extend_from_slice(&0u16.to_le_bytes()); // Version minor
    data.extend_from_slice(&(-1i64).to_le_bytes()); // Section length: unknown
    data.extend_from_slice(&28u32.to_le_bytes()); // Block length

    for &link_type in link_types {
        data.extend_from_slice(&1u32.to_le_bytes()); // Block type: IDB
        data.extend_from_slice(&20u32.to_le_bytes()); // Block length
        data.extend_from_slice(&link_type.to_le_bytes()); // Link type
        data.extend_from_slice(&0u16.to_le_bytes()); // Reserved
        data.extend_from_slice(&65535u32.to_le_bytes()); // Snaplen
        data.extend_from_slice(&20u32.to_le_bytes()); // Block length
    }

    for (i, (if_id, frame)) in packets.iter().enumerate() {
        let padded = frame.len().div_ceil(4) * 4;
        let block_len = (32 + padded) as u32;
        let ts = 1_000_000_000_000_000u64 + i as u64;

        data.extend_from_slice(&6u32.to_le_bytes()); // Block type: EPB
        data.extend_from_slice(&block_len.to_le_bytes());
        data.extend_from_slice(&if_id.to_le_bytes()); // Interface id
        data.extend_from_slice(&((ts >> 32) as u32).to_le_bytes()); // ts_high
        data.extend_from_slice(&(ts as u32).to_le_bytes()); // ts_low
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes()); // caplen
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes()); // origlen
        data.extend_from_slice(frame);
        data.resize(data.len() + padded - frame.len(), 0); // Padding
        data.extend_from_slice(&block_len.to_le_bytes());
    }

    data
}

/// Minimal Ethernet frame carrying an unknown EtherType, tagged by `marker`.
pub fn ethernet_frame(marker: u8) -> Vec<u8> {
    vec![
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // Dst MAC
        0x00, 0x11, 0x22, 0x33, 0x44, marker, // Src MAC
        0x88, 0xb5, // EtherType (local experimental)
    ]
}

/// Write `bytes` to a temporary file with the given suffix.
pub fn write_temp(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::with_suffix(suffix).unwrap();
    temp.write_all(bytes).unwrap();
    temp.flush().unwrap();
    temp
}
