//! Synthetic packets and capture files shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const LINKTYPE_ETHERNET: u16 = 1;

pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;

/// Wrap `payload` in an Ethernet header.
pub fn ethernet(ether_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff]); // dst MAC
    packet.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // src MAC
    packet.extend_from_slice(&ether_type.to_be_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// Ethernet/IPv4 packet from 192.168.1.100 to 192.168.1.200.
pub fn ipv4(protocol: u8, payload: &[u8]) -> Vec<u8> {
    let total_len = 20 + payload.len() as u16;

    let mut ip = Vec::new();
    ip.push(0x45); // Version 4, IHL 5
    ip.push(0x00); // DSCP + ECN
    ip.extend_from_slice(&total_len.to_be_bytes());
    ip.extend_from_slice(&[0x00, 0x01]); // Identification
    ip.extend_from_slice(&[0x40, 0x00]); // Don't fragment
    ip.push(0x40); // TTL: 64
    ip.push(protocol);
    ip.extend_from_slice(&[0x00, 0x00]); // Checksum
    ip.extend_from_slice(&[192, 168, 1, 100]); // Src IP
    ip.extend_from_slice(&[192, 168, 1, 200]); // Dst IP
    ip.extend_from_slice(payload);

    ethernet(0x0800, &ip)
}

/// TCP segment from port 12345 to port 80.
pub fn tcp(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::new();
    segment.extend_from_slice(&[0x30, 0x39]); // Src port: 12345
    segment.extend_from_slice(&[0x00, 0x50]); // Dst port: 80
    segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // Seq: 1
    segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Ack: 0
    segment.push(0x50); // Data offset: 5 (20 bytes)
    segment.push(flags);
    segment.extend_from_slice(&[0xff, 0xff]); // Window: 65535
    segment.extend_from_slice(&[0x00, 0x00]); // Checksum
    segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
    segment.extend_from_slice(payload);
    segment
}

/// UDP datagram from port 40000 to `dst_port`.
pub fn udp(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = 8 + payload.len() as u16;

    let mut datagram = Vec::new();
    datagram.extend_from_slice(&[0x9c, 0x40]); // Src port: 40000
    datagram.extend_from_slice(&dst_port.to_be_bytes());
    datagram.extend_from_slice(&length.to_be_bytes());
    datagram.extend_from_slice(&[0x00, 0x00]); // Checksum
    datagram.extend_from_slice(payload);
    datagram
}

pub fn tcp_packet(flags: u8, payload: &[u8]) -> Vec<u8> {
    ipv4(6, &tcp(flags, payload))
}

pub fn udp_packet(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    ipv4(17, &udp(dst_port, payload))
}

/// ARP request: Ethernet with no network layer the decoder understands.
pub fn arp_packet() -> Vec<u8> {
    let mut arp = vec![
        0x00, 0x01, // Hardware type: Ethernet
        0x08, 0x00, // Protocol type: IPv4
        0x06, 0x04, // Sizes
        0x00, 0x01, // Opcode: request
    ];
    arp.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 192, 168, 1, 100]);
    arp.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 192, 168, 1, 200]);
    ethernet(0x0806, &arp)
}

/// Legacy little-endian PCAP file holding `packets`.
pub fn pcap_file(link_type: u16, packets: &[Vec<u8>]) -> Vec<u8> {
    let mut file = Vec::new();
    file.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes()); // Magic
    file.extend_from_slice(&2u16.to_le_bytes()); // Major version
    file.extend_from_slice(&4u16.to_le_bytes()); // Minor version
    file.extend_from_slice(&0i32.to_le_bytes()); // Timezone
    file.extend_from_slice(&0u32.to_le_bytes()); // Sigfigs
    file.extend_from_slice(&65535u32.to_le_bytes()); // Snaplen
    file.extend_from_slice(&u32::from(link_type).to_le_bytes());

    for (i, packet) in packets.iter().enumerate() {
        let len = packet.len() as u32;
        file.extend_from_slice(&(1_700_000_000 + i as u32).to_le_bytes()); // ts_sec
        file.extend_from_slice(&0u32.to_le_bytes()); // ts_usec
        file.extend_from_slice(&len.to_le_bytes()); // incl_len
        file.extend_from_slice(&len.to_le_bytes()); // orig_len
        file.extend_from_slice(packet);
    }
    file
}

/// Write `bytes` to a temporary file with the given suffix.
pub fn temp_file(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
