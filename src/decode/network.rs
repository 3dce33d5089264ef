//! Network layer: IPv4 and IPv6.

use std::net::IpAddr;

use etherparse::{Ipv4HeaderSlice, Ipv6HeaderSlice};

use crate::error::DecodeError;

/// Fixed IPv6 header length.
const IPV6_HEADER_LEN: usize = 40;

/// IPv6 extension headers walked to reach the transport header.
mod ext {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AUTH: u8 = 51;
    pub const DEST_OPTS: u8 = 60;
}

/// Network protocols the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Ipv4,
    Ipv6,
}

impl NetworkKind {
    pub fn name(self) -> &'static str {
        match self {
            NetworkKind::Ipv4 => "IPv4",
            NetworkKind::Ipv6 => "IPv6",
        }
    }
}

/// Decoded network-layer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkLayer<'a> {
    pub kind: NetworkKind,
    pub src: IpAddr,
    pub dst: IpAddr,
    /// IP protocol number of the payload
    pub protocol: u8,
    /// Payload is a non-first fragment, so it starts mid-datagram
    pub later_fragment: bool,
    /// Payload bounded by the header's length field
    pub payload: &'a [u8],
}

pub fn parse(kind: NetworkKind, data: &[u8]) -> Result<NetworkLayer<'_>, DecodeError> {
    match kind {
        NetworkKind::Ipv4 => parse_ipv4(data),
        NetworkKind::Ipv6 => parse_ipv6(data),
    }
}

fn parse_ipv4(data: &[u8]) -> Result<NetworkLayer<'_>, DecodeError> {
    let ipv4 = Ipv4HeaderSlice::from_slice(data).map_err(|e| DecodeError::Malformed {
        protocol: "IPv4",
        reason: e.to_string(),
    })?;

    let header_len = ipv4.slice().len();
    // Zero total length shows up with TCP segmentation offload
    let end = match ipv4.total_len() as usize {
        0 => data.len(),
        total if total < header_len => {
            return Err(DecodeError::Malformed {
                protocol: "IPv4",
                reason: format!("total length {total} shorter than header length {header_len}"),
            })
        }
        total => total.min(data.len()),
    };

    let fragment_offset = u16::from_be_bytes([data[6], data[7]]) & 0x1fff;

    Ok(NetworkLayer {
        kind: NetworkKind::Ipv4,
        src: IpAddr::V4(ipv4.source_addr()),
        dst: IpAddr::V4(ipv4.destination_addr()),
        protocol: ipv4.protocol().0,
        later_fragment: fragment_offset != 0,
        payload: &data[header_len..end],
    })
}

fn parse_ipv6(data: &[u8]) -> Result<NetworkLayer<'_>, DecodeError> {
    let ipv6 = Ipv6HeaderSlice::from_slice(data).map_err(|e| DecodeError::Malformed {
        protocol: "IPv6",
        reason: e.to_string(),
    })?;

    // Zero payload length is used by jumbograms
    let end = match ipv6.payload_length() as usize {
        0 => data.len(),
        len => (IPV6_HEADER_LEN + len).min(data.len()),
    };

    let mut protocol = ipv6.next_header().0;
    let mut payload = &data[IPV6_HEADER_LEN..end];
    let mut later_fragment = false;

    loop {
        let header_len = match protocol {
            ext::HOP_BY_HOP | ext::ROUTING | ext::DEST_OPTS => {
                payload.get(1).map(|len| (*len as usize + 1) * 8)
            }
            ext::AUTH => payload.get(1).map(|len| (*len as usize + 2) * 4),
            ext::FRAGMENT => Some(8),
            _ => break,
        };

        let Some(header_len) = header_len.filter(|len| *len <= payload.len()) else {
            return Err(DecodeError::Malformed {
                protocol: "IPv6",
                reason: format!("truncated extension header {protocol}"),
            });
        };

        if protocol == ext::FRAGMENT {
            let offset = u16::from_be_bytes([payload[2], payload[3]]) >> 3;
            later_fragment |= offset != 0;
        }

        protocol = payload[0];
        payload = &payload[header_len..];
    }

    Ok(NetworkLayer {
        kind: NetworkKind::Ipv6,
        src: IpAddr::V6(ipv6.source_addr()),
        dst: IpAddr::V6(ipv6.destination_addr()),
        protocol,
        later_fragment,
        payload,
    })
}
