//! Link layer: find the network protocol and where its header starts.

use etherparse::{Ethernet2HeaderSlice, SingleVlanHeaderSlice};

use super::network::NetworkKind;
use crate::error::DecodeError;
use crate::pcap::linktype;

/// Well-known EtherTypes.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
}

/// Maximum number of stacked VLAN tags followed.
const MAX_VLAN_TAGS: usize = 2;

/// Length of a Linux cooked capture header.
const SLL_HEADER_LEN: usize = 16;

/// BSD address families seen in loopback captures.
const AF_INET: u32 = 2;
const AF_INET6: [u32; 4] = [10, 24, 28, 30];

/// Result of decoding the link-layer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLayer<'a> {
    /// Network protocol carried, if it is one the decoder understands.
    pub network: Option<NetworkKind>,
    /// Bytes following the link-layer header.
    pub payload: &'a [u8],
}

/// Decode the link-layer header of a packet captured with `link_type`.
pub fn parse(link_type: u16, data: &[u8]) -> Result<LinkLayer<'_>, DecodeError> {
    match link_type {
        linktype::ETHERNET => parse_ethernet(data),
        linktype::NULL => parse_loopback(data, u32::from_ne_bytes),
        linktype::LOOP => parse_loopback(data, u32::from_be_bytes),
        linktype::RAW | linktype::DLT_RAW => parse_raw(data),
        linktype::IPV4 => Ok(LinkLayer {
            network: Some(NetworkKind::Ipv4),
            payload: data,
        }),
        linktype::IPV6 => Ok(LinkLayer {
            network: Some(NetworkKind::Ipv6),
            payload: data,
        }),
        linktype::LINUX_SLL => parse_linux_sll(data),
        other => Err(DecodeError::UnsupportedLinkType(other)),
    }
}

fn parse_ethernet(data: &[u8]) -> Result<LinkLayer<'_>, DecodeError> {
    let eth = Ethernet2HeaderSlice::from_slice(data).map_err(|e| DecodeError::Malformed {
        protocol: "Ethernet",
        reason: e.to_string(),
    })?;

    let mut ether_type = eth.ether_type().0;
    let mut rest = &data[eth.slice().len()..];

    for _ in 0..MAX_VLAN_TAGS {
        if ether_type != ethertype::VLAN && ether_type != ethertype::QINQ {
            break;
        }
        let vlan = SingleVlanHeaderSlice::from_slice(rest).map_err(|e| DecodeError::Malformed {
            protocol: "Dot1Q",
            reason: e.to_string(),
        })?;
        ether_type = vlan.ether_type().0;
        rest = &rest[vlan.slice().len()..];
    }

    Ok(LinkLayer {
        network: network_for_ethertype(ether_type),
        payload: rest,
    })
}

fn network_for_ethertype(ether_type: u16) -> Option<NetworkKind> {
    match ether_type {
        ethertype::IPV4 => Some(NetworkKind::Ipv4),
        ethertype::IPV6 => Some(NetworkKind::Ipv6),
        _ => None,
    }
}

/// BSD loopback: a 4-byte address family, in host order for `NULL` and
/// network order for `LOOP`.
fn parse_loopback(data: &[u8], family_of: fn([u8; 4]) -> u32) -> Result<LinkLayer<'_>, DecodeError> {
    let Some((family, payload)) = data.split_first_chunk::<4>() else {
        return Err(DecodeError::PacketTooShort {
            protocol: "Loopback",
            needed: 4,
            have: data.len(),
        });
    };

    let mut family = family_of(*family);
    // Captures read on a host of the other byte order
    if family > 0xffff {
        family = family.swap_bytes();
    }

    let network = if family == AF_INET {
        Some(NetworkKind::Ipv4)
    } else if AF_INET6.contains(&family) {
        Some(NetworkKind::Ipv6)
    } else {
        None
    };

    Ok(LinkLayer { network, payload })
}

/// Raw IP: the version nibble tells IPv4 from IPv6.
fn parse_raw(data: &[u8]) -> Result<LinkLayer<'_>, DecodeError> {
    let Some(first) = data.first() else {
        return Err(DecodeError::PacketTooShort {
            protocol: "RawIP",
            needed: 1,
            have: 0,
        });
    };

    let network = match first >> 4 {
        4 => NetworkKind::Ipv4,
        6 => NetworkKind::Ipv6,
        version => {
            return Err(DecodeError::Malformed {
                protocol: "RawIP",
                reason: format!("invalid IP version {version}"),
            })
        }
    };

    Ok(LinkLayer {
        network: Some(network),
        payload: data,
    })
}

fn parse_linux_sll(data: &[u8]) -> Result<LinkLayer<'_>, DecodeError> {
    if data.len() < SLL_HEADER_LEN {
        return Err(DecodeError::PacketTooShort {
            protocol: "LinuxSLL",
            needed: SLL_HEADER_LEN,
            have: data.len(),
        });
    }

    let protocol = u16::from_be_bytes([data[14], data[15]]);
    Ok(LinkLayer {
        network: network_for_ethertype(protocol),
        payload: &data[SLL_HEADER_LEN..],
    })
}
