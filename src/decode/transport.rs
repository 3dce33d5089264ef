//! Transport layer: TCP, UDP and the port-carrying protocols around them.

use etherparse::{TcpHeaderSlice, UdpHeaderSlice};

use crate::error::DecodeError;
use crate::record::TcpFlags;

/// IP protocol numbers.
pub mod ip_proto {
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const SCTP: u8 = 132;
    pub const UDPLITE: u8 = 136;
}

/// UDP and UDP-Lite header length.
const UDP_HEADER_LEN: usize = 8;
/// SCTP common header length.
const SCTP_HEADER_LEN: usize = 12;

/// Transport protocol, with the fields only TCP carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp(TcpFlags),
    Udp,
    Other(&'static str),
}

impl TransportKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Tcp(_) => "TCP",
            TransportKind::Udp => "UDP",
            TransportKind::Other(name) => name,
        }
    }

    pub fn tcp_flags(&self) -> Option<TcpFlags> {
        match self {
            TransportKind::Tcp(flags) => Some(*flags),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLayer<'a> {
    pub kind: TransportKind,
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

/// Decode the transport header of an IP payload.
///
/// Returns `Ok(None)` when `protocol` carries no ports.
pub fn parse(protocol: u8, data: &[u8]) -> Result<Option<TransportLayer<'_>>, DecodeError> {
    let layer = match protocol {
        ip_proto::TCP => parse_tcp(data)?,
        ip_proto::UDP => parse_udp(data)?,
        ip_proto::UDPLITE => parse_udplite(data)?,
        ip_proto::SCTP => parse_sctp(data)?,
        _ => return Ok(None),
    };
    Ok(Some(layer))
}

fn parse_tcp(data: &[u8]) -> Result<TransportLayer<'_>, DecodeError> {
    let tcp = TcpHeaderSlice::from_slice(data).map_err(|e| DecodeError::Malformed {
        protocol: "TCP",
        reason: e.to_string(),
    })?;

    Ok(TransportLayer {
        kind: TransportKind::Tcp(TcpFlags::from_header_bytes(data[12], data[13])),
        src_port: tcp.source_port(),
        dst_port: tcp.destination_port(),
        payload: &data[tcp.slice().len()..],
    })
}

fn parse_udp(data: &[u8]) -> Result<TransportLayer<'_>, DecodeError> {
    let udp = UdpHeaderSlice::from_slice(data).map_err(|e| DecodeError::Malformed {
        protocol: "UDP",
        reason: e.to_string(),
    })?;

    let end = match udp.length() as usize {
        // Jumbogram
        0 => data.len(),
        len if len < UDP_HEADER_LEN => {
            return Err(DecodeError::Malformed {
                protocol: "UDP",
                reason: format!("length field {len} shorter than header"),
            })
        }
        len => len.min(data.len()),
    };

    Ok(TransportLayer {
        kind: TransportKind::Udp,
        src_port: udp.source_port(),
        dst_port: udp.destination_port(),
        payload: &data[UDP_HEADER_LEN..end],
    })
}

/// UDP-Lite reuses the length field as checksum coverage, so the payload
/// runs to the end of the IP payload.
fn parse_udplite(data: &[u8]) -> Result<TransportLayer<'_>, DecodeError> {
    let (src_port, dst_port) = ports("UDPLite", data, UDP_HEADER_LEN)?;
    Ok(TransportLayer {
        kind: TransportKind::Other("UDPLite"),
        src_port,
        dst_port,
        payload: &data[UDP_HEADER_LEN..],
    })
}

/// SCTP chunks are not surfaced as a payload.
fn parse_sctp(data: &[u8]) -> Result<TransportLayer<'_>, DecodeError> {
    let (src_port, dst_port) = ports("SCTP", data, SCTP_HEADER_LEN)?;
    Ok(TransportLayer {
        kind: TransportKind::Other("SCTP"),
        src_port,
        dst_port,
        payload: &[],
    })
}

fn ports(protocol: &'static str, data: &[u8], header_len: usize) -> Result<(u16, u16), DecodeError> {
    if data.len() < header_len {
        return Err(DecodeError::PacketTooShort {
            protocol,
            needed: header_len,
            have: data.len(),
        });
    }
    Ok((
        u16::from_be_bytes([data[0], data[1]]),
        u16::from_be_bytes([data[2], data[3]]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_segment(flags: u8, payload: &[u8]) -> Vec<u8> {
        let mut segment = vec![
            0x30, 0x39, // src port 12345
            0x00, 0x50, // dst port 80
            0x00, 0x00, 0x00, 0x01, // seq
            0x00, 0x00, 0x00, 0x00, // ack
            0x50, flags, // data offset 5, flags
            0xff, 0xff, // window
            0x00, 0x00, // checksum
            0x00, 0x00, // urgent
        ];
        segment.extend_from_slice(payload);
        segment
    }

    #[test]
    fn test_tcp_ports_and_flags() {
        let segment = tcp_segment(0x18, b"GET");
        let layer = parse(ip_proto::TCP, &segment).unwrap().unwrap();

        assert_eq!(layer.kind.name(), "TCP");
        assert_eq!(layer.src_port, 12345);
        assert_eq!(layer.dst_port, 80);
        assert_eq!(layer.payload, b"GET");

        let flags = layer.kind.tcp_flags().unwrap();
        assert!(flags.psh && flags.ack);
        assert!(!flags.syn);
    }

    #[test]
    fn test_tcp_too_short() {
        let err = parse(ip_proto::TCP, &[0x30, 0x39, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { protocol: "TCP", .. }));
    }

    #[test]
    fn test_udp_payload_bounded_by_length() {
        let data = [
            0x00, 0x35, // src port 53
            0xc0, 0x00, // dst port 49152
            0x00, 0x0a, // length 10
            0x00, 0x00, // checksum
            0xab, 0xcd, // payload
            0x00, 0x00, // trailing bytes
        ];
        let layer = parse(ip_proto::UDP, &data).unwrap().unwrap();

        assert_eq!(layer.kind, TransportKind::Udp);
        assert_eq!(layer.kind.tcp_flags(), None);
        assert_eq!(layer.src_port, 53);
        assert_eq!(layer.dst_port, 49152);
        assert_eq!(layer.payload, &[0xab, 0xcd]);
    }

    #[test]
    fn test_udp_bad_length() {
        let data = [0x00, 0x35, 0x00, 0x35, 0x00, 0x04, 0x00, 0x00];
        assert!(parse(ip_proto::UDP, &data).is_err());
    }

    #[test]
    fn test_sctp_ports() {
        let mut data = vec![0x0b, 0x59, 0x0b, 0x5a];
        data.extend_from_slice(&[0u8; 12]);
        let layer = parse(ip_proto::SCTP, &data).unwrap().unwrap();

        assert_eq!(layer.kind.name(), "SCTP");
        assert_eq!((layer.src_port, layer.dst_port), (2905, 2906));
        assert!(layer.payload.is_empty());
    }

    #[test]
    fn test_udplite_payload() {
        let data = [0x04, 0x00, 0x04, 0x01, 0x00, 0x08, 0x00, 0x00, 0x01];
        let layer = parse(ip_proto::UDPLITE, &data).unwrap().unwrap();
        assert_eq!(layer.kind.name(), "UDPLite");
        assert_eq!(layer.payload, &[0x01]);
    }

    #[test]
    fn test_portless_protocol() {
        // ICMP
        assert!(parse(1, &[8, 0, 0, 0]).unwrap().is_none());
    }
}
