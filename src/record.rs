//! The flat record produced for each packet.

use serde::Serialize;

/// Normalized view of one packet.
///
/// Field groups are only populated when their layer exists in the packet:
/// `net_*` for a network layer, `trans_*` for a transport layer, `tcp` when
/// that transport is TCP, `app_proto` for a non-empty payload and `http` when
/// the payload is an HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    /// Total on-wire length of the packet.
    pub length: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_proto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_dst: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_proto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_dst: Option<String>,

    #[serde(rename = "TCP", skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpFlags>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_proto: Option<String>,

    #[serde(rename = "HTTP", skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpRequest>,
}

impl Record {
    /// Record for a packet of `length` bytes with no decoded layers.
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    pub fn has_network(&self) -> bool {
        self.net_proto.is_some()
    }

    pub fn has_transport(&self) -> bool {
        self.trans_proto.is_some()
    }
}

/// TCP control flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
    pub ns: bool,
}

impl TcpFlags {
    /// Extract the flags from bytes 12 and 13 of a TCP header.
    pub fn from_header_bytes(offset_byte: u8, flags_byte: u8) -> Self {
        Self {
            ns: offset_byte & 0x01 != 0,
            cwr: flags_byte & 0x80 != 0,
            ece: flags_byte & 0x40 != 0,
            urg: flags_byte & 0x20 != 0,
            ack: flags_byte & 0x10 != 0,
            psh: flags_byte & 0x08 != 0,
            rst: flags_byte & 0x04 != 0,
            syn: flags_byte & 0x02 != 0,
            fin: flags_byte & 0x01 != 0,
        }
    }
}

/// Metadata of an HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpRequest {
    pub hostname: String,
    pub user_agent: String,
    pub method: String,
}
