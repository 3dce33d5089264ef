//! Packet decoding.
//!
//! Turns a [`RawPacket`] into a flat [`Record`] by walking the layers in
//! order (link, network, transport, application) and stopping at the first
//! one that is absent. Each stage either fills its field group or leaves it
//! empty; later stages never run once an earlier one stopped.
//!
//! Failures are handled by two policies:
//!
//! - structural failures in the link, network or transport headers are
//!   reported next to the partial record ([`ErrorPolicy::Warn`])
//! - a payload that is not an HTTP request is not an error at all
//!   ([`ErrorPolicy::Silent`])

mod app;
mod link;
mod network;
mod transport;

pub use app::{parse_http_request, protocol_name, HttpParseError};
pub use link::{ethertype, LinkLayer};
pub use network::{NetworkKind, NetworkLayer};
pub use transport::{ip_proto, TransportKind, TransportLayer};

use crate::error::DecodeError;
use crate::pcap::RawPacket;
use crate::record::Record;

/// What to do with a failed decoding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop decoding and report the error with the partial record.
    Warn,
    /// Stop decoding without reporting anything.
    Silent,
}

impl ErrorPolicy {
    /// Unwrap a stage result, recording the first failure when warning.
    fn apply<T>(self, result: Result<T, DecodeError>, error: &mut Option<DecodeError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if self == ErrorPolicy::Warn {
                    error.get_or_insert(e);
                }
                None
            }
        }
    }
}

/// A decoded packet: the record and the structural error, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub record: Record,
    pub error: Option<DecodeError>,
}

/// Stateless packet decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    structural: ErrorPolicy,
    http: ErrorPolicy,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            structural: ErrorPolicy::Warn,
            http: ErrorPolicy::Silent,
        }
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder with explicit policies for header failures and HTTP parse
    /// failures.
    pub fn with_policies(structural: ErrorPolicy, http: ErrorPolicy) -> Self {
        Self { structural, http }
    }

    pub fn structural_policy(&self) -> ErrorPolicy {
        self.structural
    }

    pub fn http_policy(&self) -> ErrorPolicy {
        self.http
    }

    /// Decode one packet.
    ///
    /// `Length` is always set. The error is `None` whenever every present
    /// layer decoded, including when the HTTP sub-parse failed under the
    /// default policy.
    pub fn decode(&self, packet: &RawPacket) -> Decoded {
        let mut record = Record::with_length(packet.original_length);
        let mut error = None;
        self.decode_layers(packet, &mut record, &mut error);
        Decoded { record, error }
    }

    fn decode_layers(
        &self,
        packet: &RawPacket,
        record: &mut Record,
        error: &mut Option<DecodeError>,
    ) -> Option<()> {
        let link = self
            .structural
            .apply(link::parse(packet.link_type, &packet.data), error)?;
        let network_kind = link.network?;

        let net = self
            .structural
            .apply(network::parse(network_kind, link.payload), error)?;
        record.net_proto = Some(net.kind.name().to_string());
        record.net_src = Some(net.src.to_string());
        record.net_dst = Some(net.dst.to_string());

        // Later fragments start mid-datagram, with no transport header
        if net.later_fragment {
            return None;
        }

        let trans = self
            .structural
            .apply(transport::parse(net.protocol, net.payload), error)??;
        record.trans_proto = Some(trans.kind.name().to_string());
        record.trans_src = Some(trans.src_port.to_string());
        record.trans_dst = Some(trans.dst_port.to_string());
        record.tcp = trans.kind.tcp_flags();

        if trans.payload.is_empty() {
            return None;
        }
        record.app_proto =
            Some(app::protocol_name(&trans.kind, trans.src_port, trans.dst_port).to_string());

        let http = app::parse_http_request(trans.payload).map_err(|e| DecodeError::Malformed {
            protocol: "HTTP",
            reason: e.to_string(),
        });
        record.http = Some(self.http.apply(http, error)?);
        Some(())
    }
}

/// Decode one packet with the default policies.
pub fn decode(packet: &RawPacket) -> Decoded {
    Decoder::default().decode(packet)
}
