//! Application layer: protocol naming and HTTP request metadata.

use httparse::{Request, Status, EMPTY_HEADER};
use thiserror::Error;

use super::transport::TransportKind;
use crate::record::HttpRequest;

/// Maximum number of headers parsed per request.
const MAX_HEADERS: usize = 64;

/// Name of the application protocol carried between two ports.
///
/// Protocols are recognized by well-known port only; anything else is a
/// plain `Payload`.
pub fn protocol_name(transport: &TransportKind, src_port: u16, dst_port: u16) -> &'static str {
    let udp = matches!(transport, TransportKind::Udp);
    let on_port = |port: u16| src_port == port || dst_port == port;

    if on_port(53) || (udp && on_port(5353)) {
        "DNS"
    } else if udp && (on_port(67) || on_port(68)) {
        "DHCPv4"
    } else if udp && on_port(123) {
        "NTP"
    } else {
        "Payload"
    }
}

/// Why a payload is not an HTTP request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpParseError {
    #[error("request head not terminated within the payload")]
    Incomplete,

    #[error("invalid request: {0}")]
    Invalid(#[from] httparse::Error),
}

/// Parse the request line and headers of an HTTP/1.x request.
///
/// The body is never inspected. The hostname comes from the authority of an
/// absolute request target when there is one, otherwise from the `Host`
/// header.
pub fn parse_http_request(payload: &[u8]) -> Result<HttpRequest, HttpParseError> {
    let mut headers = [EMPTY_HEADER; MAX_HEADERS];
    let mut req = Request::new(&mut headers);

    match req.parse(payload) {
        Ok(Status::Complete(_)) => {}
        Ok(Status::Partial) => return Err(HttpParseError::Incomplete),
        Err(e) => return Err(e.into()),
    }

    let method = req.method.unwrap_or_default();
    let header = |name: &str| {
        req.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| String::from_utf8_lossy(h.value).trim().to_string())
    };

    let hostname = req
        .path
        .and_then(|target| target_authority(method, target))
        .map(str::to_string)
        .or_else(|| header("host"))
        .unwrap_or_default();

    Ok(HttpRequest {
        hostname,
        user_agent: header("user-agent").unwrap_or_default(),
        method: method.to_string(),
    })
}

/// Authority component of a request target, if it carries one.
fn target_authority<'a>(method: &str, target: &'a str) -> Option<&'a str> {
    if method == "CONNECT" && !target.starts_with('/') {
        return Some(target).filter(|t| !t.is_empty());
    }

    let (_, rest) = target.split_once("://")?;
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    Some(host).filter(|h| !h.is_empty())
}
