//! BPF filters evaluated in user space.

use pcap::{BpfProgram, Capture, Linktype};

use super::bpf::Instructions;
use crate::error::CaptureError;
use crate::pcap::linktype;

/// libpcap's `DLT_RAW`, which differs from the file format's `LINKTYPE_RAW`.
const DLT_RAW: i32 = if cfg!(target_os = "openbsd") { 14 } else { 12 };

/// A filter expression compiled by libpcap for one link type.
///
/// Live sessions install their filter in the kernel; offline files are read
/// by our own reader, so their packets are matched against this program.
pub struct PacketFilter {
    expression: String,
    link_type: u16,
    program: Program,
    instructions: Instructions,
}

struct Program(BpfProgram);

// SAFETY: a compiled program is an immutable instruction array owned by this
// value. libpcap only reads it while matching and frees it on drop.
unsafe impl Send for Program {}

impl PacketFilter {
    /// Compile `expression` for packets of `link_type`.
    pub fn compile(expression: &str, link_type: u16) -> Result<Self, CaptureError> {
        let filter_error = |e: pcap::Error| CaptureError::Filter {
            expression: expression.to_string(),
            reason: e.to_string(),
        };

        let dead = Capture::dead(Linktype(dlt(link_type))).map_err(filter_error)?;
        let program = dead.compile(expression, true).map_err(filter_error)?;
        let instructions =
            Instructions::from_program(&program).ok_or_else(|| CaptureError::Filter {
                expression: expression.to_string(),
                reason: "unreadable compiled program".to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            link_type,
            program: Program(program),
            instructions,
        })
    }

    /// Whether a packet of `wire_len` bytes, captured as `data`, satisfies
    /// the filter.
    ///
    /// libpcap's matcher assumes nothing was cut off, so truncated packets
    /// are evaluated against the compiled instructions directly.
    pub fn matches(&self, data: &[u8], wire_len: u32) -> bool {
        if data.len() >= wire_len as usize {
            self.program.0.filter(data)
        } else {
            self.instructions.run(data, wire_len) != 0
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn link_type(&self) -> u16 {
        self.link_type
    }
}

/// Map a file link type to the value libpcap compiles filters against.
fn dlt(link_type: u16) -> i32 {
    match link_type {
        linktype::RAW => DLT_RAW,
        other => i32::from(other),
    }
}

impl std::fmt::Debug for PacketFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketFilter")
            .field("expression", &self.expression)
            .field("link_type", &self.link_type)
            .finish()
    }
}
