//! Live capture on a network interface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pcap::{Active, Capture, Device};

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::pcap::RawPacket;

/// Capture session bound to an interface through libpcap.
pub struct LiveCapture {
    capture: Capture<Active>,
    link_type: u16,
    frame_number: u64,
    closed: Arc<AtomicBool>,
}

impl LiveCapture {
    /// Open `interface` and install the configured filter in the kernel.
    pub fn open(
        interface: &str,
        config: &CaptureConfig,
        closed: Arc<AtomicBool>,
    ) -> Result<Self, CaptureError> {
        let open_error = |e: pcap::Error| CaptureError::Open {
            source_name: interface.to_string(),
            reason: e.to_string(),
        };

        // A zero timeout blocks forever on most platforms, and closing is
        // only observed between reads.
        let timeout_ms = config.timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let snaplen = config.snaplen.min(i32::MAX as u32) as i32;

        let mut capture = Capture::from_device(interface)
            .map_err(open_error)?
            .promisc(config.promiscuous)
            .snaplen(snaplen)
            .timeout(timeout_ms)
            .open()
            .map_err(open_error)?;

        if !config.filter.trim().is_empty() {
            capture
                .set_filter(&config.filter)
                .map_err(|e| CaptureError::Filter {
                    expression: config.filter.clone(),
                    reason: e.to_string(),
                })?;
        }

        let link_type = capture.get_datalink().0 as u16;

        Ok(Self {
            capture,
            link_type,
            frame_number: 0,
            closed,
        })
    }

    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// Block until the next packet arrives.
    ///
    /// Read timeouts only end a kernel batch; the wait resumes unless the
    /// session was closed in the meantime.
    pub fn next_packet(&mut self) -> Result<RawPacket, CaptureError> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(CaptureError::Closed);
            }
            match self.capture.next_packet() {
                Ok(packet) => {
                    self.frame_number += 1;
                    let ts = packet.header.ts;
                    let timestamp_us = (ts.tv_sec as i64) * 1_000_000 + ts.tv_usec as i64;
                    return Ok(RawPacket::new(
                        self.frame_number,
                        timestamp_us,
                        packet.header.len,
                        self.link_type,
                        packet.data.to_vec(),
                    ));
                }
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => return Err(CaptureError::Device(e.to_string())),
            }
        }
    }
}

/// An interface that can be captured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub description: Option<String>,
    pub addresses: Vec<std::net::IpAddr>,
}

/// Interfaces libpcap can open, in the order it reports them.
pub fn list_interfaces() -> Result<Vec<Interface>, CaptureError> {
    let devices = Device::list().map_err(|e| CaptureError::Device(e.to_string()))?;
    Ok(devices
        .into_iter()
        .map(|device| Interface {
            name: device.name,
            description: device.desc,
            addresses: device.addresses.into_iter().map(|a| a.addr).collect(),
        })
        .collect())
}
