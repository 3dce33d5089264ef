//! Capture sessions.
//!
//! A [`CaptureSource`] is bound to either a live interface or a capture file
//! for its whole lifetime and hands out packets one at a time, in arrival
//! order, through the [`PacketSource`] pull interface:
//!
//! - Offline sessions end with `Ok(None)`, and keep returning it.
//! - Live sessions never end on their own; they block until a packet arrives
//!   and stop only when closed through a [`CloseHandle`].
//! - A hard device or file error is returned once; the source then behaves
//!   as exhausted.

mod bpf;
mod filter;
mod live;
mod offline;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

pub use filter::PacketFilter;
pub use live::{list_interfaces, Interface, LiveCapture};
pub use offline::OfflineCapture;

use crate::config::{CaptureConfig, SourceKind};
use crate::error::CaptureError;
use crate::pcap::RawPacket;

/// Sequential source of captured packets.
///
/// Implementations are single-reader: callers serialize access.
pub trait PacketSource: Send {
    /// Next packet, `Ok(None)` at end of stream.
    fn next_packet(&mut self) -> Result<Option<RawPacket>, CaptureError>;
}

enum Session {
    Live(LiveCapture),
    Offline(OfflineCapture),
}

/// Capture session over a live interface or an offline file.
pub struct CaptureSource {
    session: Session,
    descriptor: String,
    closed: Arc<AtomicBool>,
    finished: bool,
}

impl CaptureSource {
    /// Open the session described by `config` and install its filter.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let closed = Arc::new(AtomicBool::new(false));
        let session = match &config.source {
            SourceKind::Live { interface } => {
                Session::Live(LiveCapture::open(interface, config, Arc::clone(&closed))?)
            }
            SourceKind::Offline { path } => {
                Session::Offline(OfflineCapture::open(path, &config.filter)?)
            }
        };

        let source = Self {
            session,
            descriptor: config.source.describe(),
            closed,
            finished: false,
        };
        info!(
            source = %source.descriptor,
            link_type = source.link_type(),
            filter = %config.filter,
            "capture session opened"
        );
        Ok(source)
    }

    /// Handle that closes this session from any thread.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle(Arc::clone(&self.closed))
    }

    pub fn is_live(&self) -> bool {
        matches!(self.session, Session::Live(_))
    }

    pub fn link_type(&self) -> u16 {
        match &self.session {
            Session::Live(live) => live.link_type(),
            Session::Offline(offline) => offline.link_type(),
        }
    }

    /// Interface or file the session is bound to.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

impl PacketSource for CaptureSource {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, CaptureError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CaptureError::Closed);
        }
        if self.finished {
            return Ok(None);
        }

        let result = match &mut self.session {
            Session::Live(live) => live.next_packet().map(Some),
            Session::Offline(offline) => offline.next_packet(),
        };

        match result {
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(CaptureError::Closed) => Err(CaptureError::Closed),
            Err(e) => {
                self.finished = true;
                Err(e)
            }
            packet => packet,
        }
    }
}

/// Closes a capture session.
///
/// Pending and later reads on the session return [`CaptureError::Closed`].
#[derive(Debug, Clone)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn close(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
