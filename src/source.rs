//! Record source: packets from a capture session, numbered and decoded.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::capture::{CaptureSource, PacketSource};
use crate::counter::{Counter, ProgressLog};
use crate::decode::{Decoded, Decoder};
use crate::error::{CaptureError, DecodeError};
use crate::record::Record;

/// One decoded packet handed out by a [`RecordSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// Position in the stream, starting at 1
    pub sequence: u64,
    /// Capture timestamp (microseconds since epoch)
    pub timestamp_us: i64,
    pub record: Record,
    /// Structural decode failure; `record` holds the fields gathered before it
    pub error: Option<DecodeError>,
}

/// Pull interface over a capture session that can be shared by workers.
///
/// The session is locked only while a packet is read and numbered, so the
/// sequence number always matches arrival order. Decoding happens outside
/// the lock.
pub struct RecordSource<S = CaptureSource> {
    capture: Mutex<S>,
    counter: Arc<dyn Counter>,
    progress: ProgressLog,
    decoder: Decoder,
}

impl<S: PacketSource> RecordSource<S> {
    pub fn new(capture: S, counter: Arc<dyn Counter>, progress: ProgressLog) -> Self {
        Self {
            capture: Mutex::new(capture),
            counter,
            progress,
            decoder: Decoder::default(),
        }
    }

    /// Replace the default decoder.
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn counter(&self) -> &Arc<dyn Counter> {
        &self.counter
    }

    /// Read and decode the next packet.
    ///
    /// Returns `Ok(None)` at end of stream. A capture error is terminal for
    /// the session; decode failures are reported inside [`Emitted`].
    pub fn next_record(&self) -> Result<Option<Emitted>, CaptureError> {
        let (sequence, packet) = {
            let mut capture = self.capture.lock();
            match capture.next_packet()? {
                Some(packet) => (self.counter.increment(), packet),
                None => return Ok(None),
            }
        };

        if self.progress.should_log(sequence) {
            info!(packets = sequence, "record source progress");
        }

        let Decoded { record, error } = self.decoder.decode(&packet);
        Ok(Some(Emitted {
            sequence,
            timestamp_us: packet.timestamp_us,
            record,
            error,
        }))
    }

    /// Iterate over the remaining records.
    ///
    /// The iterator ends at end of stream or after yielding a capture error.
    pub fn records(&self) -> Records<'_, S> {
        Records {
            source: self,
            done: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.capture.into_inner()
    }
}

/// Iterator returned by [`RecordSource::records`].
pub struct Records<'a, S> {
    source: &'a RecordSource<S>,
    done: bool,
}

impl<S: PacketSource> Iterator for Records<'_, S> {
    type Item = Result<Emitted, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_record() {
            Ok(Some(emitted)) => Some(Ok(emitted)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
