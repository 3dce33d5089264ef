//! Decode workers draining a [`RecordSource`] into a [`RecordSink`].

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::capture::PacketSource;
use crate::error::{CaptureError, Error};
use crate::source::{Emitted, RecordSource};

/// Consumer of decoded records, shared by all workers.
pub trait RecordSink: Sync {
    fn accept(&self, emitted: Emitted) -> Result<(), Error>;
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub records: u64,
    pub decode_errors: u64,
}

impl Summary {
    fn merge(self, other: Summary) -> Summary {
        Summary {
            records: self.records + other.records,
            decode_errors: self.decode_errors + other.decode_errors,
        }
    }
}

/// Drain `source` with `workers` threads, handing every record to `sink`.
///
/// Returns when the stream ends or the session is closed. The first capture
/// or sink error is returned instead of the summary, and the other workers
/// stop before their next read.
pub fn run<S, K>(source: &RecordSource<S>, workers: NonZeroUsize, sink: &K) -> Result<Summary, Error>
where
    S: PacketSource,
    K: RecordSink,
{
    let failed = AtomicBool::new(false);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.get())
            .map(|worker| {
                let failed = &failed;
                scope.spawn(move || {
                    let result = drain(worker, source, sink, failed);
                    if result.is_err() {
                        failed.store(true, Ordering::Release);
                    }
                    result
                })
            })
            .collect();

        let mut summary = Summary::default();
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(partial)) => summary = summary.merge(partial),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    })
}

fn drain<S, K>(
    worker: usize,
    source: &RecordSource<S>,
    sink: &K,
    failed: &AtomicBool,
) -> Result<Summary, Error>
where
    S: PacketSource,
    K: RecordSink,
{
    let mut summary = Summary::default();
    while !failed.load(Ordering::Acquire) {
        let emitted = match source.next_record() {
            Ok(Some(emitted)) => emitted,
            Ok(None) => break,
            Err(CaptureError::Closed) => {
                debug!(worker, "capture session closed");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(e) = &emitted.error {
            summary.decode_errors += 1;
            warn!(sequence = emitted.sequence, error = %e, "decoding packet");
        }
        summary.records += 1;
        sink.accept(emitted)?;
    }
    debug!(worker, records = summary.records, "worker finished");
    Ok(summary)
}
