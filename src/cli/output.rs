//! Output formatting for decoded records.

use std::fmt::Write as _;
use std::io::Write;

use clap::ValueEnum;
use parking_lot::Mutex;

use crate::error::Error;
use crate::pipeline::RecordSink;
use crate::record::Record;
use crate::source::Emitted;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per record)
    Json,
    /// One human-readable line per record
    Text,
}

/// Sink writing one line per record to a shared writer.
pub struct RecordWriter<W> {
    format: OutputFormat,
    writer: Mutex<W>,
}

impl<W: Write + Send> RecordWriter<W> {
    pub fn new(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
        }
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn format_line(&self, emitted: &Emitted) -> Result<String, Error> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(&emitted.record)?),
            OutputFormat::Text => Ok(text_line(emitted.sequence, &emitted.record)),
        }
    }
}

impl<W: Write + Send> RecordSink for RecordWriter<W> {
    fn accept(&self, emitted: Emitted) -> Result<(), Error> {
        // Format outside the lock
        let line = self.format_line(&emitted)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// `seq len proto src:port > dst:port flags app host`, with absent layers
/// left out.
fn text_line(sequence: u64, record: &Record) -> String {
    let mut line = format!("{sequence} len={}", record.length);

    if let (Some(proto), Some(src), Some(dst)) = (&record.net_proto, &record.net_src, &record.net_dst)
    {
        match (&record.trans_proto, &record.trans_src, &record.trans_dst) {
            (Some(trans), Some(sport), Some(dport)) => {
                let _ = write!(line, " {proto}/{trans} {src}:{sport} > {dst}:{dport}");
            }
            _ => {
                let _ = write!(line, " {proto} {src} > {dst}");
            }
        }
    }

    if let Some(tcp) = &record.tcp {
        let flags: String = [
            (tcp.syn, 'S'),
            (tcp.fin, 'F'),
            (tcp.rst, 'R'),
            (tcp.psh, 'P'),
            (tcp.ack, '.'),
            (tcp.urg, 'U'),
            (tcp.ece, 'E'),
            (tcp.cwr, 'W'),
            (tcp.ns, 'N'),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, c)| *c)
        .collect();
        let _ = write!(line, " [{flags}]");
    }

    if let Some(app) = &record.app_proto {
        let _ = write!(line, " {app}");
    }

    if let Some(http) = &record.http {
        let _ = write!(line, " {} {}", http.method, http.hostname);
        if !http.user_agent.is_empty() {
            let _ = write!(line, " ua={:?}", http.user_agent);
        }
    }

    line
}
