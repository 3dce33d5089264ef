//! Capture and run configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default snap length in bytes.
pub const DEFAULT_SNAPLEN: u32 = 1500;

/// Default live read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1);

/// Where packets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Live capture on a network interface
    Live { interface: String },
    /// Offline capture from a PCAP/PCAPNG file
    Offline { path: PathBuf },
}

impl SourceKind {
    /// Pick the source from an optional interface and file, which must not
    /// both be set.
    pub fn select(
        interface: Option<String>,
        path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        match (interface, path) {
            (Some(interface), None) => Ok(SourceKind::Live { interface }),
            (None, Some(path)) => Ok(SourceKind::Offline { path }),
            (Some(interface), Some(path)) => Err(ConfigError::ConflictingSources {
                interface,
                path: path.display().to_string(),
            }),
            (None, None) => Err(ConfigError::NoSource),
        }
    }

    /// Human-readable descriptor used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            SourceKind::Live { interface } => format!("interface {interface}"),
            SourceKind::Offline { path } => format!("file {}", path.display()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SourceKind::Live { .. })
    }
}

/// Settings needed to open a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source: SourceKind,
    /// Maximum bytes captured per packet (live only)
    pub snaplen: u32,
    /// Put the interface into promiscuous mode (live only)
    pub promiscuous: bool,
    /// Read timeout governing kernel batching (live only)
    pub timeout: Duration,
    /// BPF filter expression; empty accepts everything
    pub filter: String,
}

impl CaptureConfig {
    /// Live capture on `interface` with default settings.
    pub fn live(interface: impl Into<String>) -> Self {
        Self::new(SourceKind::Live {
            interface: interface.into(),
        })
    }

    /// Offline capture from `path` with default settings.
    pub fn offline(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceKind::Offline { path: path.into() })
    }

    /// Capture from `source` with default settings.
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: false,
            timeout: DEFAULT_TIMEOUT,
            filter: String::new(),
        }
    }

    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = expression.into();
        self
    }

    pub fn snaplen(mut self, snaplen: u32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snaplen == 0 {
            return Err(ConfigError::ZeroSnaplen);
        }
        Ok(())
    }
}

/// Full configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub capture: CaptureConfig,
    /// Number of decode workers
    pub workers: NonZeroUsize,
    /// Emit sampled progress logs
    pub debug: bool,
}

impl RunConfig {
    pub fn new(capture: CaptureConfig, workers: usize, debug: bool) -> Result<Self, ConfigError> {
        capture.validate()?;
        let workers = NonZeroUsize::new(workers).ok_or(ConfigError::ZeroWorkers)?;
        Ok(Self {
            capture,
            workers,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_live() {
        let kind = SourceKind::select(Some("eth0".to_string()), None).unwrap();
        assert_eq!(
            kind,
            SourceKind::Live {
                interface: "eth0".to_string()
            }
        );
        assert!(kind.is_live());
    }

    #[test]
    fn test_select_offline() {
        let kind = SourceKind::select(None, Some(PathBuf::from("dump.pcap"))).unwrap();
        assert!(!kind.is_live());
        assert_eq!(kind.describe(), "file dump.pcap");
    }

    #[test]
    fn test_select_conflict() {
        let err = SourceKind::select(Some("eth0".into()), Some("dump.pcap".into())).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingSources { .. }));
    }

    #[test]
    fn test_select_none() {
        assert_eq!(SourceKind::select(None, None), Err(ConfigError::NoSource));
    }

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::live("en0");
        assert_eq!(config.snaplen, DEFAULT_SNAPLEN);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(!config.promiscuous);
        assert!(config.filter.is_empty());
    }

    #[test]
    fn test_zero_snaplen_rejected() {
        let config = CaptureConfig::live("en0").snaplen(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroSnaplen));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = RunConfig::new(CaptureConfig::offline("x.pcap"), 0, false).unwrap_err();
        assert_eq!(err, ConfigError::ZeroWorkers);
    }
}
