//! Progress counting shared by the decode workers.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts packets pulled from a capture session.
pub trait Counter: Send + Sync + Debug {
    /// Add one and return the new count.
    fn increment(&self) -> u64;

    fn get(&self) -> u64;
}

/// Lock-free [`Counter`].
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for AtomicCounter {
    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sampling rule for progress diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressLog {
    enabled: bool,
}

impl ProgressLog {
    const INTERVAL: u64 = 1000;
    const OFFSET: u64 = 20;

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True for the 20th, 1020th, 2020th... packet when enabled.
    pub fn should_log(&self, count: u64) -> bool {
        self.enabled && count % Self::INTERVAL == Self::OFFSET
    }
}
