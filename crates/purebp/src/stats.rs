//! Per-engine transfer counters.
//!
//! Every engine keeps a running [`EngineStats`] so callers can see how
//! many transfers were scheduled, how many were executed, and how much
//! data moved through the transport. Counters are plain fields; engines
//! are single-threaded by construction.

/// Snapshot of one engine's transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Puts scheduled since open.
    pub puts_scheduled: u64,
    /// Puts drained by a flush or close.
    pub puts_executed: u64,
    /// Gets scheduled since open.
    pub gets_scheduled: u64,
    /// Gets resolved by a flush.
    pub gets_executed: u64,
    /// Container bytes committed to the transport.
    pub bytes_written: u64,
    /// Payload bytes decoded from the transport.
    pub bytes_read: u64,
}

impl EngineStats {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfers scheduled in either direction.
    pub fn scheduled(&self) -> u64 {
        self.puts_scheduled + self.gets_scheduled
    }

    /// Transfers executed in either direction.
    pub fn executed(&self) -> u64 {
        self.puts_executed + self.gets_executed
    }

    /// Scheduled transfers not yet executed.
    pub fn outstanding(&self) -> u64 {
        self.scheduled().saturating_sub(self.executed())
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
