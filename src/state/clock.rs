use std::time::SystemTime;

/// Source of wall-clock time used to stamp anchors and derive countdowns.
pub trait Clock: Send + Sync {
    /// Current wall-clock instant.
    fn now(&self) -> SystemTime;
}

/// Reads the host clock. No NTP correction is attempted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
