use chrono::Utc;

/// Source of capture timestamps
pub trait Clock: Send {
    /// Whole seconds since the Unix epoch
    fn epoch_secs(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to one instant, for replay and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn epoch_secs(&self) -> i64 {
        self.0
    }
}
