//! Access to the host's wall clock.
//!
//! Widgets never call `chrono::Local` directly; they go through a
//! [`HostClock`] so the render loop can be driven by a fixed instant in
//! tests. The offset carried by the returned `DateTime` is the host's own
//! UTC offset at that instant.

use chrono::{DateTime, FixedOffset, Local};

pub trait HostClock: Send + Sync + 'static {
    /// Current local time, tagged with the host's UTC offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The machine's clock and time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl HostClock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Host offset as "hours behind UTC", i.e. the platform's minutes-behind-UTC
/// value divided by 60. Half-hour zones are truncated toward zero.
pub fn hours_behind_utc(now: &DateTime<FixedOffset>) -> i32 {
    -now.offset().local_minus_utc() / 3600
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl HostClock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
