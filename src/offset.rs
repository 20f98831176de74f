//! Whole-hour offset arithmetic.
//!
//! The displayed time is not a true zone conversion. The locally sampled
//! calendar fields are shifted by a whole number of hours, so the selected
//! zone is emulated by a flat shift of the host's wall time. DST rules of the
//! selected zone are never consulted, and a half-hour host offset is off by
//! the truncated half hour.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("Shifting {local} by {delta_hours} hours leaves the supported calendar")]
    OutOfRange {
        local: NaiveDateTime,
        delta_hours: i32,
    },
}

/// Delta between the host offset and the selected offset.
///
/// `local_offset_hours` is the host offset as the platform reports it
/// (hours behind UTC), `selected_offset_hours` is the "+N" offset of the
/// selected zone. The result is the number of hours to add to the host's
/// wall time to obtain the selected zone's wall time.
pub fn compute_delta(local_offset_hours: i32, selected_offset_hours: i32) -> i32 {
    -(-local_offset_hours - selected_offset_hours)
}

/// The wall time to display: `now`'s local calendar fields moved by
/// `delta_hours`, carrying into the date as needed.
pub fn shifted_instant(
    now: &DateTime<FixedOffset>,
    delta_hours: i32,
) -> Result<NaiveDateTime, ShiftError> {
    let local = now.naive_local();
    local
        .checked_add_signed(Duration::hours(i64::from(delta_hours)))
        .ok_or(ShiftError::OutOfRange { local, delta_hours })
}
