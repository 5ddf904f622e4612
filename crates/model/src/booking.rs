//! Booking arithmetic: inclusive day counting, pricing, the interval
//! overlap test, and the read-time status derivation.

use chrono::NaiveDate;

use crate::status::{EffectiveStatus, ReservationStatus};

/// Number of days billed for a rental from `start` to `end` (both
/// inclusive). A same-day rental bills one day; otherwise every calendar
/// day touched by the range is billed, so 2024-03-01..2024-03-03 is three
/// days.
pub fn billed_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if start == end {
        1
    } else {
        (end - start).num_days() + 1
    }
}

/// Total price in minor currency units for a rental at `daily_rate`.
pub fn rental_price(daily_rate: i64, start: NaiveDate, end: NaiveDate) -> i64 {
    billed_days(start, end) * daily_rate
}

/// Interval overlap test used for double-booking detection:
/// `a.start < b.end AND b.start < a.end`.
///
/// Strict inequalities mean back-to-back bookings sharing a boundary date
/// do not conflict.
pub fn intervals_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Derive the client-facing status. A confirmed reservation whose date
/// range spans `today` reads as "ongoing"; nothing is ever stored for it.
pub fn effective_status(
    status: ReservationStatus,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> EffectiveStatus {
    match status {
        ReservationStatus::Pending => EffectiveStatus::Pending,
        ReservationStatus::Confirmed => {
            if start <= today && today <= end {
                EffectiveStatus::Ongoing
            } else {
                EffectiveStatus::Confirmed
            }
        }
        ReservationStatus::Completed => EffectiveStatus::Completed,
        ReservationStatus::Cancelled => EffectiveStatus::Cancelled,
    }
}
