//! Validation of a proposed booking window.
//!
//! Everything here is pure: callers pass in the item, the item's existing
//! bookings and the current time. The overlap check is re-run by the stores
//! inside their atomic insert.

use chrono::{DateTime, Utc};

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, Item, NewBooking};

/// Rejects windows in the past, reversed windows and empty windows, in that order.
pub fn validate_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> BookingResult<()> {
    if end < now {
        return Err(BookingError::InvalidWindow(format!(
            "end {} is earlier than current time {}",
            end, now
        )));
    }
    if start < now {
        return Err(BookingError::InvalidWindow(format!(
            "start {} is earlier than current time {}",
            start, now
        )));
    }
    if end < start {
        return Err(BookingError::InvalidWindow(format!(
            "end {} is earlier than start {}",
            end, start
        )));
    }
    if end == start {
        return Err(BookingError::InvalidWindow(format!(
            "end {} is equal to start",
            end
        )));
    }
    Ok(())
}

/// Half-open intervals `[a_start, a_end)` and `[b_start, b_end)` intersect.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Fails if any booking of the same item that still holds its interval
/// intersects the candidate.
pub fn ensure_no_overlap(candidate: &NewBooking, existing: &[Booking]) -> BookingResult<()> {
    let clash = existing.iter().find(|b| {
        b.item_id == candidate.item_id
            && b.status.blocks_interval()
            && overlaps(b.start, b.end, candidate.start, candidate.end)
    });

    match clash {
        Some(other) => {
            tracing::debug!(
                item_id = candidate.item_id,
                conflicting_booking = other.id,
                "Booking window overlaps an existing booking"
            );
            Err(BookingError::Overlap(candidate.item_id))
        }
        None => Ok(()),
    }
}

/// All checks that do not need the item's other bookings.
///
/// Order: window checks, item existence, self-booking, availability.
pub fn validate_request<'a>(
    candidate: &NewBooking,
    item: Option<&'a Item>,
    now: DateTime<Utc>,
) -> BookingResult<&'a Item> {
    validate_window(candidate.start, candidate.end, now)?;

    let item = item.ok_or(BookingError::ItemNotFound(candidate.item_id))?;

    if item.owner_id == candidate.booker_id {
        return Err(BookingError::OwnItem(item.id));
    }
    if !item.available {
        return Err(BookingError::ItemUnavailable(item.id));
    }

    Ok(item)
}

/// [`validate_request`] followed by [`ensure_no_overlap`].
pub fn validate(
    candidate: &NewBooking,
    item: Option<&Item>,
    existing: &[Booking],
    now: DateTime<Utc>,
) -> BookingResult<()> {
    validate_request(candidate, item, now)?;
    ensure_no_overlap(candidate, existing)
}
