//! The approval workflow of a booking.
//!
//! ```text
//!            approve(true)
//!  WAITING ─────────────────▶ APPROVED
//!     │
//!     │      approve(false)
//!     └─────────────────────▶ REJECTED
//! ```
//!
//! `CANCELLED` is a reserved status with no incoming transition.

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus};

/// Status every new booking starts in.
pub const INITIAL_STATUS: BookingStatus = BookingStatus::Waiting;

/// Outcome chosen by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            Decision::Approve
        } else {
            Decision::Reject
        }
    }

    pub fn target(self) -> BookingStatus {
        match self {
            Decision::Approve => BookingStatus::Approved,
            Decision::Reject => BookingStatus::Rejected,
        }
    }
}

/// Checks that `booking` may still be decided and returns the status it moves to.
///
/// An already approved booking is a conflict; any other non-waiting status
/// is an invalid transition.
pub fn transition(booking: &Booking, decision: Decision) -> BookingResult<BookingStatus> {
    match booking.status {
        BookingStatus::Waiting => Ok(decision.target()),
        BookingStatus::Approved => Err(BookingError::AlreadyApproved(booking.id)),
        status => Err(BookingError::AlreadyDecided {
            id: booking.id,
            status,
        }),
    }
}
