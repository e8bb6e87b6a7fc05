use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, Item};

/// Who is looking at a booking, relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Booker,
    Owner,
    Stranger,
}

pub fn relation(user_id: i64, booking: &Booking, item: &Item) -> Relation {
    if item.owner_id == user_id {
        Relation::Owner
    } else if booking.booker_id == user_id {
        Relation::Booker
    } else {
        Relation::Stranger
    }
}

/// The single disclosure gate for bookings.
///
/// Callers that fail the check get the same error as for a missing booking,
/// so existence is never revealed to unrelated users.
pub fn authorize(
    user_id: i64,
    booking: &Booking,
    item: &Item,
    allowed: &[Relation],
) -> BookingResult<Relation> {
    let rel = relation(user_id, booking, item);
    if allowed.contains(&rel) {
        Ok(rel)
    } else {
        tracing::debug!(
            booking_id = booking.id,
            user_id,
            ?rel,
            "Booking hidden from user"
        );
        Err(BookingError::NotVisible {
            booking_id: booking.id,
            user_id,
        })
    }
}

/// Readable by the booker and the item owner.
pub fn can_view(user_id: i64, booking: &Booking, item: &Item) -> BookingResult<()> {
    authorize(user_id, booking, item, &[Relation::Booker, Relation::Owner]).map(|_| ())
}

/// Decidable by the item owner only.
pub fn can_decide(user_id: i64, booking: &Booking, item: &Item) -> BookingResult<()> {
    authorize(user_id, booking, item, &[Relation::Owner]).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::BookingStatus;
    use chrono::DateTime;

    fn fixture() -> (Booking, Item) {
        let at = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        let booking = Booking {
            id: 9,
            start: at,
            end: at,
            item_id: 3,
            booker_id: 2,
            status: BookingStatus::Waiting,
        };
        let item = Item {
            id: 3,
            name: "Tent".into(),
            description: "Two person tent".into(),
            available: true,
            owner_id: 1,
            request_id: None,
        };
        (booking, item)
    }

    #[test]
    fn test_booker_and_owner_can_view() {
        let (booking, item) = fixture();
        assert!(can_view(1, &booking, &item).is_ok());
        assert!(can_view(2, &booking, &item).is_ok());
    }

    #[test]
    fn test_stranger_gets_not_found() {
        let (booking, item) = fixture();
        let err = can_view(3, &booking, &item).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_only_owner_can_decide() {
        let (booking, item) = fixture();
        assert!(can_decide(1, &booking, &item).is_ok());
        let err = can_decide(2, &booking, &item).unwrap_err();
        assert!(matches!(
            err,
            BookingError::NotVisible {
                booking_id: 9,
                user_id: 2
            }
        ));
    }
}
