//! Lowers a logical [`BookingState`] into a query descriptor.
//!
//! The same [`BookingQuery`] drives both the in-memory predicate and the SQL
//! `WHERE` clause, so the two stores cannot disagree on what CURRENT means.

use chrono::{DateTime, Utc};

use crate::models::{Booking, BookingState, BookingStatus};

/// Whose bookings are being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    /// Bookings made by the user
    Booker,
    /// Bookings of items the user owns
    Owner,
}

/// Concrete set of bookings a listing runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingSelector {
    Booker(i64),
    Items(Vec<i64>),
}

impl BookingSelector {
    pub fn contains(&self, booking: &Booking) -> bool {
        match self {
            BookingSelector::Booker(id) => booking.booker_id == *id,
            BookingSelector::Items(ids) => ids.contains(&booking.item_id),
        }
    }
}

/// Time-derived part of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// `start <= now < end`
    Current,
    /// `end < now`
    Past,
    /// `start > now`
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingQuery {
    pub window: Option<TimeWindow>,
    pub status: Option<BookingStatus>,
    pub now: DateTime<Utc>,
}

impl BookingQuery {
    pub fn resolve(state: BookingState, now: DateTime<Utc>) -> Self {
        let (window, status) = match state {
            BookingState::All => (None, None),
            BookingState::Current => (Some(TimeWindow::Current), None),
            BookingState::Past => (Some(TimeWindow::Past), None),
            BookingState::Future => (Some(TimeWindow::Future), None),
            BookingState::Waiting => (None, Some(BookingStatus::Waiting)),
            BookingState::Rejected => (None, Some(BookingStatus::Rejected)),
        };
        Self {
            window,
            status,
            now,
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        let in_window = match self.window {
            None => true,
            Some(TimeWindow::Current) => booking.start <= self.now && self.now < booking.end,
            Some(TimeWindow::Past) => booking.end < self.now,
            Some(TimeWindow::Future) => booking.start > self.now,
        };
        in_window && self.status.is_none_or(|status| booking.status == status)
    }
}

/// Sorts most recent reservation first.
pub fn order_by_start_desc(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn booking(id: i64, start_h: i64, end_h: i64, status: BookingStatus) -> Booking {
        Booking {
            id,
            start: now() + Duration::hours(start_h),
            end: now() + Duration::hours(end_h),
            item_id: 1,
            booker_id: 2,
            status,
        }
    }

    #[test]
    fn test_all_matches_everything() {
        let query = BookingQuery::resolve(BookingState::All, now());
        assert!(query.matches(&booking(1, -5, -4, BookingStatus::Rejected)));
        assert!(query.matches(&booking(2, 4, 5, BookingStatus::Waiting)));
    }

    #[test]
    fn test_current_includes_start_and_excludes_end() {
        let query = BookingQuery::resolve(BookingState::Current, now());
        assert!(query.matches(&booking(1, 0, 1, BookingStatus::Approved)));
        assert!(query.matches(&booking(2, -1, 1, BookingStatus::Waiting)));
        assert!(!query.matches(&booking(3, -1, 0, BookingStatus::Approved)));
        assert!(!query.matches(&booking(4, 1, 2, BookingStatus::Approved)));
    }

    #[test]
    fn test_past_and_future_windows() {
        let past = BookingQuery::resolve(BookingState::Past, now());
        let future = BookingQuery::resolve(BookingState::Future, now());

        let finished = booking(1, -3, -1, BookingStatus::Approved);
        let upcoming = booking(2, 1, 3, BookingStatus::Waiting);
        let ending_now = booking(3, -1, 0, BookingStatus::Approved);

        assert!(past.matches(&finished));
        assert!(!past.matches(&upcoming));
        assert!(!past.matches(&ending_now));
        assert!(future.matches(&upcoming));
        assert!(!future.matches(&finished));
    }

    #[test]
    fn test_status_states_ignore_time() {
        let waiting = BookingQuery::resolve(BookingState::Waiting, now());
        let rejected = BookingQuery::resolve(BookingState::Rejected, now());

        assert!(waiting.matches(&booking(1, -3, -1, BookingStatus::Waiting)));
        assert!(!waiting.matches(&booking(2, 1, 3, BookingStatus::Approved)));
        assert!(rejected.matches(&booking(3, 1, 3, BookingStatus::Rejected)));
    }

    #[test]
    fn test_selector_scopes() {
        let b = booking(1, 1, 2, BookingStatus::Waiting);
        assert!(BookingSelector::Booker(2).contains(&b));
        assert!(!BookingSelector::Booker(3).contains(&b));
        assert!(BookingSelector::Items(vec![5, 1]).contains(&b));
        assert!(!BookingSelector::Items(vec![]).contains(&b));
    }

    #[test]
    fn test_order_by_start_desc() {
        let mut list = vec![
            booking(1, 1, 2, BookingStatus::Waiting),
            booking(2, 5, 6, BookingStatus::Waiting),
            booking(3, -4, -3, BookingStatus::Waiting),
        ];
        order_by_start_desc(&mut list);
        let ids: Vec<i64> = list.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
