use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::access;
use crate::clock::Clock;
use crate::directory::{ItemDirectory, UserDirectory};
use crate::error::{BookingError, BookingResult};
use crate::filter::{BookingQuery, BookingScope, BookingSelector};
use crate::interval;
use crate::models::{Booking, BookingState, BookingStatus, BookingView, CreateBooking, NewBooking};
use crate::repository::BookingRepository;
use crate::state::{self, Decision};

/// Service layer for the booking lifecycle
///
/// The only component that reads bookings, items and users together.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserDirectory>,
    items: Arc<dyn ItemDirectory>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserDirectory>,
        items: Arc<dyn ItemDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            users,
            items,
            clock,
        }
    }

    /// Request a booking; it starts out `WAITING`.
    pub async fn create_booking(
        &self,
        user_id: i64,
        input: CreateBooking,
    ) -> BookingResult<BookingView> {
        input
            .validate()
            .map_err(|e| BookingError::Validation(e.to_string()))?;

        let now = self.clock.now();
        interval::validate_window(input.start, input.end, now)?;

        let booker = self
            .users
            .find(user_id)
            .await?
            .ok_or(BookingError::UserNotFound(user_id))?;

        let candidate = NewBooking {
            item_id: input.item_id,
            booker_id: user_id,
            start: input.start,
            end: input.end,
        };
        let item = self.items.find(candidate.item_id).await?;
        let item = interval::validate_request(&candidate, item.as_ref(), now)?.clone();

        let booking = self.bookings.insert_if_available(candidate).await?;
        Ok(BookingView::new(booking, booker, item))
    }

    /// Approve or reject a waiting booking as the item owner.
    pub async fn approve_booking(
        &self,
        owner_id: i64,
        booking_id: i64,
        approved: bool,
    ) -> BookingResult<BookingView> {
        let mut booking = self.find_booking(booking_id).await?;

        if !self.users.exists(owner_id).await? {
            return Err(BookingError::UnknownActor(owner_id));
        }

        let item = self
            .items
            .find(booking.item_id)
            .await?
            .ok_or(BookingError::ItemNotFound(booking.item_id))?;
        access::can_decide(owner_id, &booking, &item)?;

        let decision = Decision::from_approved(approved);
        let decided = loop {
            let target = state::transition(&booking, decision)?;
            match self
                .bookings
                .compare_and_set_status(booking.id, BookingStatus::Waiting, target)
                .await?
            {
                Some(updated) => break updated,
                // Decided concurrently; rerun the guard against the stored status.
                None => booking = self.find_booking(booking_id).await?,
            }
        };

        tracing::info!(booking_id, owner_id, status = %decided.status, "Booking decided");

        let booker = self
            .users
            .find(decided.booker_id)
            .await?
            .ok_or(BookingError::UserNotFound(decided.booker_id))?;
        Ok(BookingView::new(decided, booker, item))
    }

    /// Get a booking visible to the booker or the item owner.
    pub async fn get_booking(&self, user_id: i64, booking_id: i64) -> BookingResult<BookingView> {
        let booking = self.find_booking(booking_id).await?;

        if !self.users.exists(user_id).await? {
            return Err(BookingError::UserNotFound(user_id));
        }

        let item = self
            .items
            .find(booking.item_id)
            .await?
            .ok_or(BookingError::ItemNotFound(booking.item_id))?;
        access::can_view(user_id, &booking, &item)?;

        let booker = self
            .users
            .find(booking.booker_id)
            .await?
            .ok_or(BookingError::UserNotFound(booking.booker_id))?;
        Ok(BookingView::new(booking, booker, item))
    }

    pub async fn list_by_booker(
        &self,
        user_id: i64,
        state: &str,
    ) -> BookingResult<Vec<BookingView>> {
        self.list_bookings(user_id, BookingScope::Booker, state).await
    }

    pub async fn list_by_owner(&self, user_id: i64, state: &str) -> BookingResult<Vec<BookingView>> {
        self.list_bookings(user_id, BookingScope::Owner, state).await
    }

    /// List bookings in `scope` matching a state token, most recent start first.
    ///
    /// The user is checked before the token is parsed.
    pub async fn list_bookings(
        &self,
        user_id: i64,
        scope: BookingScope,
        state: &str,
    ) -> BookingResult<Vec<BookingView>> {
        if !self.users.exists(user_id).await? {
            return Err(BookingError::UserNotFound(user_id));
        }

        let state = BookingState::parse(state)?;
        let query = BookingQuery::resolve(state, self.clock.now());

        let selector = match scope {
            BookingScope::Booker => BookingSelector::Booker(user_id),
            BookingScope::Owner => {
                let item_ids = self
                    .items
                    .list_by_owner(user_id)
                    .await?
                    .into_iter()
                    .map(|item| item.id)
                    .collect();
                BookingSelector::Items(item_ids)
            }
        };

        let bookings = self.bookings.list(selector, query).await?;
        self.views(bookings).await
    }

    async fn find_booking(&self, booking_id: i64) -> BookingResult<Booking> {
        self.bookings
            .find(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Attaches bookers and items with one lookup each.
    async fn views(&self, bookings: Vec<Booking>) -> BookingResult<Vec<BookingView>> {
        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let mut booker_ids: Vec<i64> = bookings.iter().map(|b| b.booker_id).collect();
        booker_ids.sort_unstable();
        booker_ids.dedup();
        let mut item_ids: Vec<i64> = bookings.iter().map(|b| b.item_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let (users, items) = tokio::try_join!(
            self.users.find_many(booker_ids),
            self.items.find_many(item_ids),
        )?;
        let users: HashMap<i64, _> = users.into_iter().map(|u| (u.id, u)).collect();
        let items: HashMap<i64, _> = items.into_iter().map(|i| (i.id, i)).collect();

        bookings
            .into_iter()
            .map(|booking| {
                let booker = users
                    .get(&booking.booker_id)
                    .cloned()
                    .ok_or(BookingError::UserNotFound(booking.booker_id))?;
                let item = items
                    .get(&booking.item_id)
                    .cloned()
                    .ok_or(BookingError::ItemNotFound(booking.item_id))?;
                Ok(BookingView::new(booking, booker, item))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::{MockItemDirectory, MockUserDirectory};
    use crate::error::ErrorKind;
    use crate::models::{Item, User};
    use crate::repository::MockBookingRepository;
    use chrono::{DateTime, Duration, Utc};
    use mockall::predicate::eq;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn user(id: i64) -> User {
        User {
            id,
            name: format!("user {}", id),
            email: format!("user{}@example.com", id),
        }
    }

    fn item() -> Item {
        Item {
            id: 10,
            name: "Kayak".into(),
            description: "Single seat kayak".into(),
            available: true,
            owner_id: 1,
            request_id: None,
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: 5,
            start: now() + Duration::hours(1),
            end: now() + Duration::hours(2),
            item_id: 10,
            booker_id: 2,
            status,
        }
    }

    fn service(
        bookings: MockBookingRepository,
        users: MockUserDirectory,
        items: MockItemDirectory,
    ) -> BookingService {
        BookingService::new(
            Arc::new(bookings),
            Arc::new(users),
            Arc::new(items),
            Arc::new(FixedClock::new(now())),
        )
    }

    #[tokio::test]
    async fn test_create_booking_success() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_insert_if_available()
            .times(1)
            .returning(|candidate| {
                Ok(Booking {
                    id: 5,
                    start: candidate.start,
                    end: candidate.end,
                    item_id: candidate.item_id,
                    booker_id: candidate.booker_id,
                    status: BookingStatus::Waiting,
                })
            });
        let mut users = MockUserDirectory::new();
        users
            .expect_find()
            .with(eq(2))
            .returning(|id| Ok(Some(user(id))));
        let mut items = MockItemDirectory::new();
        items
            .expect_find()
            .with(eq(10))
            .returning(|_| Ok(Some(item())));

        let view = service(bookings, users, items)
            .create_booking(
                2,
                CreateBooking {
                    item_id: 10,
                    start: now() + Duration::hours(1),
                    end: now() + Duration::hours(2),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.status, BookingStatus::Waiting);
        assert_eq!(view.booker.id, 2);
        assert_eq!(view.item.id, 10);
    }

    #[tokio::test]
    async fn test_create_booking_invalid_window_touches_nothing() {
        // No expectations: any store access would panic.
        let svc = service(
            MockBookingRepository::new(),
            MockUserDirectory::new(),
            MockItemDirectory::new(),
        );

        let err = svc
            .create_booking(
                2,
                CreateBooking {
                    item_id: 10,
                    start: now() + Duration::hours(2),
                    end: now() + Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidWindow(_)));
    }

    #[tokio::test]
    async fn test_create_booking_unknown_user() {
        let mut users = MockUserDirectory::new();
        users.expect_find().returning(|_| Ok(None));

        let err = service(MockBookingRepository::new(), users, MockItemDirectory::new())
            .create_booking(
                42,
                CreateBooking {
                    item_id: 10,
                    start: now() + Duration::hours(1),
                    end: now() + Duration::hours(2),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UserNotFound(42)));
    }

    #[tokio::test]
    async fn test_owner_cannot_book_own_item() {
        let mut users = MockUserDirectory::new();
        users.expect_find().returning(|id| Ok(Some(user(id))));
        let mut items = MockItemDirectory::new();
        items.expect_find().returning(|_| Ok(Some(item())));

        let err = service(MockBookingRepository::new(), users, items)
            .create_booking(
                1,
                CreateBooking {
                    item_id: 10,
                    start: now() + Duration::hours(1),
                    end: now() + Duration::hours(2),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::OwnItem(10)));
    }

    #[tokio::test]
    async fn test_approve_by_unknown_actor_is_bad_request() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find()
            .returning(|_| Ok(Some(booking(BookingStatus::Waiting))));
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(false));

        let err = service(bookings, users, MockItemDirectory::new())
            .approve_booking(77, 5, true)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UnknownActor(77)));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_approve_by_booker_is_not_found() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find()
            .returning(|_| Ok(Some(booking(BookingStatus::Waiting))));
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut items = MockItemDirectory::new();
        items.expect_find().returning(|_| Ok(Some(item())));

        let err = service(bookings, users, items)
            .approve_booking(2, 5, true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_approve_reruns_guard_after_lost_race() {
        let mut bookings = MockBookingRepository::new();
        let mut finds = 0;
        bookings.expect_find().times(2).returning(move |_| {
            finds += 1;
            let status = if finds == 1 {
                BookingStatus::Waiting
            } else {
                BookingStatus::Approved
            };
            Ok(Some(booking(status)))
        });
        bookings
            .expect_compare_and_set_status()
            .with(eq(5), eq(BookingStatus::Waiting), eq(BookingStatus::Approved))
            .times(1)
            .returning(|_, _, _| Ok(None));
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut items = MockItemDirectory::new();
        items.expect_find().returning(|_| Ok(Some(item())));

        let err = service(bookings, users, items)
            .approve_booking(1, 5, true)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::AlreadyApproved(5)));
    }

    #[tokio::test]
    async fn test_list_checks_user_before_state() {
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(false));

        let err = service(MockBookingRepository::new(), users, MockItemDirectory::new())
            .list_by_booker(3, "UNSUPPORTED_STATUS")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UserNotFound(3)));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_state() {
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));

        let err = service(MockBookingRepository::new(), users, MockItemDirectory::new())
            .list_by_owner(1, "UNSUPPORTED_STATUS")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown state: UNSUPPORTED_STATUS");
    }

    #[tokio::test]
    async fn test_owner_listing_is_scoped_to_owned_items() {
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        users
            .expect_find_many()
            .with(eq(vec![2]))
            .returning(|ids| Ok(ids.into_iter().map(user).collect()));
        let mut items = MockItemDirectory::new();
        items
            .expect_list_by_owner()
            .with(eq(1))
            .returning(|_| Ok(vec![item()]));
        items
            .expect_find_many()
            .with(eq(vec![10]))
            .returning(|_| Ok(vec![item()]));
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_list()
            .withf(|selector, query| {
                *selector == BookingSelector::Items(vec![10]) && query.status.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(vec![booking(BookingStatus::Waiting)]));

        let views = service(bookings, users, items)
            .list_by_owner(1, "ALL")
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].booker.id, 2);
    }
}
