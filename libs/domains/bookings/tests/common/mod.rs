//! Wiring of the in-memory stores shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use domain_bookings::*;
use std::sync::Arc;

/// 2026-01-01T00:00:00Z
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

pub struct Fixture {
    pub users: InMemoryUserDirectory,
    pub items: Arc<InMemoryItemDirectory>,
    pub clock: Arc<FixedClock>,
    pub bookings: BookingService,
    pub item_service: ItemService,
    pub comments: CommentService,
}

impl Fixture {
    pub fn new() -> Self {
        let users = InMemoryUserDirectory::new();
        let items = Arc::new(InMemoryItemDirectory::new());
        let clock = Arc::new(FixedClock::new(t0()));

        let user_dir: Arc<dyn UserDirectory> = Arc::new(users.clone());
        let item_dir: Arc<dyn ItemDirectory> = items.clone();
        let booking_repo: Arc<dyn BookingRepository> = Arc::new(InMemoryBookingRepository::new());
        let comment_repo: Arc<dyn CommentRepository> =
            Arc::new(InMemoryCommentRepository::new(user_dir.clone()));
        let shared_clock: Arc<dyn Clock> = clock.clone();

        let aggregator =
            ItemAggregator::new(booking_repo.clone(), comment_repo.clone(), shared_clock.clone());

        Self {
            bookings: BookingService::new(
                booking_repo.clone(),
                user_dir.clone(),
                item_dir.clone(),
                shared_clock.clone(),
            ),
            item_service: ItemService::new(item_dir.clone(), user_dir.clone(), aggregator),
            comments: CommentService::new(
                booking_repo,
                comment_repo,
                user_dir,
                item_dir,
                shared_clock,
            ),
            users,
            items,
            clock,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        self.users
            .add(name, &format!("{}@example.com", name.to_lowercase()))
            .await
    }

    pub async fn item(&self, owner: &User, name: &str) -> Item {
        self.items
            .create(
                owner.id,
                CreateItem {
                    name: name.to_string(),
                    description: format!("{} for rent", name),
                    available: true,
                    request_id: None,
                },
            )
            .await
            .unwrap()
    }

    /// Books `item` for `[now + start, now + end)`.
    pub async fn book(
        &self,
        booker: &User,
        item: &Item,
        start: Duration,
        end: Duration,
    ) -> BookingResult<BookingView> {
        let now = self.clock.now();
        self.bookings
            .create_booking(
                booker.id,
                CreateBooking {
                    item_id: item.id,
                    start: now + start,
                    end: now + end,
                },
            )
            .await
    }
}
