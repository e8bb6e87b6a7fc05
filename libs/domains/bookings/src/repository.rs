use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::directory::{Table, UserDirectory};
use crate::error::{BookingError, BookingResult};
use crate::filter::{BookingQuery, BookingSelector, order_by_start_desc};
use crate::interval::ensure_no_overlap;
use crate::models::{AuthoredComment, Booking, BookingStatus, Comment, NewBooking, NewComment};
use crate::state::INITIAL_STATUS;

/// Repository trait for Booking persistence
///
/// Writes are atomic with respect to the checks they carry: the overlap test
/// of [`insert_if_available`](BookingRepository::insert_if_available) and the
/// status guard of [`compare_and_set_status`](BookingRepository::compare_and_set_status)
/// run in the same unit as the write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Stores a new `WAITING` booking unless it overlaps a blocking booking
    /// of the same item, in which case [`BookingError::Overlap`] is returned.
    async fn insert_if_available(&self, booking: NewBooking) -> BookingResult<Booking>;

    async fn find(&self, id: i64) -> BookingResult<Option<Booking>>;

    /// Moves the booking from `expected` to `new`.
    ///
    /// Returns `None` if the stored status is no longer `expected`.
    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> BookingResult<Option<Booking>>;

    /// Bookings of the selector matching the query, ordered by start descending.
    async fn list(
        &self,
        selector: BookingSelector,
        query: BookingQuery,
    ) -> BookingResult<Vec<Booking>>;

    /// Approved bookings of the items with `start <= now`.
    async fn find_approved_started(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>>;

    /// Approved bookings of the items with `start > now`.
    async fn find_approved_upcoming(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>>;

    /// Whether the user has an approved booking of the item with `end < now`.
    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> BookingResult<bool>;
}

/// Repository trait for Comment persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: NewComment) -> BookingResult<AuthoredComment>;

    /// Comments of all given items, newest first.
    async fn find_by_items(&self, item_ids: Vec<i64>) -> BookingResult<Vec<AuthoredComment>>;
}

/// In-memory implementation of BookingRepository (for development/testing)
///
/// The write lock is held across check and write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<Table<Booking>>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn approved_where(
        &self,
        item_ids: &[i64],
        keep: impl Fn(&Booking) -> bool,
    ) -> Vec<Booking> {
        let bookings = self.bookings.read().await;
        bookings
            .rows
            .values()
            .filter(|b| {
                b.status == BookingStatus::Approved && item_ids.contains(&b.item_id) && keep(b)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_if_available(&self, booking: NewBooking) -> BookingResult<Booking> {
        let mut bookings = self.bookings.write().await;

        let same_item: Vec<Booking> = bookings
            .rows
            .values()
            .filter(|b| b.item_id == booking.item_id)
            .cloned()
            .collect();
        ensure_no_overlap(&booking, &same_item)?;

        let stored = Booking {
            id: bookings.next_id(),
            start: booking.start,
            end: booking.end,
            item_id: booking.item_id,
            booker_id: booking.booker_id,
            status: INITIAL_STATUS,
        };
        bookings.rows.insert(stored.id, stored.clone());

        tracing::info!(booking_id = stored.id, item_id = stored.item_id, "Created booking");
        Ok(stored)
    }

    async fn find(&self, id: i64) -> BookingResult<Option<Booking>> {
        Ok(self.bookings.read().await.rows.get(&id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> BookingResult<Option<Booking>> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .rows
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound(id))?;

        if booking.status != expected {
            return Ok(None);
        }
        booking.status = new;

        tracing::info!(booking_id = id, status = %new, "Updated booking status");
        Ok(Some(booking.clone()))
    }

    async fn list(
        &self,
        selector: BookingSelector,
        query: BookingQuery,
    ) -> BookingResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut result: Vec<Booking> = bookings
            .rows
            .values()
            .filter(|b| selector.contains(b) && query.matches(b))
            .cloned()
            .collect();

        order_by_start_desc(&mut result);
        Ok(result)
    }

    async fn find_approved_started(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>> {
        Ok(self.approved_where(&item_ids, |b| b.start <= now).await)
    }

    async fn find_approved_upcoming(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>> {
        Ok(self.approved_where(&item_ids, |b| b.start > now).await)
    }

    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> BookingResult<bool> {
        let bookings = self.bookings.read().await;
        Ok(bookings.rows.values().any(|b| {
            b.booker_id == booker_id
                && b.item_id == item_id
                && b.status == BookingStatus::Approved
                && b.end < now
        }))
    }
}

/// In-memory implementation of CommentRepository (for development/testing)
///
/// Author names are resolved through the user directory, one batch per call.
#[derive(Clone)]
pub struct InMemoryCommentRepository {
    comments: Arc<RwLock<Table<Comment>>>,
    users: Arc<dyn UserDirectory>,
}

impl InMemoryCommentRepository {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self {
            comments: Arc::new(RwLock::new(Table::default())),
            users,
        }
    }

    async fn author_names(&self, comments: &[Comment]) -> BookingResult<HashMap<i64, String>> {
        let mut ids: Vec<i64> = comments.iter().map(|c| c.author_id).collect();
        ids.sort_unstable();
        ids.dedup();

        Ok(self
            .users
            .find_many(ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn insert(&self, comment: NewComment) -> BookingResult<AuthoredComment> {
        let author = self
            .users
            .find(comment.author_id)
            .await?
            .ok_or(BookingError::UserNotFound(comment.author_id))?;

        let mut comments = self.comments.write().await;
        let stored = Comment {
            id: comments.next_id(),
            text: comment.text,
            item_id: comment.item_id,
            author_id: comment.author_id,
            created: comment.created,
        };
        comments.rows.insert(stored.id, stored.clone());

        tracing::info!(comment_id = stored.id, item_id = stored.item_id, "Created comment");
        Ok(AuthoredComment {
            comment: stored,
            author_name: author.name,
        })
    }

    async fn find_by_items(&self, item_ids: Vec<i64>) -> BookingResult<Vec<AuthoredComment>> {
        let mut found: Vec<Comment> = {
            let comments = self.comments.read().await;
            comments
                .rows
                .values()
                .filter(|c| item_ids.contains(&c.item_id))
                .cloned()
                .collect()
        };
        found.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));

        let names = self.author_names(&found).await?;
        Ok(found
            .into_iter()
            .filter_map(|comment| match names.get(&comment.author_id) {
                Some(name) => Some(AuthoredComment {
                    author_name: name.clone(),
                    comment,
                }),
                None => {
                    tracing::warn!(
                        comment_id = comment.id,
                        author_id = comment.author_id,
                        "Skipping comment without a known author"
                    );
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::models::{BookingState, User};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn new_booking(item_id: i64, booker_id: i64, start_h: i64, end_h: i64) -> NewBooking {
        NewBooking {
            item_id,
            booker_id,
            start: now() + Duration::hours(start_h),
            end: now() + Duration::hours(end_h),
        }
    }

    #[tokio::test]
    async fn test_insert_starts_waiting_and_blocks_overlap() {
        let repo = InMemoryBookingRepository::new();

        let first = repo.insert_if_available(new_booking(1, 2, 1, 3)).await.unwrap();
        assert_eq!(first.status, BookingStatus::Waiting);

        let clash = repo.insert_if_available(new_booking(1, 3, 2, 4)).await;
        assert!(matches!(clash, Err(BookingError::Overlap(1))));

        // Same window on a different item is fine
        assert!(repo.insert_if_available(new_booking(2, 3, 2, 4)).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_booking_frees_the_window() {
        let repo = InMemoryBookingRepository::new();
        let first = repo.insert_if_available(new_booking(1, 2, 1, 3)).await.unwrap();
        repo.compare_and_set_status(first.id, BookingStatus::Waiting, BookingStatus::Rejected)
            .await
            .unwrap();

        assert!(repo.insert_if_available(new_booking(1, 3, 1, 3)).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_inserts_admit_one() {
        let repo = InMemoryBookingRepository::new();

        let handles: Vec<_> = (0..8)
            .map(|booker| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert_if_available(new_booking(1, 10 + booker, 1, 5)).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_compare_and_set_status() {
        let repo = InMemoryBookingRepository::new();
        let booking = repo.insert_if_available(new_booking(1, 2, 1, 3)).await.unwrap();

        let moved = repo
            .compare_and_set_status(booking.id, BookingStatus::Waiting, BookingStatus::Approved)
            .await
            .unwrap();
        assert_eq!(moved.unwrap().status, BookingStatus::Approved);

        let stale = repo
            .compare_and_set_status(booking.id, BookingStatus::Waiting, BookingStatus::Rejected)
            .await
            .unwrap();
        assert!(stale.is_none());

        let missing = repo
            .compare_and_set_status(99, BookingStatus::Waiting, BookingStatus::Approved)
            .await;
        assert!(matches!(missing, Err(BookingError::BookingNotFound(99))));
    }

    #[tokio::test]
    async fn test_list_scopes_and_orders() {
        let repo = InMemoryBookingRepository::new();
        repo.insert_if_available(new_booking(1, 2, 1, 2)).await.unwrap();
        repo.insert_if_available(new_booking(1, 2, 5, 6)).await.unwrap();
        repo.insert_if_available(new_booking(2, 3, 3, 4)).await.unwrap();

        let all = BookingQuery::resolve(BookingState::All, now());

        let by_booker = repo.list(BookingSelector::Booker(2), all).await.unwrap();
        let ids: Vec<i64> = by_booker.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let by_items = repo
            .list(BookingSelector::Items(vec![1, 2]), all)
            .await
            .unwrap();
        let ids: Vec<i64> = by_items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_approved_lookups_split_on_start() {
        let repo = InMemoryBookingRepository::new();
        let upcoming = repo.insert_if_available(new_booking(1, 2, 5, 6)).await.unwrap();
        let waiting = repo.insert_if_available(new_booking(1, 2, 7, 8)).await.unwrap();
        repo.compare_and_set_status(upcoming.id, BookingStatus::Waiting, BookingStatus::Approved)
            .await
            .unwrap();

        let later = now() + Duration::hours(5);
        assert_eq!(
            repo.find_approved_started(vec![1], later).await.unwrap().len(),
            1
        );
        assert!(
            repo.find_approved_upcoming(vec![1], later)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            repo.find_approved_upcoming(vec![1], now()).await.unwrap()[0].id,
            upcoming.id
        );
        assert_ne!(waiting.status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_completed_booking_requires_end_in_the_past() {
        let repo = InMemoryBookingRepository::new();
        let booking = repo.insert_if_available(new_booking(1, 2, 1, 2)).await.unwrap();
        repo.compare_and_set_status(booking.id, BookingStatus::Waiting, BookingStatus::Approved)
            .await
            .unwrap();

        assert!(!repo.has_completed_approved(2, 1, now()).await.unwrap());
        let at_end = now() + Duration::hours(2);
        assert!(!repo.has_completed_approved(2, 1, at_end).await.unwrap());
        let after = at_end + Duration::seconds(1);
        assert!(repo.has_completed_approved(2, 1, after).await.unwrap());
        assert!(!repo.has_completed_approved(3, 1, after).await.unwrap());
    }

    #[tokio::test]
    async fn test_comments_carry_author_names_newest_first() {
        let users = InMemoryUserDirectory::new();
        let author = users.add("Booker", "booker@example.com").await;
        let repo = InMemoryCommentRepository::new(Arc::new(users));

        for (item_id, hours) in [(1, 0), (1, 1), (2, 2)] {
            repo.insert(NewComment {
                text: format!("note {}", hours),
                item_id,
                author_id: author.id,
                created: now() + Duration::hours(hours),
            })
            .await
            .unwrap();
        }

        let found = repo.find_by_items(vec![1]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].comment.text, "note 1");
        assert_eq!(found[0].author_name, "Booker");
    }

    #[tokio::test]
    async fn test_comment_by_unknown_author_is_rejected() {
        let repo = InMemoryCommentRepository::new(Arc::new(InMemoryUserDirectory::new()));
        let result = repo
            .insert(NewComment {
                text: "hi".into(),
                item_id: 1,
                author_id: 5,
                created: now(),
            })
            .await;
        assert!(matches!(result, Err(BookingError::UserNotFound(5))));
    }

    #[tokio::test]
    async fn test_comments_of_vanished_authors_are_skipped() {
        let mut users = crate::directory::MockUserDirectory::new();
        users.expect_find().returning(|id| {
            Ok(Some(User {
                id,
                name: format!("user{}", id),
                email: format!("user{}@example.com", id),
            }))
        });
        // Only author 1 is still known when the comments are read back
        users.expect_find_many().returning(|_| {
            Ok(vec![User {
                id: 1,
                name: "user1".into(),
                email: "user1@example.com".into(),
            }])
        });
        let repo = InMemoryCommentRepository::new(Arc::new(users));

        for author_id in [1, 2] {
            repo.insert(NewComment {
                text: format!("by {}", author_id),
                item_id: 4,
                author_id,
                created: now(),
            })
            .await
            .unwrap();
        }

        let found = repo.find_by_items(vec![4]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].comment.author_id, 1);
        assert_eq!(found[0].author_name, "user1");
    }
}
