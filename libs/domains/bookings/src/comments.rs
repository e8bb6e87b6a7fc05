use chrono::{DateTime, Utc};
use std::sync::Arc;
use validator::Validate;

use crate::clock::Clock;
use crate::directory::{ItemDirectory, UserDirectory};
use crate::error::{BookingError, BookingResult};
use crate::models::{CommentView, CreateComment, NewComment};
use crate::repository::{BookingRepository, CommentRepository};

/// Lets users comment on items they have finished renting.
#[derive(Clone)]
pub struct CommentService {
    bookings: Arc<dyn BookingRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserDirectory>,
    items: Arc<dyn ItemDirectory>,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserDirectory>,
        items: Arc<dyn ItemDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            comments,
            users,
            items,
            clock,
        }
    }

    /// True iff the user has an approved booking of the item that ended before `now`.
    pub async fn can_comment(
        &self,
        user_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> BookingResult<bool> {
        self.bookings
            .has_completed_approved(user_id, item_id, now)
            .await
    }

    pub async fn create_comment(
        &self,
        user_id: i64,
        item_id: i64,
        input: CreateComment,
    ) -> BookingResult<CommentView> {
        input
            .validate()
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        if input.text.trim().is_empty() {
            return Err(BookingError::Validation("comment text is blank".to_string()));
        }

        // Eligibility decides first; unknown users and items have no bookings.
        let now = self.clock.now();
        if !self.can_comment(user_id, item_id, now).await? {
            return Err(BookingError::CommentNotAllowed { user_id, item_id });
        }

        if !self.users.exists(user_id).await? {
            return Err(BookingError::UserNotFound(user_id));
        }
        if self.items.find(item_id).await?.is_none() {
            return Err(BookingError::ItemNotFound(item_id));
        }

        let stored = self
            .comments
            .insert(NewComment {
                text: input.text,
                item_id,
                author_id: user_id,
                created: now,
            })
            .await?;
        Ok(stored.to_view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::{MockItemDirectory, MockUserDirectory};
    use crate::models::{AuthoredComment, Comment, Item};
    use crate::repository::{MockBookingRepository, MockCommentRepository};
    use mockall::predicate::eq;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn item() -> Item {
        Item {
            id: 3,
            name: "Bike".into(),
            description: "City bike".into(),
            available: true,
            owner_id: 1,
            request_id: None,
        }
    }

    fn known_user_and_item() -> (MockUserDirectory, MockItemDirectory) {
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut items = MockItemDirectory::new();
        items.expect_find().returning(|_| Ok(Some(item())));
        (users, items)
    }

    #[tokio::test]
    async fn test_comment_without_completed_booking_is_rejected() {
        let (users, items) = known_user_and_item();
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_has_completed_approved()
            .with(eq(2), eq(3), eq(now()))
            .returning(|_, _, _| Ok(false));

        let service = CommentService::new(
            Arc::new(bookings),
            Arc::new(MockCommentRepository::new()),
            Arc::new(users),
            Arc::new(items),
            Arc::new(FixedClock::new(now())),
        );

        let err = service
            .create_comment(2, 3, CreateComment { text: "Nice".into() })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::CommentNotAllowed {
                user_id: 2,
                item_id: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_comment_is_stamped_with_clock_time() {
        let (users, items) = known_user_and_item();
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_has_completed_approved()
            .returning(|_, _, _| Ok(true));
        let mut comments = MockCommentRepository::new();
        comments
            .expect_insert()
            .withf(|c| c.created == now() && c.author_id == 2 && c.item_id == 3)
            .times(1)
            .returning(|c| {
                Ok(AuthoredComment {
                    comment: Comment {
                        id: 1,
                        text: c.text,
                        item_id: c.item_id,
                        author_id: c.author_id,
                        created: c.created,
                    },
                    author_name: "Booker".into(),
                })
            });

        let service = CommentService::new(
            Arc::new(bookings),
            Arc::new(comments),
            Arc::new(users),
            Arc::new(items),
            Arc::new(FixedClock::new(now())),
        );

        let view = service
            .create_comment(2, 3, CreateComment { text: "Nice".into() })
            .await
            .unwrap();
        assert_eq!(view.created, now());
        assert_eq!(view.author_name, "Booker");
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected() {
        let service = CommentService::new(
            Arc::new(MockBookingRepository::new()),
            Arc::new(MockCommentRepository::new()),
            Arc::new(MockUserDirectory::new()),
            Arc::new(MockItemDirectory::new()),
            Arc::new(FixedClock::new(now())),
        );

        let err = service
            .create_comment(2, 3, CreateComment { text: "   ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_without_booking_is_bad_request() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_has_completed_approved()
            .with(eq(999), eq(3), eq(now()))
            .returning(|_, _, _| Ok(false));

        // Neither directory is consulted once eligibility fails
        let service = CommentService::new(
            Arc::new(bookings),
            Arc::new(MockCommentRepository::new()),
            Arc::new(MockUserDirectory::new()),
            Arc::new(MockItemDirectory::new()),
            Arc::new(FixedClock::new(now())),
        );

        let err = service
            .create_comment(999, 3, CreateComment { text: "Nice".into() })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::CommentNotAllowed {
                user_id: 999,
                item_id: 3
            }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_comment_on_missing_item() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_has_completed_approved()
            .returning(|_, _, _| Ok(true));
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut items = MockItemDirectory::new();
        items.expect_find().returning(|_| Ok(None));

        let service = CommentService::new(
            Arc::new(bookings),
            Arc::new(MockCommentRepository::new()),
            Arc::new(users),
            Arc::new(items),
            Arc::new(FixedClock::new(now())),
        );

        let err = service
            .create_comment(2, 99, CreateComment { text: "Nice".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ItemNotFound(99)));
    }
}
