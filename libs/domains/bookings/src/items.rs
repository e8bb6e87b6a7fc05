use std::sync::Arc;
use validator::Validate;

use crate::aggregation::ItemAggregator;
use crate::directory::{ItemDirectory, UserDirectory};
use crate::error::{BookingError, BookingResult};
use crate::models::{CreateItem, ItemView, UpdateItem};

/// Owner-facing item operations and decorated item reads.
#[derive(Clone)]
pub struct ItemService {
    items: Arc<dyn ItemDirectory>,
    users: Arc<dyn UserDirectory>,
    aggregator: ItemAggregator,
}

fn ensure_not_blank(field: &str, value: Option<&str>) -> BookingResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(BookingError::Validation(format!("{} must not be blank", field)))
        }
        _ => Ok(()),
    }
}

impl ItemService {
    pub fn new(
        items: Arc<dyn ItemDirectory>,
        users: Arc<dyn UserDirectory>,
        aggregator: ItemAggregator,
    ) -> Self {
        Self {
            items,
            users,
            aggregator,
        }
    }

    async fn ensure_user(&self, user_id: i64) -> BookingResult<()> {
        if self.users.exists(user_id).await? {
            Ok(())
        } else {
            Err(BookingError::UserNotFound(user_id))
        }
    }

    pub async fn create_item(&self, owner_id: i64, input: CreateItem) -> BookingResult<ItemView> {
        input
            .validate()
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        ensure_not_blank("name", Some(&input.name))?;
        ensure_not_blank("description", Some(&input.description))?;

        self.ensure_user(owner_id).await?;

        let item = self.items.create(owner_id, input).await?;
        Ok(ItemView::bare(&item))
    }

    /// Partial update; only the owner may change an item.
    pub async fn update_item(
        &self,
        user_id: i64,
        item_id: i64,
        input: UpdateItem,
    ) -> BookingResult<ItemView> {
        input
            .validate()
            .map_err(|e| BookingError::Validation(e.to_string()))?;
        ensure_not_blank("name", input.name.as_deref())?;
        ensure_not_blank("description", input.description.as_deref())?;

        self.ensure_user(user_id).await?;

        let item = self
            .items
            .find(item_id)
            .await?
            .ok_or(BookingError::ItemNotFound(item_id))?;
        if item.owner_id != user_id {
            return Err(BookingError::NotOwner { user_id, item_id });
        }

        let updated = self.items.update(item_id, input).await?;
        Ok(ItemView::bare(&updated))
    }

    /// Item with comments; last/next bookings only for its owner.
    ///
    /// The viewer id only selects the projection and need not be registered.
    pub async fn get_item(&self, user_id: i64, item_id: i64) -> BookingResult<ItemView> {
        let item = self
            .items
            .find(item_id)
            .await?
            .ok_or(BookingError::ItemNotFound(item_id))?;
        self.aggregator.decorate(&item, user_id).await
    }

    /// All items of the owner, ordered by id, decorated in one batch.
    pub async fn list_owner_items(&self, owner_id: i64) -> BookingResult<Vec<ItemView>> {
        self.ensure_user(owner_id).await?;

        let items = self.items.list_by_owner(owner_id).await?;
        self.aggregator.decorate_all(&items, owner_id).await
    }

    pub async fn search_items(&self, text: &str) -> BookingResult<Vec<ItemView>> {
        let items = self.items.search(text.to_string()).await?;
        Ok(items.iter().map(ItemView::bare).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::{MockItemDirectory, MockUserDirectory};
    use crate::models::Item;
    use crate::repository::{MockBookingRepository, MockCommentRepository};
    use chrono::DateTime;
    use mockall::predicate::eq;

    fn item() -> Item {
        Item {
            id: 4,
            name: "Saw".into(),
            description: "Hand saw".into(),
            available: true,
            owner_id: 1,
            request_id: Some(12),
        }
    }

    fn service(items: MockItemDirectory, users: MockUserDirectory) -> ItemService {
        let aggregator = ItemAggregator::new(
            Arc::new(MockBookingRepository::new()),
            Arc::new(MockCommentRepository::new()),
            Arc::new(FixedClock::new(
                DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
            )),
        );
        ItemService::new(Arc::new(items), Arc::new(users), aggregator)
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let mut users = MockUserDirectory::new();
        users.expect_exists().returning(|_| Ok(true));
        let mut items = MockItemDirectory::new();
        items
            .expect_find()
            .with(eq(4))
            .returning(|_| Ok(Some(item())));

        let err = service(items, users)
            .update_item(
                2,
                4,
                UpdateItem {
                    available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::NotOwner {
                user_id: 2,
                item_id: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_name() {
        let err = service(MockItemDirectory::new(), MockUserDirectory::new())
            .update_item(
                1,
                4,
                UpdateItem {
                    name: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_requires_registered_owner() {
        let mut users = MockUserDirectory::new();
        users.expect_exists().with(eq(9)).returning(|_| Ok(false));

        let err = service(MockItemDirectory::new(), users)
            .create_item(
                9,
                CreateItem {
                    name: "Saw".into(),
                    description: "Hand saw".into(),
                    available: true,
                    request_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UserNotFound(9)));
    }

    #[tokio::test]
    async fn test_unregistered_viewer_sees_comments_only() {
        let mut items = MockItemDirectory::new();
        items
            .expect_find()
            .with(eq(4))
            .returning(|_| Ok(Some(item())));
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_by_items()
            .with(eq(vec![4]))
            .returning(|_| Ok(Vec::new()));
        let aggregator = ItemAggregator::new(
            Arc::new(MockBookingRepository::new()),
            Arc::new(comments),
            Arc::new(FixedClock::new(
                DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
            )),
        );
        // No user lookups are expected
        let service = ItemService::new(
            Arc::new(items),
            Arc::new(MockUserDirectory::new()),
            aggregator,
        );

        let view = service.get_item(999, 4).await.unwrap();
        assert_eq!(view.id, 4);
        assert!(view.last_booking.is_none());
        assert!(view.next_booking.is_none());
    }

    #[tokio::test]
    async fn test_search_returns_bare_views() {
        let mut items = MockItemDirectory::new();
        items
            .expect_search()
            .with(eq("saw".to_string()))
            .returning(|_| Ok(vec![item()]));

        let found = service(items, MockUserDirectory::new())
            .search_items("saw")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].request_id, Some(12));
        assert!(found[0].comments.is_empty());
    }
}
