//! Users and items as seen by the booking engine.
//!
//! The engine only reads these, apart from the item create/update paths
//! exposed to owners.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{BookingError, BookingResult};
use crate::models::{CreateItem, Item, UpdateItem, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, id: i64) -> BookingResult<bool>;

    async fn find(&self, id: i64) -> BookingResult<Option<User>>;

    /// Users with the given ids; unknown ids are skipped.
    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<User>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemDirectory: Send + Sync {
    async fn find(&self, id: i64) -> BookingResult<Option<Item>>;

    /// Items with the given ids; unknown ids are skipped.
    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<Item>>;

    /// All items of an owner, ordered by id ascending.
    async fn list_by_owner(&self, owner_id: i64) -> BookingResult<Vec<Item>>;

    /// Available items whose name or description contains `text`, ignoring case.
    async fn search(&self, text: String) -> BookingResult<Vec<Item>>;

    async fn create(&self, owner_id: i64, input: CreateItem) -> BookingResult<Item>;

    async fn update(&self, id: i64, input: UpdateItem) -> BookingResult<Item>;
}

#[derive(Debug)]
pub(crate) struct Table<T> {
    pub(crate) rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    pub(crate) fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory implementation of UserDirectory (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<Table<User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns it with its assigned id.
    pub async fn add(&self, name: &str, email: &str) -> User {
        let mut users = self.users.write().await;
        let user = User {
            id: users.next_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        users.rows.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, "Registered user");
        user
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, id: i64) -> BookingResult<bool> {
        Ok(self.users.read().await.rows.contains_key(&id))
    }

    async fn find(&self, id: i64) -> BookingResult<Option<User>> {
        Ok(self.users.read().await.rows.get(&id).cloned())
    }

    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.rows.get(id).cloned())
            .collect())
    }
}

/// In-memory implementation of ItemDirectory (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryItemDirectory {
    items: Arc<RwLock<Table<Item>>>,
}

impl InMemoryItemDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemDirectory for InMemoryItemDirectory {
    async fn find(&self, id: i64) -> BookingResult<Option<Item>> {
        Ok(self.items.read().await.rows.get(&id).cloned())
    }

    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| items.rows.get(id).cloned())
            .collect())
    }

    async fn list_by_owner(&self, owner_id: i64) -> BookingResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .rows
            .values()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn search(&self, text: String) -> BookingResult<Vec<Item>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let items = self.items.read().await;
        Ok(items
            .rows
            .values()
            .filter(|item| {
                item.available
                    && (item.name.to_lowercase().contains(&needle)
                        || item.description.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, owner_id: i64, input: CreateItem) -> BookingResult<Item> {
        let mut items = self.items.write().await;
        let item = Item {
            id: items.next_id(),
            name: input.name,
            description: input.description,
            available: input.available,
            owner_id,
            request_id: input.request_id,
        };
        items.rows.insert(item.id, item.clone());

        tracing::info!(item_id = item.id, owner_id, "Created item");
        Ok(item)
    }

    async fn update(&self, id: i64, input: UpdateItem) -> BookingResult<Item> {
        let mut items = self.items.write().await;
        let item = items
            .rows
            .get_mut(&id)
            .ok_or(BookingError::ItemNotFound(id))?;
        item.apply_update(input);

        tracing::info!(item_id = id, "Updated item");
        Ok(item.clone())
    }
}
