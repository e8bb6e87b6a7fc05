use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};

use crate::{
    directory::{ItemDirectory, UserDirectory},
    entity::{booking, comment, item, user},
    error::{BookingError, BookingResult},
    filter::{BookingQuery, BookingSelector, TimeWindow},
    interval::ensure_no_overlap,
    models::{
        AuthoredComment, Booking, BookingStatus, CreateItem, Item, NewBooking, NewComment,
        UpdateItem, User,
    },
    repository::{BookingRepository, CommentRepository},
};

pub struct PgUserDirectory {
    db: DatabaseConnection,
}

impl PgUserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, id: i64) -> BookingResult<bool> {
        let count = user::Entity::find_by_id(id).count(&self.db).await?;
        Ok(count > 0)
    }

    async fn find(&self, id: i64) -> BookingResult<Option<User>> {
        let model = user::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

pub struct PgItemDirectory {
    db: DatabaseConnection,
}

impl PgItemDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// `%text%` with LIKE wildcards in `text` escaped.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl ItemDirectory for PgItemDirectory {
    async fn find(&self, id: i64) -> BookingResult<Option<Item>> {
        let model = item::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn find_many(&self, ids: Vec<i64>) -> BookingResult<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = item::Entity::find()
            .filter(item::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_by_owner(&self, owner_id: i64) -> BookingResult<Vec<Item>> {
        let models = item::Entity::find()
            .filter(item::Column::OwnerId.eq(owner_id))
            .order_by_asc(item::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn search(&self, text: String) -> BookingResult<Vec<Item>> {
        use sea_orm::sea_query::extension::postgres::PgExpr;

        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = like_pattern(text);
        let models = item::Entity::find()
            .filter(item::Column::Available.eq(true))
            .filter(
                Condition::any()
                    .add(Expr::col((item::Entity, item::Column::Name)).ilike(pattern.clone()))
                    .add(Expr::col((item::Entity, item::Column::Description)).ilike(pattern)),
            )
            .order_by_asc(item::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create(&self, owner_id: i64, input: CreateItem) -> BookingResult<Item> {
        let model = item::ActiveModel::for_owner(owner_id, input)
            .insert(&self.db)
            .await?;

        tracing::info!(item_id = model.id, owner_id, "Created item");
        Ok(model.into())
    }

    async fn update(&self, id: i64, input: UpdateItem) -> BookingResult<Item> {
        let model = item::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(BookingError::ItemNotFound(id))?;

        let mut active: item::ActiveModel = model.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(available) = input.available {
            active.available = Set(available);
        }
        let updated = active.update(&self.db).await?;

        tracing::info!(item_id = id, "Updated item");
        Ok(updated.into())
    }
}

pub struct PgBookingRepository {
    db: DatabaseConnection,
}

impl PgBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn apply_query(select: Select<booking::Entity>, query: &BookingQuery) -> Select<booking::Entity> {
    let now = query.now;
    let select = match query.window {
        None => select,
        Some(TimeWindow::Current) => select
            .filter(booking::Column::StartTime.lte(now))
            .filter(booking::Column::EndTime.gt(now)),
        Some(TimeWindow::Past) => select.filter(booking::Column::EndTime.lt(now)),
        Some(TimeWindow::Future) => select.filter(booking::Column::StartTime.gt(now)),
    };
    match query.status {
        Some(status) => select.filter(booking::Column::Status.eq(status)),
        None => select,
    }
}

fn approved_of(item_ids: Vec<i64>) -> Select<booking::Entity> {
    booking::Entity::find()
        .filter(booking::Column::ItemId.is_in(item_ids))
        .filter(booking::Column::Status.eq(BookingStatus::Approved))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert_if_available(&self, candidate: NewBooking) -> BookingResult<Booking> {
        let txn = self.db.begin().await?;

        // Creations for one item queue up behind this row lock.
        item::Entity::find_by_id(candidate.item_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(BookingError::ItemNotFound(candidate.item_id))?;

        let existing: Vec<Booking> = booking::Entity::find()
            .filter(booking::Column::ItemId.eq(candidate.item_id))
            .filter(
                Condition::any()
                    .add(booking::Column::Status.eq(BookingStatus::Waiting))
                    .add(booking::Column::Status.eq(BookingStatus::Approved)),
            )
            .filter(booking::Column::StartTime.lt(candidate.end))
            .filter(booking::Column::EndTime.gt(candidate.start))
            .all(&txn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        // Dropping the transaction on error rolls it back.
        ensure_no_overlap(&candidate, &existing)?;

        let model = booking::ActiveModel::from(candidate).insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(booking_id = model.id, item_id = model.item_id, "Created booking");
        Ok(model.into())
    }

    async fn find(&self, id: i64) -> BookingResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: BookingStatus,
        new: BookingStatus,
    ) -> BookingResult<Option<Booking>> {
        let txn = self.db.begin().await?;

        let model = booking::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(BookingError::BookingNotFound(id))?;

        if model.status != expected {
            return Ok(None);
        }

        let mut active: booking::ActiveModel = model.into();
        active.status = Set(new);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(booking_id = id, status = %new, "Updated booking status");
        Ok(Some(updated.into()))
    }

    async fn list(
        &self,
        selector: BookingSelector,
        query: BookingQuery,
    ) -> BookingResult<Vec<Booking>> {
        let select = match selector {
            BookingSelector::Booker(booker_id) => {
                booking::Entity::find().filter(booking::Column::BookerId.eq(booker_id))
            }
            BookingSelector::Items(item_ids) => {
                if item_ids.is_empty() {
                    return Ok(Vec::new());
                }
                booking::Entity::find().filter(booking::Column::ItemId.is_in(item_ids))
            }
        };

        let models = apply_query(select, &query)
            .order_by_desc(booking::Column::StartTime)
            .order_by_desc(booking::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_approved_started(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = approved_of(item_ids)
            .filter(booking::Column::StartTime.lte(now))
            .order_by_desc(booking::Column::EndTime)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_approved_upcoming(
        &self,
        item_ids: Vec<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<Vec<Booking>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = approved_of(item_ids)
            .filter(booking::Column::StartTime.gt(now))
            .order_by_asc(booking::Column::EndTime)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn has_completed_approved(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> BookingResult<bool> {
        let count = booking::Entity::find()
            .filter(booking::Column::BookerId.eq(booker_id))
            .filter(booking::Column::ItemId.eq(item_id))
            .filter(booking::Column::Status.eq(BookingStatus::Approved))
            .filter(booking::Column::EndTime.lt(now))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

pub struct PgCommentRepository {
    db: DatabaseConnection,
}

impl PgCommentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn insert(&self, comment: NewComment) -> BookingResult<AuthoredComment> {
        let author = user::Entity::find_by_id(comment.author_id)
            .one(&self.db)
            .await?
            .ok_or(BookingError::UserNotFound(comment.author_id))?;

        let model = comment::ActiveModel::from(comment).insert(&self.db).await?;

        tracing::info!(comment_id = model.id, item_id = model.item_id, "Created comment");
        Ok(AuthoredComment {
            comment: model.into(),
            author_name: author.name,
        })
    }

    async fn find_by_items(&self, item_ids: Vec<i64>) -> BookingResult<Vec<AuthoredComment>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = comment::Entity::find()
            .filter(comment::Column::ItemId.is_in(item_ids))
            .find_also_related(user::Entity)
            .order_by_desc(comment::Column::CreatedTime)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(comment, author)| match author {
                Some(author) => Some(AuthoredComment {
                    author_name: author.name,
                    comment: comment.into(),
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
