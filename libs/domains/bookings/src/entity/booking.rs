use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::models::{Booking, BookingStatus, NewBooking};
use crate::state::INITIAL_STATUS;

/// Sea-ORM Entity for Bookings table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub start_time: DateTimeWithTimeZone,
    pub end_time: DateTimeWithTimeZone,
    pub item_id: i64,
    pub booker_id: i64,
    pub status: BookingStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BookerId",
        to = "super::user::Column::Id"
    )]
    Booker,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Booking {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            start: model.start_time.into(),
            end: model.end_time.into(),
            item_id: model.item_id,
            booker_id: model.booker_id,
            status: model.status,
        }
    }
}

impl From<NewBooking> for ActiveModel {
    fn from(input: NewBooking) -> Self {
        ActiveModel {
            id: NotSet,
            start_time: Set(input.start.into()),
            end_time: Set(input.end.into()),
            item_id: Set(input.item_id),
            booker_id: Set(input.booker_id),
            status: Set(INITIAL_STATUS),
        }
    }
}
