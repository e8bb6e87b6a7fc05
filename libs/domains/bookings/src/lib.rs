//! Bookings Domain
//!
//! Booking lifecycle, availability checks, decorated item views and comment
//! eligibility for the ShareIt item-sharing service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Handlers (bookings_router / items_router)    │
//! └──────┬───────────────────────────────────────┘
//!        │
//! ┌──────▼──────────────────────────────────────────────┐
//! │ BookingService · ItemService · CommentService       │  ← orchestration
//! │                  └─ ItemAggregator                  │  ← batched item views
//! └──────┬──────────────────────────────────────────────┘
//!        │  interval · state · filter · access            ← pure rules
//! ┌──────▼──────────────────────────────────────────────┐
//! │ BookingRepository · CommentRepository               │
//! │ UserDirectory · ItemDirectory · Clock               │  ← traits + InMemory / Pg
//! └──────┬──────────────────────────────────────────────┘
//! ┌──────▼──────┐
//! │   Models    │
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_bookings::{
//!     BookingService, PgBookingRepository, PgItemDirectory, PgUserDirectory, SystemClock,
//! };
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//!
//! let service = BookingService::new(
//!     Arc::new(PgBookingRepository::new(db.clone())),
//!     Arc::new(PgUserDirectory::new(db.clone())),
//!     Arc::new(PgItemDirectory::new(db)),
//!     Arc::new(SystemClock),
//! );
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod aggregation;
pub mod clock;
pub mod comments;
pub mod directory;
pub mod entity;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod interval;
pub mod items;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod state;

// Re-export commonly used types
pub use aggregation::{ItemAggregator, ItemIndex};
pub use clock::{Clock, FixedClock, SystemClock};
pub use comments::CommentService;
pub use directory::{InMemoryItemDirectory, InMemoryUserDirectory, ItemDirectory, UserDirectory};
pub use error::{BookingError, BookingResult, ErrorKind};
pub use filter::{BookingQuery, BookingScope, BookingSelector, TimeWindow};
pub use handlers::{BookingsApiDoc, ItemsApiDoc, bookings_router, items_router};
pub use items::ItemService;
pub use models::{
    Booking, BookingShort, BookingState, BookingStatus, BookingView, CommentView, CreateBooking,
    CreateComment, CreateItem, Item, ItemView, UpdateItem, User,
};
pub use postgres::{PgBookingRepository, PgCommentRepository, PgItemDirectory, PgUserDirectory};
pub use repository::{
    BookingRepository, CommentRepository, InMemoryBookingRepository, InMemoryCommentRepository,
};
pub use service::BookingService;
pub use state::Decision;
