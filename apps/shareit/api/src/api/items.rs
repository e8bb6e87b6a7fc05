use axum::Router;
use domain_bookings::{
    BookingRepository, Clock, CommentRepository, CommentService, ItemAggregator, ItemDirectory,
    ItemService, PgBookingRepository, PgCommentRepository, PgItemDirectory, PgUserDirectory,
    SystemClock, UserDirectory, items_router,
};
use std::sync::Arc;

/// Items and comments share one set of repositories.
pub fn router(state: &crate::state::AppState) -> Router {
    let bookings: Arc<dyn BookingRepository> =
        Arc::new(PgBookingRepository::new(state.db.clone()));
    let comments: Arc<dyn CommentRepository> =
        Arc::new(PgCommentRepository::new(state.db.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(state.db.clone()));
    let items: Arc<dyn ItemDirectory> = Arc::new(PgItemDirectory::new(state.db.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let aggregator = ItemAggregator::new(bookings.clone(), comments.clone(), clock.clone());
    let item_service = ItemService::new(items.clone(), users.clone(), aggregator);
    let comment_service = CommentService::new(bookings, comments, users, items, clock);

    items_router(item_service, comment_service)
}
