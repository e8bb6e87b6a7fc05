use axum::Router;
use domain_bookings::{
    BookingService, PgBookingRepository, PgItemDirectory, PgUserDirectory, SystemClock,
    bookings_router,
};
use std::sync::Arc;

pub fn router(state: &crate::state::AppState) -> Router {
    let service = BookingService::new(
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgUserDirectory::new(state.db.clone())),
        Arc::new(PgItemDirectory::new(state.db.clone())),
        Arc::new(SystemClock),
    );
    bookings_router(service)
}
