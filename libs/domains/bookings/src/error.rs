use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::models::BookingStatus;

/// Coarse classification of a [`BookingError`], mapped 1:1 onto HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Forbidden,
    Internal,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking with id = {0} not found")]
    BookingNotFound(i64),

    #[error("User with id = {0} not found")]
    UserNotFound(i64),

    #[error("Item with id = {0} not found")]
    ItemNotFound(i64),

    /// Owners may not book their own items.
    #[error("Item is booked")]
    OwnItem(i64),

    /// The booking exists but the caller may not see or decide it.
    #[error("Booking with id = {booking_id} not found for user {user_id}")]
    NotVisible { booking_id: i64, user_id: i64 },

    #[error("Invalid booking window: {0}")]
    InvalidWindow(String),

    #[error("Item with id = {0} is unavailable for booking")]
    ItemUnavailable(i64),

    #[error("Item with id = {0} is already booked for the requested time")]
    Overlap(i64),

    #[error("Incorrect user id: {0}")]
    UnknownActor(i64),

    #[error("Booking with id = {0} is already approved")]
    AlreadyApproved(i64),

    #[error("Booking with id = {id} is already decided: {status}")]
    AlreadyDecided { id: i64, status: BookingStatus },

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("User {user_id} does not own item {item_id}")]
    NotOwner { user_id: i64, item_id: i64 },

    #[error("User {user_id} has no completed booking of item {item_id}")]
    CommentNotAllowed { user_id: i64, item_id: i64 },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::BookingNotFound(_)
            | BookingError::UserNotFound(_)
            | BookingError::ItemNotFound(_)
            | BookingError::NotVisible { .. } => ErrorKind::NotFound,
            BookingError::OwnItem(_)
            | BookingError::InvalidWindow(_)
            | BookingError::ItemUnavailable(_)
            | BookingError::Overlap(_)
            | BookingError::UnknownActor(_)
            | BookingError::AlreadyDecided { .. }
            | BookingError::UnknownState(_)
            | BookingError::CommentNotAllowed { .. }
            | BookingError::Validation(_) => ErrorKind::BadRequest,
            BookingError::AlreadyApproved(_) => ErrorKind::Conflict,
            BookingError::NotOwner { .. } => ErrorKind::Forbidden,
            BookingError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<sea_orm::DbErr> for BookingError {
    fn from(err: sea_orm::DbErr) -> Self {
        BookingError::Internal(format!("Database error: {}", err))
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::BadRequest => AppError::BadRequest(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::Forbidden => AppError::Forbidden(message),
            ErrorKind::Internal => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_own_item_is_bad_request() {
        let err = BookingError::OwnItem(3);
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "Item is booked");
    }

    #[test]
    fn test_unknown_state_message() {
        let err = BookingError::UnknownState("UNSUPPORTED_STATUS".into());
        assert_eq!(err.to_string(), "Unknown state: UNSUPPORTED_STATUS");
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_http_status_mapping() {
        let cases = [
            (BookingError::BookingNotFound(1), StatusCode::NOT_FOUND),
            (BookingError::Overlap(1), StatusCode::BAD_REQUEST),
            (BookingError::OwnItem(1), StatusCode::BAD_REQUEST),
            (BookingError::AlreadyApproved(1), StatusCode::CONFLICT),
            (
                BookingError::NotOwner { user_id: 1, item_id: 2 },
                StatusCode::FORBIDDEN,
            ),
            (
                BookingError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
