//! Caller identity taken from the `X-Sharer-User-Id` request header.

use crate::errors::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the id of the user on whose behalf the request is made.
pub const SHARER_USER_HEADER: &str = "x-sharer-user-id";

/// Id of the calling user.
///
/// The gateway in front of the API has already authenticated the caller, so
/// the header value is trusted as-is. A missing or non-numeric header is
/// rejected with 400.
///
/// ```ignore
/// async fn my_bookings(SharerUserId(user_id): SharerUserId) -> String {
///     format!("bookings of {user_id}")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharerUserId(pub i64);

impl<S> FromRequestParts<S> for SharerUserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(SHARER_USER_HEADER)
            .ok_or_else(|| {
                AppError::MissingUserHeader("X-Sharer-User-Id header is required".to_string())
            })?;

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(SharerUserId)
            .ok_or_else(|| {
                AppError::MissingUserHeader(format!(
                    "X-Sharer-User-Id must be an integer, got {:?}",
                    value
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<SharerUserId, AppError> {
        let mut builder = Request::builder().uri("/bookings");
        if let Some(value) = header {
            builder = builder.header("X-Sharer-User-Id", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        SharerUserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_numeric_id() {
        assert_eq!(extract(Some("42")).await.unwrap(), SharerUserId(42));
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let err = extract(None).await.unwrap_err();
        assert!(matches!(err, AppError::MissingUserHeader(_)));
    }

    #[tokio::test]
    async fn test_non_numeric_header_is_rejected() {
        let err = extract(Some("alice")).await.unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }
}
