use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    SharerUserId, ValidatedJson,
    errors::responses::{
        BadRequestResponse, BadRequestValidationResponse, ConflictResponse, ForbiddenResponse,
        InternalServerErrorResponse, MissingUserHeaderResponse, NotFoundResponse,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};

use crate::comments::CommentService;
use crate::error::BookingResult;
use crate::items::ItemService;
use crate::models::{
    BookingShort, BookingState, BookingStatus, BookingView, CommentView, CreateBooking,
    CreateComment, CreateItem, Item, ItemView, UpdateItem, User,
};
use crate::service::BookingService;

pub const BOOKINGS_TAG: &str = "bookings";
pub const ITEMS_TAG: &str = "items";

/// OpenAPI documentation for the Bookings API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_booking,
        approve_booking,
        get_booking,
        list_bookings,
        list_owner_bookings,
    ),
    components(
        schemas(BookingView, BookingStatus, BookingState, CreateBooking, User, Item),
        responses(
            BadRequestResponse,
            BadRequestValidationResponse,
            MissingUserHeaderResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = BOOKINGS_TAG, description = "Booking requests and owner approval")
    )
)]
pub struct BookingsApiDoc;

/// OpenAPI documentation for the Items API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_item,
        update_item,
        get_item,
        list_items,
        search_items,
        create_comment,
    ),
    components(
        schemas(ItemView, BookingShort, CommentView, CreateItem, UpdateItem, CreateComment),
        responses(
            BadRequestResponse,
            BadRequestValidationResponse,
            MissingUserHeaderResponse,
            NotFoundResponse,
            ForbiddenResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = ITEMS_TAG, description = "Items, decorated item views and comments")
    )
)]
pub struct ItemsApiDoc;

/// `?state=` of the listing endpoints; defaults to `ALL`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StateQuery {
    /// ALL, CURRENT, PAST, FUTURE, WAITING or REJECTED
    pub state: Option<String>,
}

impl StateQuery {
    fn token(&self) -> &str {
        self.state.as_deref().unwrap_or("ALL")
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApproveQuery {
    /// `true` approves, `false` rejects
    pub approved: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub text: String,
}

/// Create the bookings router
pub fn bookings_router(service: BookingService) -> Router {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/owner", get(list_owner_bookings))
        .route("/{id}", get(get_booking).patch(approve_booking))
        .with_state(Arc::new(service))
}

/// State of the items router.
#[derive(Clone)]
pub struct ItemRoutes {
    pub items: ItemService,
    pub comments: CommentService,
}

/// Create the items router
pub fn items_router(items: ItemService, comments: CommentService) -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/search", get(search_items))
        .route("/{id}", get(get_item).patch(update_item))
        .route("/{id}/comment", post(create_comment))
        .with_state(Arc::new(ItemRoutes { items, comments }))
}

/// Request a booking
#[utoipa::path(
    post,
    path = "",
    tag = BOOKINGS_TAG,
    params(("X-Sharer-User-Id" = i64, Header, description = "Booker id")),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created in WAITING status", body = BookingView),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_booking(
    State(service): State<Arc<BookingService>>,
    SharerUserId(user_id): SharerUserId,
    ValidatedJson(input): ValidatedJson<CreateBooking>,
) -> BookingResult<impl IntoResponse> {
    let booking = service.create_booking(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Approve or reject a booking as the item owner
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = BOOKINGS_TAG,
    params(
        ("id" = i64, Path, description = "Booking ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Item owner id"),
        ApproveQuery
    ),
    responses(
        (status = 200, description = "Booking decided", body = BookingView),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn approve_booking(
    State(service): State<Arc<BookingService>>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    Query(query): Query<ApproveQuery>,
) -> BookingResult<Json<BookingView>> {
    let booking = service.approve_booking(user_id, id, query.approved).await?;
    Ok(Json(booking))
}

/// Get a booking as its booker or the item owner
#[utoipa::path(
    get,
    path = "/{id}",
    tag = BOOKINGS_TAG,
    params(
        ("id" = i64, Path, description = "Booking ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Booker or item owner id")
    ),
    responses(
        (status = 200, description = "Booking found", body = BookingView),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_booking(
    State(service): State<Arc<BookingService>>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
) -> BookingResult<Json<BookingView>> {
    let booking = service.get_booking(user_id, id).await?;
    Ok(Json(booking))
}

/// List the caller's bookings, most recent start first
#[utoipa::path(
    get,
    path = "",
    tag = BOOKINGS_TAG,
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Booker id"),
        StateQuery
    ),
    responses(
        (status = 200, description = "Bookings made by the caller", body = Vec<BookingView>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_bookings(
    State(service): State<Arc<BookingService>>,
    SharerUserId(user_id): SharerUserId,
    Query(query): Query<StateQuery>,
) -> BookingResult<Json<Vec<BookingView>>> {
    let bookings = service.list_by_booker(user_id, query.token()).await?;
    Ok(Json(bookings))
}

/// List bookings of the caller's items, most recent start first
#[utoipa::path(
    get,
    path = "/owner",
    tag = BOOKINGS_TAG,
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Item owner id"),
        StateQuery
    ),
    responses(
        (status = 200, description = "Bookings of the caller's items", body = Vec<BookingView>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_owner_bookings(
    State(service): State<Arc<BookingService>>,
    SharerUserId(user_id): SharerUserId,
    Query(query): Query<StateQuery>,
) -> BookingResult<Json<Vec<BookingView>>> {
    let bookings = service.list_by_owner(user_id, query.token()).await?;
    Ok(Json(bookings))
}

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "",
    tag = ITEMS_TAG,
    params(("X-Sharer-User-Id" = i64, Header, description = "Owner id")),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ItemView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_item(
    State(state): State<Arc<ItemRoutes>>,
    SharerUserId(user_id): SharerUserId,
    ValidatedJson(input): ValidatedJson<CreateItem>,
) -> BookingResult<impl IntoResponse> {
    let item = state.items.create_item(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Partially update an item
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = ITEMS_TAG,
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Owner id")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = ItemView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_item(
    State(state): State<Arc<ItemRoutes>>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<UpdateItem>,
) -> BookingResult<Json<ItemView>> {
    let item = state.items.update_item(user_id, id, input).await?;
    Ok(Json(item))
}

/// Get an item with its comments; the owner also sees last and next bookings
#[utoipa::path(
    get,
    path = "/{id}",
    tag = ITEMS_TAG,
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Viewer id")
    ),
    responses(
        (status = 200, description = "Decorated item", body = ItemView),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_item(
    State(state): State<Arc<ItemRoutes>>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
) -> BookingResult<Json<ItemView>> {
    let item = state.items.get_item(user_id, id).await?;
    Ok(Json(item))
}

/// List the caller's items, ordered by id
#[utoipa::path(
    get,
    path = "",
    tag = ITEMS_TAG,
    params(("X-Sharer-User-Id" = i64, Header, description = "Owner id")),
    responses(
        (status = 200, description = "Decorated items of the owner", body = Vec<ItemView>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_items(
    State(state): State<Arc<ItemRoutes>>,
    SharerUserId(user_id): SharerUserId,
) -> BookingResult<Json<Vec<ItemView>>> {
    let items = state.items.list_owner_items(user_id).await?;
    Ok(Json(items))
}

/// Search available items by name or description
#[utoipa::path(
    get,
    path = "/search",
    tag = ITEMS_TAG,
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching available items", body = Vec<ItemView>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_items(
    State(state): State<Arc<ItemRoutes>>,
    Query(query): Query<SearchQuery>,
) -> BookingResult<Json<Vec<ItemView>>> {
    let items = state.items.search_items(&query.text).await?;
    Ok(Json(items))
}

/// Comment on an item after a completed booking
#[utoipa::path(
    post,
    path = "/{id}/comment",
    tag = ITEMS_TAG,
    params(
        ("id" = i64, Path, description = "Item ID"),
        ("X-Sharer-User-Id" = i64, Header, description = "Author id")
    ),
    request_body = CreateComment,
    responses(
        (status = 200, description = "Comment stored", body = CommentView),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_comment(
    State(state): State<Arc<ItemRoutes>>,
    SharerUserId(user_id): SharerUserId,
    Path(id): Path<i64>,
    ValidatedJson(input): ValidatedJson<CreateComment>,
) -> BookingResult<Json<CommentView>> {
    let comment = state.comments.create_comment(user_id, id, input).await?;
    Ok(Json(comment))
}
