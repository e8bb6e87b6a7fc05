use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "ShareIt API",
        version = "0.1.0",
        description = "Item sharing: items, booking requests with owner approval, and comments"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/bookings", api = domain_bookings::BookingsApiDoc),
        (path = "/items", api = domain_bookings::ItemsApiDoc)
    )
)]
pub struct ApiDoc;
