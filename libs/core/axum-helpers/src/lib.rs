//! # Axum Helpers
//!
//! Shared HTTP plumbing for the ShareIt services.
//!
//! - **[`errors`]**: `AppError`, error codes and the JSON error body
//! - **[`extractors`]**: `SharerUserId` caller identity and `ValidatedJson`
//! - **[`http`]**: CORS and security header middleware
//! - **[`server`]**: router assembly with OpenAPI UIs, health checks, graceful shutdown

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{SharerUserId, ValidatedJson};
pub use server::{
    HealthCheckFuture, ShutdownCoordinator, create_production_app, create_router, health_router,
    run_health_checks,
};
