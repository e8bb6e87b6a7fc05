//! Request extractors shared by the ShareIt handlers.

pub mod sharer_user;
pub mod validated_json;

pub use sharer_user::{SHARER_USER_HEADER, SharerUserId};
pub use validated_json::ValidatedJson;
