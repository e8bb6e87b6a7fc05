//! Sea-ORM entities for the tables created by the `migration` crate.

pub mod booking;
pub mod comment;
pub mod item;
pub mod user;
