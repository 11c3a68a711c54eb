//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod documents;
pub mod insurance;
pub mod user;
