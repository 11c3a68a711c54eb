//! Business logic and outbound integrations used by the handlers.

pub mod auth;
pub mod email;
pub mod uploads;
