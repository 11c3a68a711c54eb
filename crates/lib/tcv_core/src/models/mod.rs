//! Domain models shared by the API layer and the document subsystem.

pub mod auth;
pub mod insurance;

pub use insurance::{InsuranceImage, InsuranceRecord, InsuranceWithUser, UserRecord};
