//! Persistence for policyholders and insurance policies.
//!
//! Plain `sqlx` queries against the tables created by the embedded
//! migrations. Listing endpoints share the fixed page size below.

pub mod insurances;
pub mod users;

use thiserror::Error;

/// Records per listing page.
pub const PAGE_SIZE: i64 = 10;

/// Record errors.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// A 1-based page number; anything below 1 is treated as the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest(i64);

impl PageRequest {
    pub fn new(page: Option<i64>) -> Self {
        Self(page.filter(|p| *p >= 1).unwrap_or(1))
    }

    pub fn number(self) -> i64 {
        self.0
    }

    pub fn limit(self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(self) -> i64 {
        (self.0 - 1) * PAGE_SIZE
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self(1)
    }
}

/// Number of pages needed for `count` records.
pub fn total_pages(count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    (count + PAGE_SIZE - 1) / PAGE_SIZE
}
