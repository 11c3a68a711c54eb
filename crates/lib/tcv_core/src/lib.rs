//! # tcv_core
//!
//! Core domain logic for Temp Cover: policy records, auth primitives and
//! the policy-document subsystem.

pub mod auth;
pub mod documents;
pub mod migrate;
pub mod models;
pub mod records;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
