//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request and
//! response shapes (which carry `#[serde(rename_all = "camelCase")]`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role carried by session tokens issued to operators.
pub const ROLE_ADMIN: &str = "admin";

/// Role carried by session tokens issued to verified policyholders.
pub const ROLE_USER: &str = "user";

/// Operator account. The password hash never leaves the auth module.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Admin with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct AdminWithPassword {
    pub admin: AdminRecord,
    pub password_hash: String,
}

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: admin or user ID (standard JWT `sub` claim).
    pub sub: String,
    /// `admin` or `user`.
    pub role: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// JWT claims embedded in emailed verification links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkClaims {
    pub insurance_id: String,
    pub user_id: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}
