//! Admin account queries.

use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{AdminRecord, AdminWithPassword};

/// Row shape for lookups that need the password hash.
#[derive(sqlx::FromRow)]
struct AdminPasswordRow {
    id: Uuid,
    email: String,
    created_at: chrono::DateTime<chrono::Utc>,
    password_hash: String,
}

impl From<AdminPasswordRow> for AdminWithPassword {
    fn from(row: AdminPasswordRow) -> Self {
        Self {
            admin: AdminRecord {
                id: row.id,
                email: row.email,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Fetch an admin (with password hash) by email.
pub async fn find_admin_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AdminWithPassword>, AuthError> {
    let row = sqlx::query_as::<_, AdminPasswordRow>(
        "SELECT id, email, created_at, password_hash FROM admins WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(AdminWithPassword::from))
}

/// Fetch an admin (with password hash) by ID.
pub async fn find_admin_with_password(
    pool: &PgPool,
    admin_id: Uuid,
) -> Result<Option<AdminWithPassword>, AuthError> {
    let row = sqlx::query_as::<_, AdminPasswordRow>(
        "SELECT id, email, created_at, password_hash FROM admins WHERE id = $1",
    )
    .bind(admin_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(AdminWithPassword::from))
}

/// Fetch an admin by ID without the password hash.
pub async fn get_admin_by_id(
    pool: &PgPool,
    admin_id: Uuid,
) -> Result<Option<AdminRecord>, AuthError> {
    let row = sqlx::query_as::<_, AdminRecord>(
        "SELECT id, email, created_at FROM admins WHERE id = $1",
    )
    .bind(admin_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Check whether an email is already registered to an admin.
pub async fn admin_email_exists(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM admins WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Count admin accounts.
pub async fn admin_count(pool: &PgPool) -> Result<i64, AuthError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Create a new admin, returning the stored record.
pub async fn create_admin(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<AdminRecord, AuthError> {
    let row = sqlx::query_as::<_, AdminRecord>(
        "INSERT INTO admins (email, password_hash) VALUES ($1, $2) \
         RETURNING id, email, created_at",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// One page of admins, newest first.
pub async fn list_admins(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<AdminRecord>, AuthError> {
    let rows = sqlx::query_as::<_, AdminRecord>(
        "SELECT id, email, created_at FROM admins \
         ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replace an admin's password hash.
pub async fn update_admin_password(
    pool: &PgPool,
    admin_id: Uuid,
    password_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query("UPDATE admins SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(admin_id)
        .execute(pool)
        .await?;
    Ok(())
}
