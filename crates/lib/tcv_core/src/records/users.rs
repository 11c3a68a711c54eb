//! Policyholder queries.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{PageRequest, RecordError};
use crate::models::UserRecord;

const USER_COLUMNS: &str =
    "id, title, name, dob, email, address, phone_no, occupation, role, created_at";

/// Fields required to create a policyholder.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub title: String,
    pub name: String,
    pub dob: NaiveDate,
    pub email: String,
    pub address: String,
    pub phone_no: String,
    pub occupation: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub title: Option<String>,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone_no: Option<String>,
    pub occupation: Option<String>,
}

/// Fetch a user by email.
pub async fn find_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>, RecordError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Fetch a user by ID.
pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>, RecordError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Create a new user.
pub async fn create_user(pool: &PgPool, user: &NewUser) -> Result<UserRecord, RecordError> {
    let sql = format!(
        "INSERT INTO users (title, name, dob, email, address, phone_no, occupation) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(&user.title)
        .bind(&user.name)
        .bind(user.dob)
        .bind(&user.email)
        .bind(&user.address)
        .bind(&user.phone_no)
        .bind(&user.occupation)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// Return the user registered under `user.email`, creating it when absent.
///
/// An existing user is reused as-is; the submitted details do not overwrite it.
pub async fn find_or_create_user(pool: &PgPool, user: &NewUser) -> Result<UserRecord, RecordError> {
    if let Some(existing) = find_user_by_email(pool, &user.email).await? {
        return Ok(existing);
    }
    create_user(pool, user).await
}

/// One page of users, newest first.
pub async fn list_users(pool: &PgPool, page: PageRequest) -> Result<Vec<UserRecord>, RecordError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Count users.
pub async fn user_count(pool: &PgPool) -> Result<i64, RecordError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Apply a partial update, returning the updated user.
pub async fn update_user(
    pool: &PgPool,
    user_id: Uuid,
    patch: &UserPatch,
) -> Result<UserRecord, RecordError> {
    let sql = format!(
        "UPDATE users SET \
           title = COALESCE($2, title), \
           name = COALESCE($3, name), \
           dob = COALESCE($4, dob), \
           email = COALESCE($5, email), \
           address = COALESCE($6, address), \
           phone_no = COALESCE($7, phone_no), \
           occupation = COALESCE($8, occupation) \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.name)
        .bind(patch.dob)
        .bind(&patch.email)
        .bind(&patch.address)
        .bind(&patch.phone_no)
        .bind(&patch.occupation)
        .fetch_optional(pool)
        .await?;
    row.ok_or_else(|| RecordError::NotFound("User".into()))
}
