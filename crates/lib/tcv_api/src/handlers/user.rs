//! Policyholder endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tcv_core::records::users::{self, UserPatch};
use tcv_core::records::{RecordError, total_pages};
use tcv_core::uuid::parse_id;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::VerifiedLink;
use crate::models::{
    PageQuery, UpdateUserResponse, UserDetailsResponse, UserListResponse, VerifyRequest,
    VerifyResponse,
};
use crate::services::auth;

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

/// `GET /api/user/get-users?page=`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<UserListResponse>> {
    let count = users::user_count(&state.pool).await?;
    let users = users::list_users(&state.pool, query.request()).await?;
    Ok(Json(UserListResponse {
        users,
        total_pages: total_pages(count),
    }))
}

/// `GET /api/user/details/{user_id}`
pub async fn user_details_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserDetailsResponse>> {
    let id = parse_id(&user_id).ok_or_else(user_not_found)?;
    let user = users::get_user_by_id(&state.pool, id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(UserDetailsResponse { user }))
}

/// `PUT /api/user/edit-user/{user_id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(mut patch): Json<UserPatch>,
) -> AppResult<Json<UpdateUserResponse>> {
    let id = parse_id(&user_id).ok_or_else(user_not_found)?;
    if let Some(email) = patch.email.as_mut() {
        *email = email.trim().to_lowercase();
    }
    let user = users::update_user(&state.pool, id, &patch)
        .await
        .map_err(|e| match e {
            RecordError::NotFound(_) => user_not_found(),
            other => other.into(),
        })?;
    info!(user_id = %user.id, "user updated");
    Ok(Json(UpdateUserResponse {
        message: "User updated successfully".into(),
        user,
    }))
}

/// `POST /api/user/verify/{token}`
pub async fn verify_handler(
    State(state): State<AppState>,
    Extension(VerifiedLink(link)): Extension<VerifiedLink>,
    Json(body): Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let (insurance, user, token) = auth::verify_policyholder(
        &state.pool,
        &link,
        &body,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(VerifyResponse {
        message: "Verification successful".into(),
        insurance,
        token,
        user,
    }))
}
