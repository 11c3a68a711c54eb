//! Admin account endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tcv_core::records::insurances;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedAdmin;
use crate::models::{
    AdminListResponse, CreateAdminRequest, CreateAdminResponse, LoginRequest, LoginResponse,
    MessageResponse, PageQuery, UpdatePasswordRequest,
};
use crate::services::auth;

/// `POST /api/admin/login`
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = auth::login(
        &state.pool,
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(response))
}

/// `POST /api/admin/create`
pub async fn create_admin_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedAdmin(creator)): Extension<AuthenticatedAdmin>,
    Json(body): Json<CreateAdminRequest>,
) -> AppResult<(StatusCode, Json<CreateAdminResponse>)> {
    let admin = auth::create_admin(&state.pool, &body.email, &body.password).await?;
    info!(created_by = %creator.id, admin_id = %admin.id, "admin account added");
    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            admin,
            message: "Admin created successfully".into(),
        }),
    ))
}

/// `GET /api/admin/get-admins?page=`
pub async fn list_admins_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<AdminListResponse>> {
    Ok(Json(auth::list_admins(&state.pool, query.request()).await?))
}

/// `POST /api/admin/send-email/{insurance_no}`
pub async fn send_email_handler(
    State(state): State<AppState>,
    Path(insurance_no): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let insurance = insurances::find_with_user_by_insurance_no(&state.pool, &insurance_no)
        .await?
        .ok_or_else(|| AppError::NotFound("Insurance not found".into()))?;
    let user = insurance
        .user
        .as_ref()
        .filter(|u| !u.email.is_empty())
        .ok_or_else(|| AppError::Validation("No email found for this insurance user".into()))?;

    let link = auth::verification_link(
        &state.config.client_url,
        &insurance,
        user,
        state.config.jwt_secret.as_bytes(),
    )?;
    let mail = state
        .templates
        .verification_email(&user.email, &user.name, &link)?;
    state.mailer.send(mail).await?;

    info!(%insurance_no, "verification link sent");
    Ok(Json(MessageResponse {
        message: format!("Link sent successfully to {}", user.email),
    }))
}

/// `PUT /api/admin/update/{admin_id}`
pub async fn update_password_handler(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
    Json(body): Json<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth::update_password(&state.pool, &admin_id, &body.current_password, &body.password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}
