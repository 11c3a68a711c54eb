//! Admin and policyholder authentication flows, delegating to `tcv_core::auth`.

use sqlx::PgPool;
use tcv_core::auth::jwt::{generate_link_token, generate_session_token};
use tcv_core::auth::password::{hash_password, verify_password};
use tcv_core::auth::queries;
use tcv_core::models::auth::{AdminRecord, LinkClaims, ROLE_ADMIN, ROLE_USER};
use tcv_core::models::{InsuranceWithUser, UserRecord};
use tcv_core::records::{PageRequest, insurances, total_pages};
use tcv_core::uuid::parse_id;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AdminListResponse, LoginResponse, VerifyRequest};

const INVALID_LOGIN: &str = "Invalid email or password";
const DETAILS_MISMATCH: &str = "User details do not match";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authenticate an admin with email + password.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<LoginResponse> {
    let Some(found) = queries::find_admin_by_email(pool, &normalize_email(email)).await? else {
        return Err(AppError::Unauthorized(INVALID_LOGIN.into()));
    };
    if !verify_password(password, &found.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_LOGIN.into()));
    }
    let token = generate_session_token(&found.admin.id.to_string(), ROLE_ADMIN, jwt_secret)?;
    info!(admin_id = %found.admin.id, "admin logged in");
    Ok(LoginResponse {
        user: found.admin,
        token,
    })
}

fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    Ok(())
}

/// Create an admin account.
pub async fn create_admin(pool: &PgPool, email: &str, password: &str) -> AppResult<AdminRecord> {
    let email = normalize_email(email);
    validate_credentials(&email, password)?;
    if queries::admin_email_exists(pool, &email).await? {
        return Err(AppError::Validation("Admin already exists".into()));
    }
    let hash = hash_password(password)?;
    let admin = queries::create_admin(pool, &email, &hash).await?;
    info!(admin_id = %admin.id, "admin created");
    Ok(admin)
}

/// One page of admins.
pub async fn list_admins(pool: &PgPool, page: PageRequest) -> AppResult<AdminListResponse> {
    let count = queries::admin_count(pool).await?;
    let admins = queries::list_admins(pool, page.limit(), page.offset()).await?;
    Ok(AdminListResponse {
        admins,
        total_pages: total_pages(count),
    })
}

/// Change an admin's password after checking the current one.
pub async fn update_password(
    pool: &PgPool,
    admin_id: &str,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    if new_password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    let not_found = || AppError::NotFound("Admin not found".into());
    let id = parse_id(admin_id).ok_or_else(not_found)?;
    let found = queries::find_admin_with_password(pool, id)
        .await?
        .ok_or_else(not_found)?;

    if !verify_password(current_password, &found.password_hash)? {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }
    if verify_password(new_password, &found.password_hash)? {
        return Err(AppError::Validation(
            "New password cannot be same as the current password".into(),
        ));
    }

    let hash = hash_password(new_password)?;
    queries::update_admin_password(pool, id, &hash).await?;
    info!(admin_id = %id, "admin password updated");
    Ok(())
}

/// Create the first admin when none exist. Returns whether one was created.
pub async fn bootstrap_admin(pool: &PgPool, email: &str, password: &str) -> AppResult<bool> {
    if queries::admin_count(pool).await? > 0 {
        return Ok(false);
    }
    create_admin(pool, email, password).await?;
    info!(email = %normalize_email(email), "bootstrapped initial admin");
    Ok(true)
}

/// Whether the submitted details identify `user`.
///
/// Name and date of birth must match exactly; email ignores case.
pub fn details_match(user: &UserRecord, request: &VerifyRequest) -> bool {
    user.name == request.name
        && user.email.eq_ignore_ascii_case(request.email.trim())
        && user.dob.format("%Y-%m-%d").to_string() == request.dob.trim()
}

/// Check a policyholder against a verification link and issue a session.
///
/// The link must have been minted for the insurance named in the request.
pub async fn verify_policyholder(
    pool: &PgPool,
    link: &LinkClaims,
    request: &VerifyRequest,
    jwt_secret: &[u8],
) -> AppResult<(InsuranceWithUser, UserRecord, String)> {
    let insurance =
        insurances::find_with_user_by_insurance_no(pool, request.insurance_no.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Insurance not found".into()))?;

    if insurance.insurance.id.to_string() != link.insurance_id {
        warn!(insurance_no = %request.insurance_no, "verification link issued for another policy");
        return Err(AppError::Validation(DETAILS_MISMATCH.into()));
    }
    let user = match &insurance.user {
        Some(user) if details_match(user, request) => user.clone(),
        _ => return Err(AppError::Validation(DETAILS_MISMATCH.into())),
    };

    let token = generate_session_token(&user.id.to_string(), ROLE_USER, jwt_secret)?;
    info!(user_id = %user.id, insurance_no = %insurance.insurance.insurance_no, "policyholder verified");
    Ok((insurance, user, token))
}

/// Mint a verification link for a policy's holder.
pub fn verification_link(
    client_url: &str,
    insurance: &InsuranceWithUser,
    user: &UserRecord,
    jwt_secret: &[u8],
) -> AppResult<String> {
    let token = generate_link_token(
        &insurance.insurance.id.to_string(),
        &user.id.to_string(),
        jwt_secret,
    )?;
    Ok(format!("{client_url}/verify/{token}"))
}
