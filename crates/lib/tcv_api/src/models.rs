//! Request and response bodies.
//!
//! Everything on the wire is camelCase.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tcv_core::models::auth::AdminRecord;
use tcv_core::models::{InsuranceRecord, InsuranceWithUser, UserRecord};
use tcv_core::records::PageRequest;
use tcv_core::records::insurances::NewInsurance;
use tcv_core::records::users::NewUser;

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `?page=` on list endpoints. Anything unparsable means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page.as_deref().and_then(|p| p.trim().parse().ok()))
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: AdminRecord,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAdminResponse {
    pub admin: AdminRecord,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListResponse {
    pub admins: Vec<AdminRecord>,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Insurance
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceListResponse {
    pub insurances: Vec<InsuranceRecord>,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct InsuranceDetailsResponse {
    pub insurance: InsuranceWithUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceNoResponse {
    pub insurance_no: String,
}

#[derive(Debug, Serialize)]
pub struct CreateInsuranceResponse {
    pub message: String,
    pub insurance: InsuranceRecord,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct UpdateInsuranceResponse {
    pub message: String,
    pub insurance: InsuranceRecord,
}

/// Text fields of the create-insurance form, validated.
///
/// `insurance_no` is `None` when the form leaves it blank; the handler
/// generates one.
#[derive(Debug, Clone)]
pub struct CreateInsuranceForm {
    pub insurance_no: Option<String>,
    pub policy: NewInsurance,
    pub user: NewUser,
}

/// Accepts RFC 3339, `datetime-local` input (`YYYY-MM-DDTHH:MM[:SS]`, read
/// as UTC) or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `YYYY-MM-DD`, or the date part of a timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date_naive()))
}

impl CreateInsuranceForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> AppResult<Self> {
        let optional = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| AppError::Validation(format!("{key} is required")))
        };
        let timestamp = |key: &str| -> AppResult<DateTime<Utc>> {
            let raw = required(key)?;
            parse_timestamp(&raw)
                .ok_or_else(|| AppError::Validation(format!("{key} is not a valid date: {raw}")))
        };

        let dob_raw = required("dob")?;
        let dob = parse_date(&dob_raw)
            .ok_or_else(|| AppError::Validation(format!("dob is not a valid date: {dob_raw}")))?;

        Ok(Self {
            insurance_no: optional("insuranceNo"),
            policy: NewInsurance {
                insurance_no: String::new(),
                model: required("model")?,
                registration_no: required("registrationNo")?,
                maker_name: required("makerName")?,
                policy_cover: required("policyCover")?,
                license_type: required("licenseType")?,
                premium: required("premium")?,
                vehicle_value: required("vehicleValue")?,
                issue_date: timestamp("issueDate")?,
                expiry_date: timestamp("expiryDate")?,
                images: Vec::new(),
                user_id: None,
            },
            user: NewUser {
                title: required("title")?,
                name: required("name")?,
                dob,
                email: required("email")?.to_lowercase(),
                address: required("address")?,
                phone_no: required("phoneNo")?,
                occupation: optional("occupation"),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct UserDetailsResponse {
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub message: String,
    pub user: UserRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub insurance_no: String,
    pub name: String,
    /// `YYYY-MM-DD`.
    pub dob: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: String,
    pub insurance: InsuranceWithUser,
    pub token: String,
    pub user: UserRecord,
}
