//! Insurance policy domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uploaded supporting document attached to a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceImage {
    pub url: String,
    /// Identifier assigned by the image store (used for deletion).
    pub storage_id: String,
}

/// One temporary insurance policy.
///
/// `premium` and `vehicle_value` are display text and are rendered verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRecord {
    pub id: Uuid,
    /// `TCV-MOT-########`, globally unique.
    pub insurance_no: String,
    pub model: String,
    pub registration_no: String,
    pub maker_name: String,
    pub policy_cover: String,
    pub license_type: String,
    pub premium: String,
    pub vehicle_value: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub images: Vec<InsuranceImage>,
    /// Referenced policyholder; the policy does not own the user's lifecycle.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Policyholder.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub title: String,
    pub name: String,
    pub dob: NaiveDate,
    pub email: String,
    /// Single free-text field, comma-delimited for multi-line rendering.
    pub address: String,
    pub phone_no: String,
    pub occupation: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// An insurance record with its `user` relation resolved.
///
/// `user` is `None` when the policy references no user or the user row has
/// been removed; document rendering degrades to blanks in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceWithUser {
    #[serde(flatten)]
    pub insurance: InsuranceRecord,
    pub user: Option<UserRecord>,
}
