//! Insurance policy queries and policy-number generation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::{PageRequest, RecordError, users};
use crate::documents::{DocumentError, InsuranceSource};
use crate::models::{InsuranceImage, InsuranceRecord, InsuranceWithUser};
use crate::uuid::{parse_id, uuidv7};

/// Prefix of every policy number.
pub const INSURANCE_NO_PREFIX: &str = "TCV-MOT-";

const INSURANCE_COLUMNS: &str = "id, insurance_no, model, registration_no, maker_name, \
     policy_cover, license_type, premium, vehicle_value, issue_date, expiry_date, images, \
     user_id, created_at";

/// Same columns with images blanked, for listings.
const INSURANCE_SUMMARY_COLUMNS: &str = "id, insurance_no, model, registration_no, maker_name, \
     policy_cover, license_type, premium, vehicle_value, issue_date, expiry_date, \
     '[]'::jsonb AS images, user_id, created_at";

#[derive(sqlx::FromRow)]
struct InsuranceRow {
    id: Uuid,
    insurance_no: String,
    model: String,
    registration_no: String,
    maker_name: String,
    policy_cover: String,
    license_type: String,
    premium: String,
    vehicle_value: String,
    issue_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    images: Json<Vec<InsuranceImage>>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<InsuranceRow> for InsuranceRecord {
    fn from(row: InsuranceRow) -> Self {
        Self {
            id: row.id,
            insurance_no: row.insurance_no,
            model: row.model,
            registration_no: row.registration_no,
            maker_name: row.maker_name,
            policy_cover: row.policy_cover,
            license_type: row.license_type,
            premium: row.premium,
            vehicle_value: row.vehicle_value,
            issue_date: row.issue_date,
            expiry_date: row.expiry_date,
            images: row.images.0,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Fields required to create a policy.
#[derive(Debug, Clone)]
pub struct NewInsurance {
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
    pub user_id: Option<Uuid>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePatch {
    pub model: Option<String>,
    pub registration_no: Option<String>,
    pub maker_name: Option<String>,
    pub policy_cover: Option<String>,
    pub license_type: Option<String>,
    pub premium: Option<String>,
    pub vehicle_value: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// A random candidate policy number: prefix plus 8 digits, no leading zero.
pub fn random_insurance_no<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits: u32 = rng.random_range(10_000_000..=99_999_999);
    format!("{INSURANCE_NO_PREFIX}{digits}")
}

/// Check whether a policy number is taken.
pub async fn insurance_no_exists(pool: &PgPool, insurance_no: &str) -> Result<bool, RecordError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM insurances WHERE insurance_no = $1)",
    )
    .bind(insurance_no)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Draw random policy numbers until one is not in use.
pub async fn generate_insurance_no(pool: &PgPool) -> Result<String, RecordError> {
    loop {
        let candidate = random_insurance_no(&mut rng());
        if !insurance_no_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
        debug!(candidate, "policy number collision, drawing again");
    }
}

/// Insert a policy, returning the stored record.
pub async fn create_insurance(
    pool: &PgPool,
    insurance: &NewInsurance,
) -> Result<InsuranceRecord, RecordError> {
    let sql = format!(
        "INSERT INTO insurances (id, insurance_no, model, registration_no, maker_name, \
           policy_cover, license_type, premium, vehicle_value, issue_date, expiry_date, \
           images, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {INSURANCE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, InsuranceRow>(&sql)
        .bind(uuidv7())
        .bind(&insurance.insurance_no)
        .bind(&insurance.model)
        .bind(&insurance.registration_no)
        .bind(&insurance.maker_name)
        .bind(&insurance.policy_cover)
        .bind(&insurance.license_type)
        .bind(&insurance.premium)
        .bind(&insurance.vehicle_value)
        .bind(insurance.issue_date)
        .bind(insurance.expiry_date)
        .bind(Json(&insurance.images))
        .bind(insurance.user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.into())
}

/// Fetch a policy by its policy number.
pub async fn find_by_insurance_no(
    pool: &PgPool,
    insurance_no: &str,
) -> Result<Option<InsuranceRecord>, RecordError> {
    let sql = format!("SELECT {INSURANCE_COLUMNS} FROM insurances WHERE insurance_no = $1");
    let row = sqlx::query_as::<_, InsuranceRow>(&sql)
        .bind(insurance_no)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(InsuranceRecord::from))
}

/// Fetch a policy by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<InsuranceRecord>, RecordError> {
    let sql = format!("SELECT {INSURANCE_COLUMNS} FROM insurances WHERE id = $1");
    let row = sqlx::query_as::<_, InsuranceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(InsuranceRecord::from))
}

/// Resolve the `user` relation of a fetched policy.
pub async fn with_user(
    pool: &PgPool,
    insurance: InsuranceRecord,
) -> Result<InsuranceWithUser, RecordError> {
    let user = match insurance.user_id {
        Some(user_id) => users::get_user_by_id(pool, user_id).await?,
        None => None,
    };
    Ok(InsuranceWithUser { insurance, user })
}

/// Fetch a policy by ID with its user resolved.
pub async fn find_with_user_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<InsuranceWithUser>, RecordError> {
    match find_by_id(pool, id).await? {
        Some(insurance) => Ok(Some(with_user(pool, insurance).await?)),
        None => Ok(None),
    }
}

/// Fetch a policy by policy number with its user resolved.
pub async fn find_with_user_by_insurance_no(
    pool: &PgPool,
    insurance_no: &str,
) -> Result<Option<InsuranceWithUser>, RecordError> {
    match find_by_insurance_no(pool, insurance_no).await? {
        Some(insurance) => Ok(Some(with_user(pool, insurance).await?)),
        None => Ok(None),
    }
}

/// One page of policies, newest first, without images.
pub async fn list_insurances(
    pool: &PgPool,
    page: PageRequest,
) -> Result<Vec<InsuranceRecord>, RecordError> {
    let sql = format!(
        "SELECT {INSURANCE_SUMMARY_COLUMNS} FROM insurances \
         ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, InsuranceRow>(&sql)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(InsuranceRecord::from).collect())
}

/// Count policies.
pub async fn insurance_count(pool: &PgPool) -> Result<i64, RecordError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM insurances")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Apply a partial update, returning the updated policy.
pub async fn update_insurance(
    pool: &PgPool,
    insurance_no: &str,
    patch: &InsurancePatch,
) -> Result<InsuranceRecord, RecordError> {
    let sql = format!(
        "UPDATE insurances SET \
           model = COALESCE($2, model), \
           registration_no = COALESCE($3, registration_no), \
           maker_name = COALESCE($4, maker_name), \
           policy_cover = COALESCE($5, policy_cover), \
           license_type = COALESCE($6, license_type), \
           premium = COALESCE($7, premium), \
           vehicle_value = COALESCE($8, vehicle_value), \
           issue_date = COALESCE($9, issue_date), \
           expiry_date = COALESCE($10, expiry_date) \
         WHERE insurance_no = $1 RETURNING {INSURANCE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, InsuranceRow>(&sql)
        .bind(insurance_no)
        .bind(&patch.model)
        .bind(&patch.registration_no)
        .bind(&patch.maker_name)
        .bind(&patch.policy_cover)
        .bind(&patch.license_type)
        .bind(&patch.premium)
        .bind(&patch.vehicle_value)
        .bind(patch.issue_date)
        .bind(patch.expiry_date)
        .fetch_optional(pool)
        .await?;
    row.map(InsuranceRecord::from)
        .ok_or_else(|| RecordError::NotFound("Insurance".into()))
}

#[async_trait]
impl InsuranceSource for PgPool {
    async fn find_insurance_with_user(
        &self,
        insurance_id: &str,
    ) -> Result<Option<InsuranceWithUser>, DocumentError> {
        // A malformed id cannot match any row.
        let Some(id) = parse_id(insurance_id) else {
            return Ok(None);
        };
        find_with_user_by_id(self, id).await.map_err(lookup_error)
    }
}

/// Unreachable database vs. a failing query.
fn lookup_error(e: RecordError) -> DocumentError {
    match e {
        RecordError::DbError(
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
        ) => DocumentError::Lookup(e.to_string()),
        other => DocumentError::Query(other.to_string()),
    }
}
