//! Insurance policy endpoints.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use tcv_core::records::insurances::{self, InsurancePatch};
use tcv_core::records::{total_pages, users};
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateInsuranceForm, CreateInsuranceResponse, InsuranceDetailsResponse, InsuranceListResponse,
    InsuranceNoResponse, PageQuery, UpdateInsuranceResponse,
};
use crate::services::uploads::{INSURANCE_FOLDER, UploadFile};

/// Multipart field names that carry image files.
const FILE_FIELDS: [&str; 2] = ["files", "files[]"];

/// `GET /api/insurance/get-insurances?page=`
pub async fn list_insurances_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<InsuranceListResponse>> {
    let count = insurances::insurance_count(&state.pool).await?;
    let insurances = insurances::list_insurances(&state.pool, query.request()).await?;
    Ok(Json(InsuranceListResponse {
        insurances,
        total_pages: total_pages(count),
    }))
}

/// `GET /api/insurance/details/{insurance_no}`
pub async fn insurance_details_handler(
    State(state): State<AppState>,
    Path(insurance_no): Path<String>,
) -> AppResult<Json<InsuranceDetailsResponse>> {
    let insurance = insurances::find_with_user_by_insurance_no(&state.pool, &insurance_no)
        .await?
        .ok_or_else(|| AppError::NotFound("Insurance not found".into()))?;
    Ok(Json(InsuranceDetailsResponse { insurance }))
}

/// `GET /api/insurance/generate-insurance-no`
pub async fn generate_insurance_no_handler(
    State(state): State<AppState>,
) -> AppResult<Json<InsuranceNoResponse>> {
    let insurance_no = insurances::generate_insurance_no(&state.pool).await?;
    Ok(Json(InsuranceNoResponse { insurance_no }))
}

/// Split a multipart body into text fields and uploaded files.
async fn read_form(
    mut multipart: Multipart,
) -> AppResult<(HashMap<String, String>, Vec<UploadFile>)> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid file {file_name}: {e}")))?;
            if !bytes.is_empty() {
                files.push(UploadFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }
    Ok((fields, files))
}

/// `POST /api/insurance/create-insurance` (multipart)
pub async fn create_insurance_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<CreateInsuranceResponse>)> {
    let (fields, files) = read_form(multipart).await?;
    let mut form = CreateInsuranceForm::from_fields(&fields)?;

    let insurance_no = match form.insurance_no.take() {
        Some(no) => {
            if insurances::insurance_no_exists(&state.pool, &no).await? {
                return Err(AppError::Validation("Insurance number already exists".into()));
            }
            no
        }
        None => insurances::generate_insurance_no(&state.pool).await?,
    };

    let mut images = Vec::with_capacity(files.len());
    for file in files {
        images.push(state.images.upload(INSURANCE_FOLDER, file).await?);
    }
    debug!(%insurance_no, count = images.len(), "images uploaded");

    let user = users::find_or_create_user(&state.pool, &form.user).await?;

    form.policy.insurance_no = insurance_no;
    form.policy.images = images;
    form.policy.user_id = Some(user.id);
    let insurance = insurances::create_insurance(&state.pool, &form.policy).await?;

    info!(insurance_no = %insurance.insurance_no, user_id = %user.id, "insurance created");
    Ok((
        StatusCode::CREATED,
        Json(CreateInsuranceResponse {
            message: format!("{} created successfully!", insurance.insurance_no),
            insurance,
            user,
        }),
    ))
}

/// `PUT /api/insurance/edit-insurance/{insurance_no}`
pub async fn update_insurance_handler(
    State(state): State<AppState>,
    Path(insurance_no): Path<String>,
    Json(patch): Json<InsurancePatch>,
) -> AppResult<Json<UpdateInsuranceResponse>> {
    let insurance = insurances::update_insurance(&state.pool, &insurance_no, &patch).await?;
    info!(%insurance_no, "insurance updated");
    Ok(Json(UpdateInsuranceResponse {
        message: "Insurance updated successfully".into(),
        insurance,
    }))
}
