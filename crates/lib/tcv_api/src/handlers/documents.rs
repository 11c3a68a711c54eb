//! Policy document downloads.

use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppResult;

/// `GET /api/user/pdf/{insurance_id}/{document_type}`
pub async fn document_handler(
    State(state): State<AppState>,
    Path((insurance_id, document_type)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let output = state
        .documents
        .dispatch(&state.pool, &document_type, &insurance_id)
        .await?;
    let disposition = output.content_disposition();
    Ok((
        [
            (CONTENT_TYPE, output.content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    ))
}
