//! Policy image uploads.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tcv_core::models::InsuranceImage;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CloudinaryConfig;

/// Remote folder that holds policy images.
pub const INSURANCE_FOLDER: &str = "insurances";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Image uploads are not configured")]
    NotConfigured,

    #[error("Upload request failed: {0}")]
    Request(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// One file from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, folder: &str, file: UploadFile) -> Result<InsuranceImage, UploadError>;
}

/// Signed uploads to Cloudinary.
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
    endpoint: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// SHA-256 over `k=v` pairs joined by `&` in key order, then the secret.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        let endpoint = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            config.cloud_name
        );
        Self {
            client: reqwest::Client::new(),
            config,
            endpoint,
        }
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, folder: &str, file: UploadFile) -> Result<InsuranceImage, UploadError> {
        let timestamp = Utc::now().timestamp().to_string();
        let params = BTreeMap::from([
            ("folder", folder.to_string()),
            ("signature_algorithm", "sha256".to_string()),
            ("timestamp", timestamp.clone()),
        ]);
        let signature = sign_params(&params, &self.config.api_secret);

        let mut part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        if let Some(mime) = file.content_type.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|e| UploadError::Rejected(format!("{}: {e}", file.file_name)))?;
        }
        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("folder", folder.to_string())
            .text("signature_algorithm", "sha256")
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.to_string());
            warn!(%status, file = %file.file_name, message, "image upload rejected");
            return Err(if status.is_server_error() {
                UploadError::Request(message)
            } else {
                UploadError::Rejected(message)
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Request(format!("invalid upload response: {e}")))?;
        debug!(file = %file.file_name, id = %uploaded.public_id, "image uploaded");
        Ok(InsuranceImage {
            url: uploaded.secure_url,
            storage_id: uploaded.public_id,
        })
    }
}

/// Used when no image store is configured.
#[derive(Debug, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _folder: &str, _file: UploadFile) -> Result<InsuranceImage, UploadError> {
        Err(UploadError::NotConfigured)
    }
}
