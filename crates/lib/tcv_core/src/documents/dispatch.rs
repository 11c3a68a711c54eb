//! Document-type dispatch: static passthrough or lookup-then-render.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::render::DocumentRenderer;
use super::{DocumentError, DocumentType};
use crate::models::InsuranceWithUser;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Resolves a policy, with its user, by id.
#[async_trait]
pub trait InsuranceSource: Send + Sync {
    /// `Ok(None)` when no policy has this id.
    async fn find_insurance_with_user(
        &self,
        insurance_id: &str,
    ) -> Result<Option<InsuranceWithUser>, DocumentError>;
}

/// A document ready to send.
#[derive(Debug, Clone)]
pub struct DocumentOutput {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl DocumentOutput {
    /// `Content-Disposition` value for a download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }
}

pub struct DocumentDispatcher {
    renderer: Arc<DocumentRenderer>,
}

impl DocumentDispatcher {
    pub fn new(renderer: Arc<DocumentRenderer>) -> Self {
        Self { renderer }
    }

    pub fn renderer(&self) -> &DocumentRenderer {
        &self.renderer
    }

    /// Produce the document named by `document_type` for `insurance_id`.
    ///
    /// The tag is validated before anything else, so an unsupported type
    /// never reaches the source. Static documents ignore the id.
    pub async fn dispatch(
        &self,
        source: &dyn InsuranceSource,
        document_type: &str,
        insurance_id: &str,
    ) -> Result<DocumentOutput, DocumentError> {
        let document: DocumentType = document_type.parse()?;

        if document.is_static() {
            let bytes = self.renderer.serve_static(document)?;
            debug!(%document, bytes = bytes.len(), "serving static document");
            return Ok(DocumentOutput {
                filename: format!("{document}.pdf"),
                content_type: PDF_CONTENT_TYPE,
                bytes: bytes.to_vec(),
            });
        }

        let record = source
            .find_insurance_with_user(insurance_id)
            .await?
            .ok_or_else(|| DocumentError::InsuranceNotFound(insurance_id.to_string()))?;
        let filename = format!("{document}-{}.pdf", record.insurance.insurance_no);

        // Stamping and serialization are CPU-bound.
        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(document, &record))
            .await
            .map_err(|e| DocumentError::Render(format!("render task failed: {e}")))??;

        info!(%document, filename, bytes = bytes.len(), "document rendered");
        Ok(DocumentOutput {
            filename,
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }
}
