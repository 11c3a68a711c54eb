//! Policy documents.
//!
//! Rendered documents (certificate, schedule, statement) are produced by
//! stamping formatted policy data onto fixed one-page PDF templates at
//! fixed coordinates. Static documents (contract, wording, product info,
//! endorsement) are served byte-for-byte from the asset store.
//!
//! Flow: [`dispatch`] resolves the record → [`render`] loads assets from
//! [`assets`] → [`format`] derives strings → [`layout`] positions them →
//! [`fonts`] embeds the font and encodes text → bytes.

pub mod assets;
pub mod dispatch;
pub mod fonts;
pub mod format;
pub mod layout;
pub mod render;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub use assets::{AssetKind, AssetStore, CachedAssetStore, DirAssetStore, FontAsset, MemoryAssetStore};
pub use dispatch::{DocumentDispatcher, DocumentOutput, InsuranceSource, PDF_CONTENT_TYPE};
pub use render::DocumentRenderer;

/// Document errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A template or font asset is missing or unreadable.
    #[error("Template unavailable: {0}")]
    TemplateUnavailable(String),

    #[error("Insurance not found: {0}")]
    InsuranceNotFound(String),

    #[error("PDF type '{0}' not supported")]
    UnsupportedDocumentType(String),

    /// A static reference document is missing.
    #[error("File not found: {0}")]
    DocumentNotFound(String),

    /// The database could not be reached for the record lookup.
    #[error("Insurance lookup failed: {0}")]
    Lookup(String),

    /// The lookup reached the database but the query or row decode failed.
    #[error("Insurance query failed: {0}")]
    Query(String),

    #[error("Render failed: {0}")]
    Render(String),
}

/// Every document a policyholder can download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    Certificate,
    Schedule,
    Statement,
    Contract,
    Wording,
    ProductInfo,
    Endorsement,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Certificate,
        DocumentType::Schedule,
        DocumentType::Statement,
        DocumentType::Contract,
        DocumentType::Wording,
        DocumentType::ProductInfo,
        DocumentType::Endorsement,
    ];

    /// Wire tag, also the asset file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Certificate => "certificate",
            DocumentType::Schedule => "schedule",
            DocumentType::Statement => "statement",
            DocumentType::Contract => "contract",
            DocumentType::Wording => "wording",
            DocumentType::ProductInfo => "productInfo",
            DocumentType::Endorsement => "endorsement",
        }
    }

    /// Static documents are served unmodified and need no policy data.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            DocumentType::Contract
                | DocumentType::Wording
                | DocumentType::ProductInfo
                | DocumentType::Endorsement
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DocumentError::UnsupportedDocumentType(s.to_string()))
    }
}

/// Where document assets live and whether to keep them in memory.
#[derive(Clone, Debug)]
pub struct DocumentConfig {
    /// Root holding `pdf/` (templates and static documents) and `fonts/`.
    pub assets_dir: PathBuf,
    /// Cache asset bytes process-wide after first load.
    pub cache_assets: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("public"),
            cache_assets: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_round_trip() {
        for t in DocumentType::ALL {
            assert_eq!(t.as_str().parse::<DocumentType>().unwrap(), t);
        }
    }

    #[test]
    fn only_reference_documents_are_static() {
        let statics: Vec<_> = DocumentType::ALL.into_iter().filter(|t| t.is_static()).collect();
        assert_eq!(
            statics,
            [
                DocumentType::Contract,
                DocumentType::Wording,
                DocumentType::ProductInfo,
                DocumentType::Endorsement
            ]
        );
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = "invoice".parse::<DocumentType>().unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedDocumentType(ref t) if t == "invoice"));
        // Tags are case-sensitive on the wire.
        assert!("Certificate".parse::<DocumentType>().is_err());
        assert!("productinfo".parse::<DocumentType>().is_err());
    }
}
