//! End-to-end document rendering against an on-disk asset directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use tcv_core::documents::{
    DocumentConfig, DocumentDispatcher, DocumentError, DocumentRenderer, DocumentType,
    InsuranceSource, PDF_CONTENT_TYPE,
};
use tcv_core::models::{InsuranceRecord, InsuranceWithUser, UserRecord};
use uuid::Uuid;

fn write_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    // A grey rectangle standing in for the printed form.
    let content = Content {
        operations: vec![
            Operation::new("g", vec![Object::Real(0.9_f32.into())]),
            Operation::new("re", vec![20.into(), 20.into(), 555.into(), 802.into()]),
            Operation::new("f", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().expect("encode"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Resources" => Dictionary::new(),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save template");
}

/// Lay out `public/`-style assets: templates, fonts and one static document.
fn asset_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let pdf = dir.path().join("pdf");
    let fonts = dir.path().join("fonts");
    std::fs::create_dir_all(&pdf).expect("mkdir pdf");
    std::fs::create_dir_all(&fonts).expect("mkdir fonts");

    for name in ["certificate", "schedule", "statement"] {
        write_template(&pdf.join(format!("{name}.pdf")));
    }
    let repo_fonts = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../public/fonts");
    for file in ["DejaVuSans.ttf", "DejaVuSans-Bold.ttf"] {
        std::fs::copy(repo_fonts.join(file), fonts.join(file)).expect("copy font");
    }
    std::fs::write(pdf.join("wording.pdf"), b"%PDF-1.4 policy wording").expect("write wording");
    dir
}

struct Policies(HashMap<String, InsuranceWithUser>);

#[async_trait]
impl InsuranceSource for Policies {
    async fn find_insurance_with_user(
        &self,
        insurance_id: &str,
    ) -> Result<Option<InsuranceWithUser>, DocumentError> {
        Ok(self.0.get(insurance_id).cloned())
    }
}

fn policy() -> InsuranceWithUser {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    InsuranceWithUser {
        insurance: InsuranceRecord {
            id: Uuid::nil(),
            insurance_no: "TCV-MOT-12345678".into(),
            model: "Golf".into(),
            registration_no: "XY70 ZZZ".into(),
            maker_name: "Volkswagen".into(),
            policy_cover: "Comprehensive".into(),
            license_type: "Full UK".into(),
            premium: "£32.00".into(),
            vehicle_value: "£12,500".into(),
            issue_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            expiry_date: Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap(),
            images: Vec::new(),
            user_id: None,
            created_at: created,
        },
        user: Some(UserRecord {
            id: Uuid::nil(),
            title: "Mr".into(),
            name: "Kwame Mensah".into(),
            dob: NaiveDate::from_ymd_opt(1985, 11, 2).unwrap(),
            email: "kwame@example.com".into(),
            address: "Flat 2, 9 High Road, Leeds, LS1 1AA".into(),
            phone_no: "0113 496 0000".into(),
            occupation: None,
            role: "user".into(),
            created_at: created,
        }),
    }
}

fn dispatcher(dir: &Path) -> DocumentDispatcher {
    let config = DocumentConfig {
        assets_dir: dir.to_path_buf(),
        cache_assets: true,
    };
    DocumentDispatcher::new(Arc::new(DocumentRenderer::from_config(&config)))
}

fn policies() -> Policies {
    Policies(HashMap::from([("policy-1".to_string(), policy())]))
}

#[tokio::test]
async fn certificate_is_named_after_policy_number() {
    let dir = asset_dir();
    let output = dispatcher(dir.path())
        .dispatch(&policies(), "certificate", "policy-1")
        .await
        .expect("certificate");

    assert_eq!(output.filename, "certificate-TCV-MOT-12345678.pdf");
    assert_eq!(output.content_type, PDF_CONTENT_TYPE);
    let doc = Document::load_mem(&output.bytes).expect("valid pdf");
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn every_rendered_type_is_deterministic() {
    let dir = asset_dir();
    let dispatcher = dispatcher(dir.path());
    let policies = policies();
    for tag in ["certificate", "schedule", "statement"] {
        let first = dispatcher.dispatch(&policies, tag, "policy-1").await.expect(tag);
        let second = dispatcher.dispatch(&policies, tag, "policy-1").await.expect(tag);
        assert!(!first.bytes.is_empty());
        assert_eq!(first.bytes, second.bytes, "{tag} differs between renders");
        assert_eq!(first.filename, format!("{tag}-TCV-MOT-12345678.pdf"));
    }
}

#[tokio::test]
async fn static_document_is_served_verbatim() {
    let dir = asset_dir();
    let output = dispatcher(dir.path())
        .dispatch(&policies(), "wording", "unused")
        .await
        .expect("wording");
    assert_eq!(output.filename, "wording.pdf");
    assert_eq!(output.bytes, b"%PDF-1.4 policy wording");

    let err = dispatcher(dir.path())
        .dispatch(&policies(), "contract", "unused")
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::DocumentNotFound(_)));
}

#[tokio::test]
async fn unsupported_type_produces_no_bytes() {
    let dir = asset_dir();
    let result = dispatcher(dir.path())
        .dispatch(&policies(), "Certificate", "policy-1")
        .await;
    assert!(matches!(result, Err(DocumentError::UnsupportedDocumentType(_))));
}

#[test]
fn shipped_layouts_fit_the_templates() {
    let dir = asset_dir();
    let renderer = DocumentRenderer::from_config(&DocumentConfig {
        assets_dir: dir.path().to_path_buf(),
        cache_assets: false,
    });
    assert_eq!(renderer.validate_templates(), Vec::<String>::new());
    for document in DocumentType::ALL.into_iter().filter(|t| !t.is_static()) {
        renderer.render(document, &policy()).expect("render");
    }
}
