//! Template stamping.

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use super::assets::{AssetKind, AssetStore, CachedAssetStore, DirAssetStore};
use super::fonts::FontEncoder;
use super::format::DocumentFields;
use super::layout::{self, LayoutSpec};
use super::{DocumentConfig, DocumentError, DocumentType};
use crate::models::InsuranceWithUser;

/// Parent-chain depth limit when resolving inherited page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Renders policy documents from templates. Stateless apart from the
/// read-only asset store, so one instance serves every request.
pub struct DocumentRenderer {
    assets: Arc<dyn AssetStore>,
}

struct EncodedRun {
    glyphs: Vec<u8>,
    x: f32,
    y: f32,
}

impl DocumentRenderer {
    pub fn new(assets: Arc<dyn AssetStore>) -> Self {
        Self { assets }
    }

    pub fn from_config(config: &DocumentConfig) -> Self {
        let dir = DirAssetStore::new(&config.assets_dir);
        let assets: Arc<dyn AssetStore> = if config.cache_assets {
            Arc::new(CachedAssetStore::new(dir))
        } else {
            Arc::new(dir)
        };
        Self::new(assets)
    }

    /// Stamp a policy onto its template and serialize the result.
    pub fn render(
        &self,
        document: DocumentType,
        record: &InsuranceWithUser,
    ) -> Result<Vec<u8>, DocumentError> {
        let spec = layout::layout_for(document)
            .ok_or_else(|| DocumentError::UnsupportedDocumentType(document.to_string()))?;

        let template = self.load_asset(AssetKind::Template, spec.template)?;
        let font = self.load_asset(AssetKind::Font, spec.font.file_name())?;

        let fields = DocumentFields::from_record(record);
        let mut encoder = FontEncoder::parse(spec.font, &font)?;
        let runs: Vec<EncodedRun> = spec
            .runs(&fields)
            .into_iter()
            .map(|run| EncodedRun {
                glyphs: encoder.encode(run.text),
                x: run.x,
                y: run.y,
            })
            .collect();

        let mut doc = load_template(spec.template, &template)?;
        let font_id = encoder.embed(&mut doc)?;
        stamp_first_page(&mut doc, font_id, spec, &runs)?;

        let mut out = Vec::with_capacity(template.len() + font.len() / 2);
        doc.save_to(&mut out)
            .map_err(|e| DocumentError::Render(format!("serialize {document}: {e}")))?;
        debug!(
            %document,
            insurance_no = %record.insurance.insurance_no,
            runs = runs.len(),
            bytes = out.len(),
            "rendered document"
        );
        Ok(out)
    }

    /// Bytes of a reference document, unmodified.
    pub fn serve_static(&self, document: DocumentType) -> Result<Arc<[u8]>, DocumentError> {
        if !document.is_static() {
            return Err(DocumentError::UnsupportedDocumentType(document.to_string()));
        }
        self.assets
            .load(AssetKind::StaticDocument, document.as_str())
            .map_err(|e| {
                debug!(%document, error = %e, "static document missing");
                DocumentError::DocumentNotFound(format!("{document}.pdf"))
            })
    }

    /// Check every placement table against its template's page size.
    ///
    /// Returns one message per problem; an empty list means every template
    /// loaded and every placement lies on the page.
    pub fn validate_templates(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for document in DocumentType::ALL {
            let Some(spec) = layout::layout_for(document) else {
                continue;
            };
            match self.template_size(spec) {
                Ok((width, height)) => {
                    for issue in spec.check_bounds(width, height) {
                        problems.push(format!(
                            "{document}: {issue} outside {width}x{height} page"
                        ));
                    }
                }
                Err(e) => problems.push(format!("{document}: {e}")),
            }
        }
        problems
    }

    fn template_size(&self, spec: &LayoutSpec) -> Result<(f32, f32), DocumentError> {
        let bytes = self.load_asset(AssetKind::Template, spec.template)?;
        let doc = load_template(spec.template, &bytes)?;
        let page_id = first_page(&doc, spec.template)?;
        let media_box = inherited(&doc, page_id, b"MediaBox")
            .map(|obj| resolve(&doc, obj))
            .ok_or_else(|| {
                DocumentError::TemplateUnavailable(format!("{}: no MediaBox", spec.template))
            })?;
        let corners: Vec<f32> = media_box
            .as_array()
            .map(|items| items.iter().filter_map(as_number).collect())
            .unwrap_or_default();
        match corners.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(DocumentError::TemplateUnavailable(format!(
                "{}: malformed MediaBox",
                spec.template
            ))),
        }
    }

    fn load_asset(&self, kind: AssetKind, name: &str) -> Result<Arc<[u8]>, DocumentError> {
        self.assets.load(kind, name).map_err(|e| {
            warn!(?kind, name, error = %e, "asset unavailable");
            DocumentError::TemplateUnavailable(format!("{name}: {e}"))
        })
    }
}

fn load_template(name: &str, bytes: &[u8]) -> Result<Document, DocumentError> {
    Document::load_mem(bytes)
        .map_err(|e| DocumentError::TemplateUnavailable(format!("{name}: unreadable PDF: {e}")))
}

fn first_page(doc: &Document, name: &str) -> Result<ObjectId, DocumentError> {
    doc.get_pages()
        .get(&1)
        .copied()
        .ok_or_else(|| DocumentError::TemplateUnavailable(format!("{name}: template has no pages")))
}

/// Look up a page attribute, following `Parent` links for inheritable keys.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc.get_dictionary(current).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Follow a reference to its target; other objects pass through.
fn resolve(doc: &Document, obj: Object) -> Object {
    match obj {
        Object::Reference(id) => doc.get_object(id).cloned().unwrap_or(Object::Null),
        other => other,
    }
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn into_dictionary(obj: Object) -> Dictionary {
    match obj {
        Object::Dictionary(dict) => dict,
        _ => Dictionary::new(),
    }
}

/// Overlay `runs` on page 1 of `doc` using the embedded font `font_id`.
///
/// The page's existing content is bracketed by `q`/`Q` so whatever graphics
/// state it leaves behind cannot shift the overlay.
fn stamp_first_page(
    doc: &mut Document,
    font_id: ObjectId,
    spec: &LayoutSpec,
    runs: &[EncodedRun],
) -> Result<(), DocumentError> {
    let page_id = first_page(doc, spec.template)?;

    // Resources may be inherited or shared; the page gets its own copy.
    let mut resources = inherited(doc, page_id, b"Resources")
        .map(|obj| into_dictionary(resolve(doc, obj)))
        .unwrap_or_else(Dictionary::new);
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .cloned()
        .map(|obj| into_dictionary(resolve(doc, obj)))
        .unwrap_or_else(Dictionary::new);
    let mut n = 0;
    while fonts.has(format!("TcvF{n}").as_bytes()) {
        n += 1;
    }
    let font_name = format!("TcvF{n}");
    fonts.set(font_name.clone(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let existing: Vec<Object> = match doc.get_dictionary(page_id).and_then(|p| p.get(b"Contents")) {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let overlay = overlay_content(&font_name, spec.size_pt, runs)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| DocumentError::Render(format!("page dictionary: {e}")))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn overlay_content(
    font_name: &str,
    size_pt: f32,
    runs: &[EncodedRun],
) -> Result<Vec<u8>, DocumentError> {
    let mut operations = Vec::with_capacity(1 + runs.len() * 6);
    operations.push(Operation::new("Q", vec![]));
    for run in runs {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font_name.as_bytes().to_vec()),
                Object::Real(size_pt.into()),
            ],
        ));
        operations.push(Operation::new("g", vec![Object::Integer(0)]));
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(run.x.into()),
                Object::Real(run.y.into()),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(run.glyphs.clone(), StringFormat::Hexadecimal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    let encoded = Content { operations }
        .encode()
        .map_err(|e| DocumentError::Render(format!("encode overlay: {e}")))?;
    // Streams are concatenated; keep the first token off the previous one.
    let mut bytes = Vec::with_capacity(encoded.len() + 1);
    bytes.push(b'\n');
    bytes.extend(encoded);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use lopdf::dictionary;
    use uuid::Uuid;

    use super::*;
    use crate::documents::assets::{FontAsset, MemoryAssetStore};
    use crate::models::{InsuranceRecord, UserRecord};

    fn template(width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let helvetica = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => helvetica },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 50.into()]),
                Operation::new("Tj", vec![Object::string_literal("Template")]),
                Operation::new("ET", vec![]),
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
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save");
        out
    }

    fn font_bytes(asset: FontAsset) -> Vec<u8> {
        let path = format!(
            "{}/../../../public/fonts/{}",
            env!("CARGO_MANIFEST_DIR"),
            asset.file_name()
        );
        std::fs::read(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
    }

    fn store(width: i64, height: i64) -> MemoryAssetStore {
        let mut store = MemoryAssetStore::new();
        for name in ["certificate", "schedule", "statement"] {
            store.insert(AssetKind::Template, name, template(width, height));
        }
        for font in [FontAsset::Regular, FontAsset::Bold] {
            store.insert(AssetKind::Font, font.file_name(), font_bytes(font));
        }
        store.insert(AssetKind::StaticDocument, "contract", b"%PDF-contract".to_vec());
        store
    }

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::new(Arc::new(store(595, 842)))
    }

    fn record(with_user: bool) -> InsuranceWithUser {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        InsuranceWithUser {
            insurance: InsuranceRecord {
                id: Uuid::nil(),
                insurance_no: "TCV-MOT-12345678".into(),
                model: "Fiesta".into(),
                registration_no: "AB12 CDE".into(),
                maker_name: "Ford".into(),
                policy_cover: "Comprehensive".into(),
                license_type: "Full UK".into(),
                premium: "£45.10".into(),
                vehicle_value: "£4,000".into(),
                issue_date: Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
                expiry_date: Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap(),
                images: Vec::new(),
                user_id: None,
                created_at: created,
            },
            user: with_user.then(|| UserRecord {
                id: Uuid::nil(),
                title: "Ms".into(),
                name: "Jane Doe".into(),
                dob: NaiveDate::from_ymd_opt(1990, 3, 5).unwrap(),
                email: "jane@example.com".into(),
                address: "12 Main St, Springfield, 00000".into(),
                phone_no: "07700 900000".into(),
                occupation: Some("Engineer".into()),
                role: "user".into(),
                created_at: created,
            }),
        }
    }

    fn page_operations(bytes: &[u8]) -> (Document, Vec<Operation>) {
        let doc = Document::load_mem(bytes).expect("parse output");
        let page_id = *doc.get_pages().get(&1).expect("page 1");
        let content = doc.get_page_content(page_id).expect("content");
        let ops = Content::decode(&content).expect("decode").operations;
        (doc, ops)
    }

    fn positions(ops: &[Operation]) -> Vec<(f32, f32)> {
        ops.iter()
            .filter(|op| op.operator == "Tm")
            .map(|op| {
                let x = as_number(&op.operands[4]).expect("x");
                let y = as_number(&op.operands[5]).expect("y");
                (x, y)
            })
            .collect()
    }

    #[test]
    fn renders_every_dynamic_type_as_one_page() {
        let renderer = renderer();
        for document in [
            DocumentType::Certificate,
            DocumentType::Schedule,
            DocumentType::Statement,
        ] {
            let bytes = renderer.render(document, &record(true)).expect("render");
            assert!(bytes.starts_with(b"%PDF"));
            let doc = Document::load_mem(&bytes).expect("parse");
            assert_eq!(doc.get_pages().len(), 1, "{document}");
        }
    }

    #[test]
    fn output_is_byte_identical_across_renders() {
        let renderer = renderer();
        let a = renderer.render(DocumentType::Schedule, &record(true)).expect("render");
        let b = renderer.render(DocumentType::Schedule, &record(true)).expect("render");
        assert_eq!(a, b);
    }

    #[test]
    fn text_lands_at_layout_positions() {
        let bytes = renderer()
            .render(DocumentType::Certificate, &record(true))
            .expect("render");
        let (_, ops) = page_operations(&bytes);

        let fields = DocumentFields::from_record(&record(true));
        let expected: Vec<(f32, f32)> = layout::CERTIFICATE
            .runs(&fields)
            .iter()
            .map(|r| (r.x, r.y))
            .collect();
        assert_eq!(positions(&ops), expected);
        assert!(positions(&ops).contains(&(38.0, 716.0)));
    }

    #[test]
    fn existing_content_is_isolated() {
        let bytes = renderer()
            .render(DocumentType::Statement, &record(true))
            .expect("render");
        let (_, ops) = page_operations(&bytes);
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();

        assert_eq!(operators[0], "q");
        let restore = operators.iter().position(|op| *op == "Q").expect("Q");
        // The template's own text object sits between q and Q.
        assert!(operators[1..restore].contains(&"Tj"));
        assert_eq!(operators[restore + 1], "BT");
        assert_eq!(*operators.last().expect("ops"), "ET");
    }

    #[test]
    fn font_is_added_without_clobbering_template_fonts() {
        let bytes = renderer()
            .render(DocumentType::Certificate, &record(true))
            .expect("render");
        let (doc, ops) = page_operations(&bytes);
        let page_id = *doc.get_pages().get(&1).expect("page");
        let page = doc.get_dictionary(page_id).expect("page dict");
        let resources = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .expect("inline resources");
        let fonts = resources.get(b"Font").and_then(Object::as_dict).expect("fonts");
        assert!(fonts.has(b"F1"));
        let ours = fonts.get(b"TcvF0").and_then(Object::as_reference).expect("TcvF0");
        let font = doc.get_dictionary(ours).expect("font");
        assert_eq!(
            font.get(b"BaseFont").and_then(Object::as_name).expect("name"),
            b"DejaVuSans-Bold"
        );

        let tf = ops
            .iter()
            .find(|op| {
                op.operator == "Tf" && op.operands[0].as_name().ok() == Some(b"TcvF0".as_slice())
            })
            .expect("Tf");
        let size = as_number(&tf.operands[1]).expect("size");
        assert!((size - 9.98).abs() < 1e-3);
    }

    #[test]
    fn missing_user_renders_blanks() {
        let bytes = renderer()
            .render(DocumentType::Schedule, &record(false))
            .expect("render");
        let (_, ops) = page_operations(&bytes);
        let positions = positions(&ops);
        // No name or address, but policy data and the N/A literal remain.
        assert!(positions.contains(&(437.0, 673.5)));
        assert!(!positions.contains(&(135.0, 673.5)));
        assert!(!positions.contains(&(135.0, 654.0)));
        assert!(positions.contains(&(135.0, 583.0)));
    }

    #[test]
    fn missing_assets_are_template_unavailable() {
        let mut store = MemoryAssetStore::new();
        store.insert(AssetKind::Font, FontAsset::Bold.file_name(), font_bytes(FontAsset::Bold));
        let renderer = DocumentRenderer::new(Arc::new(store));
        let err = renderer
            .render(DocumentType::Certificate, &record(true))
            .unwrap_err();
        assert!(
            matches!(err, DocumentError::TemplateUnavailable(ref m) if m.starts_with("certificate"))
        );

        let store = MemoryAssetStore::new().with(AssetKind::Template, "schedule", template(595, 842));
        let renderer = DocumentRenderer::new(Arc::new(store));
        let err = renderer.render(DocumentType::Schedule, &record(true)).unwrap_err();
        assert!(
            matches!(err, DocumentError::TemplateUnavailable(ref m) if m.starts_with("DejaVuSans.ttf"))
        );
    }

    #[test]
    fn corrupt_template_is_template_unavailable() {
        let store = store(595, 842).with(AssetKind::Template, "statement", b"garbage".to_vec());
        let err = DocumentRenderer::new(Arc::new(store))
            .render(DocumentType::Statement, &record(true))
            .unwrap_err();
        assert!(matches!(err, DocumentError::TemplateUnavailable(_)));
    }

    #[test]
    fn static_documents_pass_through() {
        let renderer = renderer();
        let bytes = renderer.serve_static(DocumentType::Contract).expect("contract");
        assert_eq!(&*bytes, b"%PDF-contract");

        let err = renderer.serve_static(DocumentType::Wording).unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(ref f) if f == "wording.pdf"));

        let err = renderer.serve_static(DocumentType::Certificate).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedDocumentType(_)));
        let err = renderer.render(DocumentType::Contract, &record(true)).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedDocumentType(_)));
    }

    #[test]
    fn validate_templates_detects_drift() {
        assert!(renderer().validate_templates().is_empty());

        let small = DocumentRenderer::new(Arc::new(store(400, 500)));
        let problems = small.validate_templates();
        assert!(problems.iter().any(|p| p.starts_with("certificate:")));
        assert!(problems.iter().any(|p| p.starts_with("schedule:")));
        assert!(problems.iter().any(|p| p.starts_with("statement:")));

        let missing = DocumentRenderer::new(Arc::new(MemoryAssetStore::new()));
        assert_eq!(missing.validate_templates().len(), 3);
    }
}
