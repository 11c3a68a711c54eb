//! Per-document placement tables.
//!
//! Coordinates are PDF points with the origin at the bottom-left of the
//! template page. They are tied to the shipped templates: a template change
//! needs its table updated in lockstep, and [`LayoutSpec::check_bounds`]
//! catches the grossest drift at startup.

use super::DocumentType;
use super::assets::FontAsset;
use super::format::{DocumentFields, split_address_lines};

/// A value drawn from [`DocumentFields`], or fixed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Title,
    TitleAndName,
    Forename,
    Surname,
    Gender,
    DateOfBirth,
    Address,
    PhoneNo,
    Email,
    Occupation,
    InsuranceNo,
    RegistrationNo,
    MakerName,
    Model,
    MakerAndModel,
    PolicyCover,
    PolicyCoverUpper,
    LicenseType,
    Premium,
    VehicleValue,
    Issue,
    Expiry,
    Literal(&'static str),
}

impl Field {
    pub fn resolve<'a>(&self, fields: &'a DocumentFields) -> &'a str {
        match self {
            Field::Name => &fields.name,
            Field::Title => &fields.title,
            Field::TitleAndName => &fields.title_and_name,
            Field::Forename => &fields.forename,
            Field::Surname => &fields.surname,
            Field::Gender => &fields.gender,
            Field::DateOfBirth => &fields.date_of_birth,
            Field::Address => &fields.address,
            Field::PhoneNo => &fields.phone_no,
            Field::Email => &fields.email,
            Field::Occupation => &fields.occupation,
            Field::InsuranceNo => &fields.insurance_no,
            Field::RegistrationNo => &fields.registration_no,
            Field::MakerName => &fields.maker_name,
            Field::Model => &fields.model,
            Field::MakerAndModel => &fields.maker_and_model,
            Field::PolicyCover => &fields.policy_cover,
            Field::PolicyCoverUpper => &fields.policy_cover_upper,
            Field::LicenseType => &fields.license_type,
            Field::Premium => &fields.premium,
            Field::VehicleValue => &fields.vehicle_value,
            Field::Issue => &fields.issue,
            Field::Expiry => &fields.expiry,
            Field::Literal(text) => text,
        }
    }
}

/// One instruction in a placement table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// A single value at a fixed point.
    Text { field: Field, x: f32, y: f32 },
    /// The address split on commas, one line per segment, descending from `top`.
    AddressBlock { x: f32, top: f32 },
}

/// Everything needed to stamp one document type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpec {
    /// Template asset name.
    pub template: &'static str,
    pub font: FontAsset,
    pub size_pt: f32,
    /// Vertical advance between address lines.
    pub line_height: f32,
    pub placements: &'static [Placement],
}

/// A resolved string at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
}

const fn text(field: Field, x: f32, y: f32) -> Placement {
    Placement::Text { field, x, y }
}

pub const CERTIFICATE: LayoutSpec = LayoutSpec {
    template: "certificate",
    font: FontAsset::Bold,
    size_pt: 9.98,
    line_height: 12.0,
    placements: &[
        text(Field::Name, 38.0, 753.0),
        Placement::AddressBlock { x: 38.0, top: 740.0 },
        text(Field::InsuranceNo, 384.0, 599.0),
        text(Field::RegistrationNo, 132.0, 584.0),
        text(Field::MakerAndModel, 132.0, 506.0),
        text(Field::TitleAndName, 132.0, 471.0),
        text(Field::Issue, 132.0, 434.0),
        text(Field::Expiry, 132.0, 399.0),
        text(Field::TitleAndName, 132.0, 338.0),
    ],
};

pub const SCHEDULE: LayoutSpec = LayoutSpec {
    template: "schedule",
    font: FontAsset::Regular,
    size_pt: 7.68,
    line_height: 10.0,
    placements: &[
        text(Field::Name, 135.0, 673.5),
        text(Field::Literal("N/A"), 437.0, 673.5),
        Placement::AddressBlock { x: 135.0, top: 654.0 },
        text(Field::Occupation, 135.0, 603.0),
        text(Field::InsuranceNo, 135.0, 583.0),
        text(Field::Issue, 135.0, 563.0),
        text(Field::Expiry, 437.0, 563.0),
        text(Field::MakerName, 76.0, 522.0),
        text(Field::Model, 268.0, 522.0),
        text(Field::VehicleValue, 128.0, 461.0),
        text(Field::RegistrationNo, 486.0, 461.0),
        text(Field::PolicyCover, 128.0, 427.0),
        text(Field::Premium, 128.0, 339.0),
        text(Field::Premium, 410.0, 339.0),
    ],
};

// The statement prints the address on a single line.
pub const STATEMENT: LayoutSpec = LayoutSpec {
    template: "statement",
    font: FontAsset::Regular,
    size_pt: 7.68,
    line_height: 10.0,
    placements: &[
        text(Field::Surname, 223.0, 605.0),
        text(Field::Forename, 223.0, 592.0),
        text(Field::Title, 223.0, 579.0),
        text(Field::Address, 223.0, 566.0),
        text(Field::PhoneNo, 223.0, 553.0),
        text(Field::Email, 223.0, 540.0),
        text(Field::Issue, 223.0, 512.0),
        text(Field::Expiry, 223.0, 499.0),
        text(Field::PolicyCoverUpper, 223.0, 486.0),
        text(Field::Name, 148.0, 397.0),
        text(Field::Gender, 148.0, 384.0),
        text(Field::DateOfBirth, 148.0, 371.0),
        text(Field::LicenseType, 148.0, 358.0),
        text(Field::Occupation, 148.0, 345.0),
        text(Field::MakerName, 219.0, 317.0),
        text(Field::Model, 219.0, 304.0),
        text(Field::RegistrationNo, 219.0, 291.0),
        text(Field::VehicleValue, 219.0, 278.0),
        text(Field::Name, 148.0, 249.0),
        text(Field::Name, 148.0, 174.0),
    ],
};

/// Placement table for a rendered document type; `None` for static types.
pub fn layout_for(document: DocumentType) -> Option<&'static LayoutSpec> {
    match document {
        DocumentType::Certificate => Some(&CERTIFICATE),
        DocumentType::Schedule => Some(&SCHEDULE),
        DocumentType::Statement => Some(&STATEMENT),
        _ => None,
    }
}

impl LayoutSpec {
    /// Resolve every placement against `fields`, in table order.
    ///
    /// Empty values produce no run.
    pub fn runs<'a>(&self, fields: &'a DocumentFields) -> Vec<TextRun<'a>> {
        let mut runs = Vec::with_capacity(self.placements.len() + 2);
        for placement in self.placements {
            match *placement {
                Placement::Text { field, x, y } => {
                    let text = field.resolve(fields);
                    if !text.is_empty() {
                        runs.push(TextRun { text, x, y });
                    }
                }
                Placement::AddressBlock { x, top } => {
                    let mut y = top;
                    for line in split_address_lines(&fields.address) {
                        runs.push(TextRun { text: line, x, y });
                        y -= self.line_height;
                    }
                }
            }
        }
        runs
    }

    /// Placements whose anchor falls outside a `width` × `height` page.
    ///
    /// Returns a description of each offending placement; empty when the
    /// table fits.
    pub fn check_bounds(&self, width: f32, height: f32) -> Vec<String> {
        let outside = |x: f32, y: f32| x < 0.0 || y < 0.0 || x > width || y > height;
        self.placements
            .iter()
            .filter_map(|placement| match *placement {
                Placement::Text { field, x, y } if outside(x, y) => {
                    Some(format!("{field:?} at ({x}, {y})"))
                }
                Placement::AddressBlock { x, top } if outside(x, top) => {
                    Some(format!("address block at ({x}, {top})"))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> DocumentFields {
        DocumentFields {
            name: "Jane Doe".into(),
            title: "Ms".into(),
            title_and_name: "Ms Jane Doe".into(),
            forename: "Jane".into(),
            surname: "Doe".into(),
            address: "12 Main St, Springfield, 00000".into(),
            occupation: "Not required".into(),
            insurance_no: "TCV-MOT-12345678".into(),
            premium: "£45.10".into(),
            ..Default::default()
        }
    }

    #[test]
    fn only_rendered_types_have_layouts() {
        for t in DocumentType::ALL {
            assert_eq!(layout_for(t).is_some(), !t.is_static(), "{t}");
        }
    }

    #[test]
    fn fonts_and_sizes_per_document() {
        assert_eq!(CERTIFICATE.font, FontAsset::Bold);
        assert_eq!(CERTIFICATE.size_pt, 9.98);
        assert_eq!(SCHEDULE.font, FontAsset::Regular);
        assert_eq!(SCHEDULE.size_pt, 7.68);
        assert_eq!(STATEMENT.font, FontAsset::Regular);
        assert_eq!(STATEMENT.size_pt, 7.68);
    }

    #[test]
    fn certificate_address_descends_by_twelve() {
        let fields = fields();
        let runs = CERTIFICATE.runs(&fields);
        let address: Vec<_> = runs.iter().filter(|r| r.x == 38.0 && r.y < 753.0).collect();
        assert_eq!(address.len(), 3);
        assert_eq!((address[0].text, address[0].y), ("12 Main St", 740.0));
        assert_eq!((address[1].text, address[1].y), ("Springfield", 728.0));
        assert_eq!((address[2].text, address[2].y), ("00000", 716.0));
    }

    #[test]
    fn schedule_address_descends_by_ten() {
        let fields = fields();
        let ys: Vec<_> = SCHEDULE
            .runs(&fields)
            .into_iter()
            .filter(|r| r.x == 135.0 && r.y < 673.5 && r.y > 603.0)
            .map(|r| r.y)
            .collect();
        assert_eq!(ys, [654.0, 644.0, 634.0]);
    }

    #[test]
    fn schedule_prints_literal_na() {
        let fields = fields();
        let runs = SCHEDULE.runs(&fields);
        assert!(runs.contains(&TextRun { text: "N/A", x: 437.0, y: 673.5 }));
        let premiums = runs.iter().filter(|r| r.text == "£45.10").count();
        assert_eq!(premiums, 2);
    }

    #[test]
    fn statement_keeps_address_on_one_line() {
        let fields = fields();
        let runs = STATEMENT.runs(&fields);
        assert!(runs.contains(&TextRun {
            text: "12 Main St, Springfield, 00000",
            x: 223.0,
            y: 566.0
        }));
    }

    #[test]
    fn empty_values_are_skipped() {
        let fields = DocumentFields::default();
        assert!(CERTIFICATE.runs(&fields).is_empty());
        // Only the fixed literal survives on the schedule.
        let runs = SCHEDULE.runs(&fields);
        assert_eq!(runs, [TextRun { text: "N/A", x: 437.0, y: 673.5 }]);
    }

    #[test]
    fn tables_fit_a4_and_letter() {
        for spec in [&CERTIFICATE, &SCHEDULE, &STATEMENT] {
            assert!(spec.check_bounds(595.0, 842.0).is_empty(), "{}", spec.template);
            assert!(spec.check_bounds(612.0, 792.0).is_empty(), "{}", spec.template);
        }
    }

    #[test]
    fn check_bounds_reports_drift() {
        let problems = CERTIFICATE.check_bounds(300.0, 600.0);
        assert!(problems.iter().any(|p| p.starts_with("Name at (38, 753)")));
        assert!(problems.iter().any(|p| p.starts_with("address block")));
        assert!(problems.iter().any(|p| p.starts_with("InsuranceNo")));
    }
}
