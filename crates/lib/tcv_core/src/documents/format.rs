//! Presentation strings derived from policy and policyholder data.
//!
//! Everything here is pure. Dates are rendered in UTC with English month
//! names so output never depends on the host locale or timezone.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{InsuranceWithUser, UserRecord};

/// Placeholder for an occupation that was never captured.
pub const NOT_REQUIRED: &str = "Not required";

/// `DD Month YYYY HH:MM`, 24-hour clock, e.g. `05 March 2024 09:30`.
pub fn format_full_date_time(date: &DateTime<Utc>) -> String {
    date.format("%d %B %Y %H:%M").to_string()
}

/// `D Month YYYY`, e.g. `5 March 1990`. Used for date of birth.
pub fn format_date_only(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Comma-separated address segments, trimmed, empty ones dropped.
pub fn split_address_lines(address: &str) -> impl Iterator<Item = &str> + '_ {
    address
        .split(',')
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Forename and surname extracted from a full name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameParts<'a> {
    pub forename: &'a str,
    pub surname: &'a str,
}

/// First whitespace token is the forename, last is the surname.
///
/// A single-token name yields that token as both forename and surname.
pub fn split_name(full_name: &str) -> NameParts<'_> {
    let mut tokens = full_name.split_whitespace();
    let forename = tokens.next().unwrap_or("");
    let surname = tokens.last().unwrap_or(forename);
    NameParts { forename, surname }
}

/// `Female` for the title `Ms`, `Male` for anything else.
pub fn infer_gender(title: &str) -> &'static str {
    if title == "Ms" { "Female" } else { "Male" }
}

/// Every string a layout table can reference, resolved once per render.
///
/// This is the single place where absent data becomes blank or
/// placeholder text: a missing user yields empty strings throughout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFields {
    pub name: String,
    pub title: String,
    pub title_and_name: String,
    pub forename: String,
    pub surname: String,
    pub gender: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_no: String,
    pub email: String,
    pub occupation: String,
    pub insurance_no: String,
    pub registration_no: String,
    pub maker_name: String,
    pub model: String,
    pub maker_and_model: String,
    pub policy_cover: String,
    pub policy_cover_upper: String,
    pub license_type: String,
    pub premium: String,
    pub vehicle_value: String,
    pub issue: String,
    pub expiry: String,
}

impl DocumentFields {
    pub fn from_record(record: &InsuranceWithUser) -> Self {
        let insurance = &record.insurance;
        let user = record.user.as_ref();

        let text = |f: fn(&UserRecord) -> &str| user.map(f).unwrap_or_default().to_string();
        let name = text(|u| &u.name);
        let title = text(|u| &u.title);
        let parts = split_name(&name);

        Self {
            title_and_name: join_non_empty(&[title.as_str(), name.as_str()]),
            forename: parts.forename.to_string(),
            surname: parts.surname.to_string(),
            gender: user.map(|u| infer_gender(&u.title)).unwrap_or_default().to_string(),
            date_of_birth: user.map(|u| format_date_only(u.dob)).unwrap_or_default(),
            address: text(|u| &u.address),
            phone_no: text(|u| &u.phone_no),
            email: text(|u| &u.email),
            occupation: user
                .and_then(|u| u.occupation.as_deref())
                .unwrap_or(NOT_REQUIRED)
                .to_string(),
            insurance_no: insurance.insurance_no.clone(),
            registration_no: insurance.registration_no.clone(),
            maker_name: insurance.maker_name.clone(),
            model: insurance.model.clone(),
            maker_and_model: join_non_empty(&[insurance.maker_name.as_str(), insurance.model.as_str()]),
            policy_cover: insurance.policy_cover.clone(),
            policy_cover_upper: insurance.policy_cover.to_uppercase(),
            license_type: insurance.license_type.clone(),
            premium: insurance.premium.clone(),
            vehicle_value: insurance.vehicle_value.clone(),
            issue: format_full_date_time(&insurance.issue_date),
            expiry: format_full_date_time(&insurance.expiry_date),
            name,
            title,
        }
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .copied()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
