//! Per-row validation and normalization.
//!
//! A mapped row either becomes a [`ValidRow`] holding only the fields that
//! were actually supplied, or an [`InvalidRow`] carrying every problem found
//! plus the untouched [`FieldMap`] for display.

use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{config::ImportPolicy, mapper::FieldMap};

pub const FIELD_NAME: &str = "name";
pub const FIELD_COMPANY: &str = "company";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_STATUS: &str = "status";

pub const RECOGNIZED_FIELDS: &[&str] = &[
    FIELD_NAME,
    FIELD_COMPANY,
    FIELD_EMAIL,
    FIELD_PHONE,
    FIELD_TAGS,
    FIELD_STATUS,
];

pub const NAME_OR_COMPANY_REQUIRED: &str = "Name or company is required";

const TAG_SEPARATOR: char = '|';

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value)
}

/// Lifecycle stage of a client record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Lead,
    Active,
    Inactive,
    Archived,
}

impl ClientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientStatus::Lead => "lead",
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Archived => "archived",
        }
    }
}

impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lead" => Ok(ClientStatus::Lead),
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            "archived" => Ok(ClientStatus::Archived),
            _ => Err(format!("Invalid status '{value}'")),
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized client row. Optional fields are either a trimmed non-empty
/// string or absent; they never serialize as `null` or `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidRow {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ClientStatus>,
    tags: Vec<String>,
}

impl ValidRow {
    /// Returns `None` when `name` is blank.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = non_empty(name.as_ref())?;
        Some(Self {
            name,
            company: None,
            email: None,
            phone: None,
            status: None,
            tags: Vec::new(),
        })
    }

    pub fn with_company(mut self, company: impl AsRef<str>) -> Self {
        self.company = non_empty(company.as_ref());
        self
    }

    pub fn with_email(mut self, email: impl AsRef<str>) -> Self {
        self.email = non_empty(email.as_ref());
        self
    }

    pub fn with_phone(mut self, phone: impl AsRef<str>) -> Self {
        self.phone = non_empty(phone.as_ref());
        self
    }

    pub fn with_status(mut self, status: ClientStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .filter_map(|tag| non_empty(tag.as_ref()))
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn status(&self) -> Option<ClientStatus> {
        self.status
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// A row that failed validation. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRow {
    pub row_number: usize,
    pub raw_data: FieldMap,
    pub errors: Vec<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Splits a `tags` cell on `|`, trimming segments and dropping empty ones.
pub fn normalize_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(TAG_SEPARATOR)
            .filter_map(non_empty)
            .collect()
    })
    .unwrap_or_default()
}

/// Validates a row using the default policy.
pub fn validate(fields: &FieldMap, row_number: usize) -> Result<ValidRow, InvalidRow> {
    validate_with(fields, row_number, &ImportPolicy::default())
}

/// Validates a row, collecting every error instead of stopping at the first.
pub fn validate_with(
    fields: &FieldMap,
    row_number: usize,
    policy: &ImportPolicy,
) -> Result<ValidRow, InvalidRow> {
    let mut errors = Vec::new();

    let name = fields.get(FIELD_NAME);
    let company = fields.get(FIELD_COMPANY);
    let label = name.or(company);
    if label.is_none() {
        errors.push(NAME_OR_COMPANY_REQUIRED.to_string());
    }

    let email = fields.get(FIELD_EMAIL);
    if let Some(email) = email {
        if policy.validate_email && !is_valid_email(email) {
            errors.push(format!("Invalid email address '{email}'"));
        }
    }

    let status = match fields.get(FIELD_STATUS).map(str::parse::<ClientStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(message)) => {
            errors.push(message);
            None
        }
        None => None,
    };

    let row = label.and_then(ValidRow::new);
    match row {
        Some(row) if errors.is_empty() => {
            let mut row = row
                .with_tags(normalize_tags(fields.get(FIELD_TAGS)))
                .with_company(company.unwrap_or_default())
                .with_email(email.unwrap_or_default())
                .with_phone(fields.get(FIELD_PHONE).unwrap_or_default());
            if let Some(status) = status {
                row = row.with_status(status);
            }
            Ok(row)
        }
        _ => Err(InvalidRow {
            row_number,
            raw_data: fields.clone(),
            errors,
        }),
    }
}
