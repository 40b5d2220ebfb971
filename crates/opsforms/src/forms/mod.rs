//! Form definitions for the two operator paper forms.
//!
//! Each form is a typed record ([`IncidentReport`], [`PayExceptionReport`])
//! paired with a static [`FormDefinition`] describing its PDF field order,
//! spreadsheet columns and required entries. Everything downstream (validation,
//! persistence, rendering, delivery) works from the flat [`FieldMap`] a record
//! produces, so the two forms share one pipeline.

pub mod choices;
pub mod incident;
pub mod input;
pub mod pay_exception;
pub mod signature;
pub mod validation;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

pub use choices::{IncidentType, Meridiem, ReportRecipient, YesNo};
pub use incident::IncidentReport;
pub use pay_exception::PayExceptionReport;
pub use signature::{Signature, SignatureError};
pub use validation::{validate, MissingField, MissingFields, RequiredEntry, RequiredValue};

/// The two paper forms served by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Incident,
    PayException,
}

impl FormKind {
    pub const ALL: [FormKind; 2] = [FormKind::Incident, FormKind::PayException];

    /// URL segment used by the HTTP routes.
    pub fn slug(&self) -> &'static str {
        match self {
            FormKind::Incident => "incident",
            FormKind::PayException => "pay-exception",
        }
    }

    pub fn from_slug(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "incident" | "incident-report" => Some(FormKind::Incident),
            "pay-exception" | "pay_exception" | "pay" => Some(FormKind::PayException),
            _ => None,
        }
    }

    pub fn definition(&self) -> &'static FormDefinition {
        match self {
            FormKind::Incident => &incident::DEFINITION,
            FormKind::PayException => &pay_exception::DEFINITION,
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A single field value as it flows into rows and PDFs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Empty, falsy, or absent.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.is_empty(),
            FieldValue::Flag(value) => !value,
            FieldValue::Date(value) => value.is_none(),
        }
    }

    /// Human-readable rendering used on the PDF copy.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Flag(true) => "Yes".to_string(),
            FieldValue::Flag(false) => "No".to_string(),
            FieldValue::Date(Some(date)) => date.format("%Y-%m-%d").to_string(),
            FieldValue::Date(None) => String::new(),
        }
    }

    /// Spreadsheet cell text: ISO-8601 dates, `TRUE`/`FALSE` flags.
    pub fn cell_text(&self) -> String {
        match self {
            FieldValue::Flag(true) => "TRUE".to_string(),
            FieldValue::Flag(false) => "FALSE".to_string(),
            other => other.display(),
        }
    }

    /// Typed JSON cell for APIs that keep booleans distinct from strings.
    pub fn cell_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Flag(value) => serde_json::Value::Bool(*value),
            other => serde_json::Value::String(other.display()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<Option<NaiveDate>> for FieldValue {
    fn from(value: Option<NaiveDate>) -> Self {
        FieldValue::Date(value)
    }
}

/// Flat mapping from field key to value for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<&'static str, FieldValue>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: impl Into<FieldValue>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Display text for a key; unknown keys render as empty.
    pub fn display(&self, key: &str) -> String {
        self.get(key).map(FieldValue::display).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in the given column order; unknown columns become empty text.
    pub fn row(&self, columns: &[&str]) -> Vec<FieldValue> {
        columns
            .iter()
            .map(|column| {
                self.get(column)
                    .cloned()
                    .unwrap_or_else(|| FieldValue::Text(String::new()))
            })
            .collect()
    }
}

/// How a field is laid out on the PDF copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    Inline,
    LongText,
}

/// One `(label, key)` entry of a form's rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub label: &'static str,
    pub key: &'static str,
    pub layout: FieldLayout,
}

impl FieldSpec {
    pub const fn inline(label: &'static str, key: &'static str) -> Self {
        Self {
            label,
            key,
            layout: FieldLayout::Inline,
        }
    }

    pub const fn long_text(label: &'static str, key: &'static str) -> Self {
        Self {
            label,
            key,
            layout: FieldLayout::LongText,
        }
    }

    pub fn is_long_text(&self) -> bool {
        self.layout == FieldLayout::LongText
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredKind {
    Field,
    Signature,
}

/// A declared required entry: the validation key, the label shown when it
/// is missing, and the record field (`input`) it checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: RequiredKind,
    pub input: &'static str,
}

impl RequiredSpec {
    pub const fn field(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: RequiredKind::Field,
            input: key,
        }
    }

    pub const fn signature(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: RequiredKind::Signature,
            input: key,
        }
    }

    /// Name the record field when it differs from the validation key.
    pub const fn on(self, input: &'static str) -> Self {
        Self { input, ..self }
    }
}

/// Static description of a form.
#[derive(Debug, Serialize)]
pub struct FormDefinition {
    pub kind: FormKind,
    pub title: &'static str,
    pub worksheet: &'static str,
    pub fields: &'static [FieldSpec],
    pub columns: &'static [&'static str],
    pub required: &'static [RequiredSpec],
}

impl FormDefinition {
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }

    pub fn required_spec(&self, key: &str) -> Option<&'static RequiredSpec> {
        self.required.iter().find(|spec| spec.key == key)
    }

    /// The required entry checking the given record field, if any.
    pub fn required_for_input(&self, input: &str) -> Option<&'static RequiredSpec> {
        self.required.iter().find(|spec| spec.input == input)
    }
}

/// Subject and body of the notification sent with a submission's PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

/// Behavior shared by both typed form records.
pub trait FormRecord: Send + Sync {
    fn definition(&self) -> &'static FormDefinition;

    fn field_map(&self) -> FieldMap;

    /// Required entries paired with their current values, in declaration order.
    fn required_entries(&self) -> Vec<RequiredEntry<'_>>;

    fn operator_signature(&self) -> Option<&Signature>;

    fn supervisor_signature(&self) -> Option<&Signature>;

    fn pdf_file_name(&self) -> String;

    fn email_template(&self) -> EmailTemplate;

    fn kind(&self) -> FormKind {
        self.definition().kind
    }
}

/// Make a value safe to embed in a file name.
pub(crate) fn file_name_part(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
