use serde::Serialize;

use super::signature::{is_signature_present, Signature};
use super::{FieldValue, RequiredSpec};

/// The value behind a required entry.
#[derive(Debug, Clone)]
pub enum RequiredValue<'a> {
    Field(FieldValue),
    Signature(Option<&'a Signature>),
}

impl RequiredValue<'_> {
    pub fn is_missing(&self) -> bool {
        match self {
            RequiredValue::Field(value) => value.is_blank(),
            RequiredValue::Signature(signature) => !is_signature_present(*signature),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequiredEntry<'a> {
    pub spec: &'static RequiredSpec,
    pub value: RequiredValue<'a>,
}

impl<'a> RequiredEntry<'a> {
    pub fn field(spec: &'static RequiredSpec, value: impl Into<FieldValue>) -> Self {
        Self {
            spec,
            value: RequiredValue::Field(value.into()),
        }
    }

    pub fn signature(spec: &'static RequiredSpec, signature: Option<&'a Signature>) -> Self {
        Self {
            spec,
            value: RequiredValue::Signature(signature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingField {
    pub key: &'static str,
    pub label: &'static str,
}

/// Required entries that were left empty, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MissingFields(Vec<MissingField>);

impl MissingFields {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|missing| missing.key == key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.0.iter().map(|missing| missing.key).collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.0.iter().map(|missing| missing.label).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissingField> {
        self.0.iter()
    }

    /// Message shown above the submit button.
    pub fn banner(&self) -> String {
        format!(
            "PLEASE FILL IN ALL REQUIRED FIELDS: {}",
            self.labels().join(", ")
        )
    }
}

/// Return the entries whose value is empty, falsy, or (for signatures) inkless.
pub fn validate(entries: &[RequiredEntry<'_>]) -> MissingFields {
    MissingFields(
        entries
            .iter()
            .filter(|entry| entry.value.is_missing())
            .map(|entry| MissingField {
                key: entry.spec.key,
                label: entry.spec.label,
            })
            .collect(),
    )
}
